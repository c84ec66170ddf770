/// Escribe una línea indentada al nivel actual del generador.
macro_rules! emit {
    ($context:expr, $($format:tt)*) => {{
        $context.indent()?;
        writeln!($context.output(), $($format)*)
    }};
}
