//! Punto de entrada ("driver").
//!
//! Este módulo expone una CLI sobre [`Compiler`]. Sin código fuente,
//! o con `-i`, se entra a modo interactivo.

use anyhow::{self, bail, Context};
use clap::{crate_version, Arg, ArgMatches, Command};
use gradec::{
    compile::{CompileError, Compiler},
    report::{self, ReportOptions},
};

use std::{
    fs::{self, File},
    io::{self, BufRead, Read, Write},
};

/// Programa de muestra del modo interactivo.
const EXAMPLE: &str = "if score >= 90 then grade is A else grade is B";

/// Opciones de reporte y su bandera correspondiente.
const REPORTS: &[(&str, ReportOptions, &str)] = &[
    ("grammar", ReportOptions::GRAMMAR, "Print the numbered productions"),
    ("sets", ReportOptions::SETS, "Print FIRST and FOLLOW sets"),
    ("table", ReportOptions::TABLE, "Print the LL(1) parsing table"),
    ("tokens", ReportOptions::TOKENS, "Print the token stream"),
    ("trace", ReportOptions::TRACE, "Print every parser step"),
    ("ast", ReportOptions::AST, "Print the syntax tree"),
];

fn cli() -> Command<'static> {
    let mut command = Command::new("gradec")
        .version(crate_version!())
        .about("LL(1) compiler from grade rules to Python")
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .multiple_values(true)
                .help("Program text, words are joined by spaces"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .takes_value(true)
                .value_name("FILE")
                .conflicts_with("source")
                .help("Read program from a file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file for generated code ('-' for stdout)"),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .help("Print every report"),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .conflicts_with_all(&["source", "file"])
                .help("Read programs line by line"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase logging verbosity"),
        );

    for &(name, _, help) in REPORTS {
        command = command.arg(Arg::new(name).long(name).help(help));
    }

    command
}

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = cli().get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = report_options(&args);
    let compiler = Compiler::new().context("Built-in grammar is not LL(1)")?;

    let mut stdout = io::stdout();
    if options.contains(ReportOptions::GRAMMAR) {
        report::write_grammar(&mut stdout, compiler.grammar())?;
    }

    if options.contains(ReportOptions::SETS) {
        report::write_sets(&mut stdout, compiler.analysis())?;
    }

    if options.contains(ReportOptions::TABLE) {
        report::write_table(&mut stdout, compiler.grammar(), compiler.table())?;
    }

    // Se extraen argumentos necesarios
    let source = match (args.value_of("file"), args.values_of("source")) {
        (Some("-"), _) => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            Some(("<stdin>", text))
        }

        (Some(path), _) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read source file: {}", path))?;

            Some((path, text))
        }

        (None, Some(words)) => Some(("<args>", words.collect::<Vec<_>>().join(" "))),
        (None, None) => None,
    };

    // -i excluye a cualquier otra fuente
    let (name, text) = match source {
        Some(source) => source,
        None => return interactive(&compiler, options),
    };

    let output = args.value_of("output").unwrap_or("-");
    let generated = match run(&compiler, name, &text, options)? {
        Some(generated) => generated,
        None => bail!("Failed to compile {}", name),
    };

    match output {
        // Salida a stdout
        "-" => stdout
            .write_all(generated.as_bytes())
            .context("Failed to emit to stdout")?,

        // Salida a archivo
        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            file.write_all(generated.as_bytes())
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    Ok(())
}

fn report_options(args: &ArgMatches) -> ReportOptions {
    if args.is_present("all") {
        return ReportOptions::all();
    }

    let mut options = ReportOptions::empty();
    for &(name, flag, _) in REPORTS {
        if args.is_present(name) {
            options |= flag;
        }
    }

    options
}

/// Compila un programa y presenta los reportes solicitados.
///
/// Los errores de compilación se presentan aquí mismo y resultan en
/// `None`; solo fallas de E/S se propagan.
fn run(
    compiler: &Compiler,
    name: &str,
    text: &str,
    options: ReportOptions,
) -> anyhow::Result<Option<String>> {
    let mut stdout = io::stdout();

    let compilation = match compiler.compile(text) {
        Ok(compilation) => compilation,

        Err(error) => {
            if let CompileError::Syntax { tokens, trace, .. } = &error {
                if options.contains(ReportOptions::TRACE) {
                    report::write_trace(&mut stdout, trace, tokens)?;
                }
            }

            match error.diagnostics() {
                Some(diagnostics) => eprint!("{}", diagnostics.with_source(name, text)),
                None => return Err(error).context("Compilation aborted"),
            }

            return Ok(None);
        }
    };

    if options.contains(ReportOptions::TOKENS) {
        report::write_tokens(&mut stdout, &compilation.tokens)?;
    }

    if options.contains(ReportOptions::TRACE) {
        report::write_trace(&mut stdout, &compilation.trace, &compilation.tokens)?;
    }

    if options.contains(ReportOptions::AST) {
        writeln!(stdout, "{:#?}\n", compilation.program)?;
    }

    Ok(Some(compilation.output))
}

fn interactive(compiler: &Compiler, options: ReportOptions) -> anyhow::Result<()> {
    println!("Enter a program, 'example', 'grammar' or 'quit'.");

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line).context("Failed to read from stdin")? == 0 {
            return Ok(());
        }

        let source = match line.trim() {
            "" => continue,
            "quit" | "exit" | "q" => return Ok(()),

            "grammar" => {
                report::write_grammar(&mut stdout, compiler.grammar())?;
                continue;
            }

            "example" => {
                println!("{}", EXAMPLE);
                EXAMPLE
            }

            source => source,
        };

        if let Some(generated) = run(compiler, "<stdin>", source, options)? {
            print!("{}", generated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ArgMatches, clap::Error> {
        cli().try_get_matches_from(std::iter::once("gradec").chain(args.iter().copied()))
    }

    #[test]
    fn interactive_excludes_other_sources() {
        let error = parse(&["-i", "if", "x", ">=", "1", "then", "y", "is", "A"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);

        let error = parse(&["-i", "-f", "rules.txt"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);

        assert!(parse(&["-i", "--table"]).is_ok());
    }

    #[test]
    fn inline_source_words_are_collected() {
        let args = parse(&["--trace", "if", "x", ">=", "1", "then", "y", "is", "A"]).unwrap();
        let words: Vec<_> = args.values_of("source").unwrap().collect();

        assert_eq!(words.join(" "), "if x >= 1 then y is A");
        assert_eq!(report_options(&args), ReportOptions::TRACE);
    }

    #[test]
    fn all_enables_every_report() {
        let args = parse(&["--all", "-o", "out.py", "x"]).unwrap();
        assert_eq!(report_options(&args), ReportOptions::all());
        assert_eq!(args.value_of("output"), Some("out.py"));
    }
}
