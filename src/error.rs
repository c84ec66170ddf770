//! Reporte de errores al usuario.
//!
//! Todas las fases reportan errores como [`Located`], por lo cual
//! [`Diagnostics`] puede presentar cualquiera de ellos de la misma forma,
//! señalando el fragmento de código fuente afectado cuando este se
//! encuentra disponible.

use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::source::{Located, Span};

mod sealed {
    pub trait Sealed {}
}

/// Un error con ubicación conocida.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn span(&self) -> Span;
}

/// Colección de errores lista para ser presentada.
pub struct Diagnostics {
    kind: &'static str,
    source: Option<(String, String)>,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Clase de error que encabeza cada mensaje.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Asocia el nombre y texto de la fuente, para mostrar las líneas afectadas.
    pub fn with_source(self, name: &str, text: &str) -> Self {
        Diagnostics {
            source: Some((name.to_owned(), text.to_owned())),
            ..self
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn excerpt(&self, fmt: &mut fmt::Formatter<'_>, span: Span) -> fmt::Result {
        let text = match &self.source {
            Some((_, text)) => text,
            None => return Ok(()),
        };

        let (start, end) = (span.start(), span.end());
        let line = match text.lines().nth(start.line().saturating_sub(1) as usize) {
            Some(line) => line,
            None => "",
        };

        let digits = start.line().to_string().chars().count();
        writeln!(fmt, "{:digits$} |", "", digits = digits)?;
        writeln!(fmt, "{:>digits$} | {}", start.line(), line, digits = digits)?;

        // Rangos de varias líneas se señalan solo en su inicio
        let last = if end.line() == start.line() {
            end.column().saturating_sub(1).max(start.column())
        } else {
            start.column()
        };

        let skip = start.column().saturating_sub(1) as usize;
        let highlight = (last - start.column() + 1) as usize;

        writeln!(
            fmt,
            "{:digits$} | {:skip$}{:^<highlight$}",
            "",
            "",
            "",
            digits = digits,
            skip = skip,
            highlight = highlight
        )
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            source: None,
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = &self.errors;
        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", self.kind, error.source())?;

            let span = error.span();
            match &self.source {
                Some((name, _)) => writeln!(fmt, " --> {}:{}", name, span)?,
                None => writeln!(fmt, " --> {}", span)?,
            }

            self.excerpt(fmt, span)?;
            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn span(&self) -> Span {
        Located::span(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;

    #[test]
    fn caret_under_offending_character() {
        let text = "if score @ 90";
        let error = Lexer::new(text).tokenize().unwrap_err();

        let rendered = Diagnostics::from(error)
            .kind("Lexical error")
            .with_source("grades.txt", text)
            .to_string();

        let expected = "\
Lexical error: Bad character '@' in input stream
 --> grades.txt:1:10
  |
1 | if score @ 90
  |          ^

Build failed with 1 error
";

        assert_eq!(rendered, expected);
    }

    #[test]
    fn ranges_are_underlined_whole() {
        let text = "if\n  score";
        let tokens = Lexer::new(text).tokenize().unwrap();
        let error = tokens[1].clone().map(|_| crate::lex::LexicalError::BadChar('s'));

        let rendered = Diagnostics::from(error).with_source("-", text).to_string();
        assert!(rendered.contains(" --> -:2:[3-7]\n"));
        assert!(rendered.contains("2 |   score\n  |   ^^^^^\n"));
    }

    #[test]
    fn without_source_only_the_span_is_shown() {
        let error = Lexer::new("x > 1").tokenize().unwrap_err();
        let rendered = Diagnostics::from(vec![error.clone(), error]).to_string();

        assert!(rendered.starts_with("error: "));
        assert!(rendered.contains(" --> 1:3\n"));
        assert!(!rendered.contains(" | "));
        assert!(rendered.ends_with("Build failed with 2 errors\n"));
    }

    #[test]
    fn empty_diagnostics() {
        let diagnostics = Diagnostics::default();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.to_string(), "No errors were reported\n");
    }
}
