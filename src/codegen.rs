//! Generación de código.
//!
//! El generador recorre el AST y aplica una plantilla fija por tipo de
//! nodo. No contiene lógica gramatical alguna. El lenguaje objetivo es
//! Python:
//!
//! ```text
//! if score >= 90:
//!     grade = "A"
//! else:
//!     grade = "B"
//! ```
//!
//! Un identificador que coincide con una palabra reservada de Python
//! se emite con un `_` final (`class` resulta en `class_`).

use std::{
    borrow::Cow,
    io::{self, Write},
};

use crate::ast::{Assignment, Condition, IfStatement, Program};

/// Ancho de un nivel de indentación.
const INDENT: usize = 4;

/// Palabras reservadas de Python 3, sensibles a mayúsculas.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Emite el programa completo.
pub fn emit<W: Write>(program: &Program, output: &mut W) -> io::Result<()> {
    let mut generator = Generator { output, depth: 0 };
    generator.program(program)
}

struct Generator<'w, W> {
    output: &'w mut W,
    depth: usize,
}

impl<W: Write> Generator<'_, W> {
    fn output(&mut self) -> &mut W {
        self.output
    }

    fn indent(&mut self) -> io::Result<()> {
        write!(self.output, "{:width$}", "", width = self.depth * INDENT)
    }

    fn program(&mut self, program: &Program) -> io::Result<()> {
        for statement in &program.statements {
            self.if_statement(statement)?;
        }

        Ok(())
    }

    fn if_statement(&mut self, statement: &IfStatement) -> io::Result<()> {
        emit!(self, "if {}:", condition(&statement.condition))?;
        self.block(&statement.then)?;

        if let Some(otherwise) = &statement.otherwise {
            emit!(self, "else:")?;
            self.block(otherwise)?;
        }

        Ok(())
    }

    fn block(&mut self, assignment: &Assignment) -> io::Result<()> {
        self.depth += 1;
        let result = self.assignment(assignment);
        self.depth -= 1;

        result
    }

    fn assignment(&mut self, assignment: &Assignment) -> io::Result<()> {
        emit!(
            self,
            "{} = \"{}\"",
            identifier(&assignment.target),
            assignment.value.letter
        )
    }
}

fn condition(condition: &Condition) -> String {
    format!(
        "{} {} {}",
        identifier(&condition.variable),
        condition.comparison,
        condition.threshold
    )
}

fn identifier(name: &str) -> Cow<'_, str> {
    if RESERVED.contains(&name) {
        Cow::Owned(format!("{}_", name))
    } else {
        Cow::Borrowed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Comparison, Value};

    fn render(program: &Program) -> String {
        let mut output = Vec::new();
        emit(program, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn statement(otherwise: Option<&str>) -> IfStatement {
        let assign = |letter: &str| Assignment {
            target: "grade".into(),
            value: Value {
                letter: letter.into(),
            },
        };

        IfStatement {
            condition: Condition {
                variable: "score".into(),
                comparison: Comparison::GreaterOrEqual,
                threshold: 90,
            },
            then: assign("A"),
            otherwise: otherwise.map(assign),
        }
    }

    #[test]
    fn if_without_else() {
        let program = Program {
            statements: vec![statement(None)],
        };

        assert_eq!(render(&program), "if score >= 90:\n    grade = \"A\"\n");
    }

    #[test]
    fn if_with_else() {
        let program = Program {
            statements: vec![statement(Some("B"))],
        };

        assert_eq!(
            render(&program),
            "if score >= 90:\n    grade = \"A\"\nelse:\n    grade = \"B\"\n"
        );
    }

    #[test]
    fn statements_are_consecutive() {
        let program = Program {
            statements: vec![statement(None), statement(Some("F"))],
        };

        let rendered = render(&program);
        assert_eq!(rendered.lines().count(), 6);
        assert_eq!(rendered.matches("if score >= 90:").count(), 2);
    }

    #[test]
    fn reserved_words_are_mangled() {
        let mut reserved = statement(None);
        reserved.condition.variable = "class".into();
        reserved.then.target = "None".into();

        let program = Program {
            statements: vec![reserved],
        };

        assert_eq!(render(&program), "if class_ >= 90:\n    None_ = \"A\"\n");
        assert_eq!(identifier("none"), "none");
        assert_eq!(identifier("lambda"), "lambda_");
    }

    #[test]
    fn empty_program_emits_nothing() {
        assert_eq!(render(&Program::default()), "");
    }
}
