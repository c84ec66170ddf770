//! Árbol de sintaxis abstracta.
//!
//! # Construcción
//! El AST no se construye por medio de la pila de llamadas, sino con
//! una pila auxiliar de fragmentos ([`Builder`]). Cada terminal con
//! valor semántico que el analizador sintáctico reconoce se apila como
//! un fragmento. Cuando una producción termina de reconocerse, los
//! fragmentos que ella aportó se desapilan y se pliegan en un único
//! fragmento de nivel superior según la [`Reduction`] de la producción.
//! Al aceptar, la pila contiene exactamente un [`Program`].
//!
//! Las palabras clave no se almacenan; todo lo demás que la generación
//! de código necesita sí.

use std::{
    fmt::{self, Display},
    vec,
};

use crate::{
    grammar::{ProductionId, Reduction, Terminal},
    lex::Token,
    parse::SyntaxError,
    source::{Located, Span},
};

/// Raíz del árbol.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<IfStatement>,
}

/// `if <condition> then <then> [else <otherwise>]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfStatement {
    pub condition: Condition,
    pub then: Assignment,
    pub otherwise: Option<Assignment>,
}

/// `<variable> <comparison> <threshold>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub variable: String,
    pub comparison: Comparison,
    pub threshold: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    GreaterOrEqual,
    LessOrEqual,
}

impl Display for Comparison {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::GreaterOrEqual => fmt.write_str(">="),
            Comparison::LessOrEqual => fmt.write_str("<="),
        }
    }
}

/// `<target> is <value>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub target: String,
    pub value: Value,
}

/// Letra literal asignada.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    pub letter: String,
}

/// Elemento de la pila de construcción.
#[derive(Debug)]
enum Fragment {
    Token(Located<Token>),
    Comparison(Comparison),
    Value(Value),
    Condition(Condition),
    Assignment(Assignment),
    Branch(IfStatement),
    Else(Option<Assignment>),
    Statement(IfStatement),

    /// Sentencias en orden inverso; la lista se reconoce de derecha a
    /// izquierda.
    Statements(Vec<IfStatement>),
    Program(Program),
}

/// Pila de construcción del AST.
#[derive(Debug, Default)]
pub struct Builder {
    stack: Vec<Fragment>,
}

/// Fragmentos aportados por una producción, en orden de izquierda a derecha.
struct Children {
    production: ProductionId,
    span: Span,
    items: vec::IntoIter<Fragment>,
}

macro_rules! take {
    ($children:expr, $variant:ident) => {
        $children.take(|fragment| match fragment {
            Fragment::$variant(inner) => Ok(inner),
            other => Err(other),
        })
    };
}

impl Children {
    fn take<T, F>(&mut self, pick: F) -> Result<T, Located<SyntaxError>>
    where
        F: FnOnce(Fragment) -> Result<T, Fragment>,
    {
        match self.items.next().map(pick) {
            Some(Ok(inner)) => Ok(inner),
            _ => Err(self.malformed()),
        }
    }

    /// Falla si quedaron fragmentos sin consumir.
    fn finish(mut self) -> Result<(), Located<SyntaxError>> {
        match self.items.next() {
            None => Ok(()),
            Some(_) => Err(self.malformed()),
        }
    }

    fn malformed(&self) -> Located<SyntaxError> {
        Located::at(SyntaxError::MalformedReduction(self.production), self.span)
    }
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    /// Altura actual de la pila; marca la base de una producción.
    pub fn height(&self) -> usize {
        self.stack.len()
    }

    /// Apila un terminal reconocido si tiene valor semántico.
    pub fn shift(&mut self, token: Located<Token>) {
        if token.val().kind().is_semantic() {
            self.stack.push(Fragment::Token(token));
        }
    }

    /// Pliega todo lo apilado desde `base` según `reduction`.
    ///
    /// `span` es la ubicación a reportar si los fragmentos no tienen
    /// la forma que la regla espera.
    pub fn reduce(
        &mut self,
        production: ProductionId,
        reduction: Reduction,
        base: usize,
        span: Span,
    ) -> Result<(), Located<SyntaxError>> {
        let base = base.min(self.stack.len());
        let mut children = Children {
            production,
            span,
            items: self.stack.split_off(base).into_iter(),
        };

        let fragment = match reduction {
            Reduction::Value => {
                let letter = take!(children, Token)?.into_inner();
                Fragment::Value(Value {
                    letter: letter.lexeme().to_owned(),
                })
            }

            Reduction::Comparison => {
                let operator = take!(children, Token)?;
                let comparison = match operator.val().kind() {
                    Terminal::GreaterOrEqual => Comparison::GreaterOrEqual,
                    Terminal::LessOrEqual => Comparison::LessOrEqual,
                    _ => return Err(children.malformed()),
                };

                Fragment::Comparison(comparison)
            }

            Reduction::Condition => {
                let variable = take!(children, Token)?.into_inner();
                let comparison = take!(children, Comparison)?;
                let (number_span, number) = take!(children, Token)?.split();

                let threshold = number.lexeme().parse::<u32>().map_err(|_| {
                    let lexeme = number.lexeme().to_owned();
                    Located::at(SyntaxError::NumberOutOfRange(lexeme), number_span)
                })?;

                Fragment::Condition(Condition {
                    variable: variable.lexeme().to_owned(),
                    comparison,
                    threshold,
                })
            }

            Reduction::Assignment => {
                let target = take!(children, Token)?.into_inner();
                let value = take!(children, Value)?;

                Fragment::Assignment(Assignment {
                    target: target.lexeme().to_owned(),
                    value,
                })
            }

            Reduction::Branch => {
                let condition = take!(children, Condition)?;
                let then = take!(children, Assignment)?;

                Fragment::Branch(IfStatement {
                    condition,
                    then,
                    otherwise: None,
                })
            }

            Reduction::Else => Fragment::Else(Some(take!(children, Assignment)?)),
            Reduction::NoElse => Fragment::Else(None),

            Reduction::Statement => {
                let mut statement = take!(children, Branch)?;
                statement.otherwise = take!(children, Else)?;

                Fragment::Statement(statement)
            }

            Reduction::Prepend => {
                let head = take!(children, Statement)?;
                let mut statements = take!(children, Statements)?;
                statements.push(head);

                Fragment::Statements(statements)
            }

            Reduction::Empty => Fragment::Statements(Vec::new()),

            Reduction::Program => {
                let mut statements = take!(children, Statements)?;
                statements.reverse();

                Fragment::Program(Program { statements })
            }
        };

        children.finish()?;
        self.stack.push(fragment);

        Ok(())
    }

    /// Extrae la raíz. La pila debe contener únicamente un [`Program`].
    pub fn finish(
        mut self,
        production: ProductionId,
        span: Span,
    ) -> Result<Program, Located<SyntaxError>> {
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(Fragment::Program(program)), true) => Ok(program),
            _ => Err(Located::at(SyntaxError::MalformedReduction(production), span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    fn token(kind: Terminal, lexeme: &str) -> Located<Token> {
        Located::at(Token::new(kind, lexeme), Span::single(Position::default()))
    }

    fn reduce(builder: &mut Builder, reduction: Reduction, base: usize) {
        builder
            .reduce(ProductionId(0), reduction, base, Span::default())
            .unwrap();
    }

    #[test]
    fn keywords_are_not_stacked() {
        let mut builder = Builder::new();
        builder.shift(token(Terminal::If, "if"));
        builder.shift(token(Terminal::Is, "is"));
        builder.shift(token(Terminal::End, ""));
        assert_eq!(builder.height(), 0);

        builder.shift(token(Terminal::Identifier, "grade"));
        assert_eq!(builder.height(), 1);
    }

    #[test]
    fn assignment_folds_identifier_and_value() {
        let mut builder = Builder::new();

        builder.shift(token(Terminal::Identifier, "grade"));
        let value_base = builder.height();
        builder.shift(token(Terminal::Letter, "A"));
        reduce(&mut builder, Reduction::Value, value_base);
        reduce(&mut builder, Reduction::Assignment, 0);

        match builder.stack.as_slice() {
            [Fragment::Assignment(assignment)] => assert_eq!(
                assignment,
                &Assignment {
                    target: "grade".into(),
                    value: Value { letter: "A".into() },
                }
            ),

            other => panic!("unexpected stack {:?}", other),
        }
    }

    #[test]
    fn oversized_threshold_is_reported_at_the_number() {
        let mut builder = Builder::new();

        builder.shift(token(Terminal::Identifier, "score"));
        builder.shift(token(Terminal::GreaterOrEqual, ">="));
        reduce(&mut builder, Reduction::Comparison, 1);

        let number = Located::at(
            Token::new(Terminal::Number, "99999999999"),
            Span::single(Position::new(1, 10)),
        );
        builder.shift(number);

        let error = builder
            .reduce(ProductionId(9), Reduction::Condition, 0, Span::default())
            .unwrap_err();

        assert_eq!(
            error.val(),
            &SyntaxError::NumberOutOfRange("99999999999".into())
        );
        assert_eq!(error.span().start(), Position::new(1, 10));
    }

    #[test]
    fn mismatched_fragments_are_malformed() {
        let mut builder = Builder::new();
        builder.shift(token(Terminal::Letter, "A"));

        let error = builder
            .reduce(ProductionId(7), Reduction::Branch, 0, Span::default())
            .unwrap_err();

        assert_eq!(error.val(), &SyntaxError::MalformedReduction(ProductionId(7)));
    }

    #[test]
    fn leftover_fragments_are_malformed() {
        let mut builder = Builder::new();
        builder.shift(token(Terminal::Letter, "A"));
        builder.shift(token(Terminal::Letter, "B"));

        let error = builder
            .reduce(ProductionId(13), Reduction::Value, 0, Span::default())
            .unwrap_err();

        assert_eq!(error.val(), &SyntaxError::MalformedReduction(ProductionId(13)));
    }

    #[test]
    fn empty_list_builds_empty_program() {
        let mut builder = Builder::new();
        reduce(&mut builder, Reduction::Empty, 0);
        reduce(&mut builder, Reduction::Program, 0);

        let program = builder.finish(ProductionId(1), Span::default()).unwrap();
        assert_eq!(program, Program::default());
    }
}
