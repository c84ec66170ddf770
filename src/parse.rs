//! Análisis sintáctico dirigido por tabla.
//!
//! # Máquina de pila
//! El analizador no es descendente recursivo: mantiene una pila
//! explícita que inicia como `[$, <Program>]`, con el símbolo inicial
//! en el tope, y un cursor sobre la secuencia de tokens. En cada paso
//! se observa el tope de la pila y un único token de lookahead:
//!
//! - Un terminal en el tope debe coincidir con el token actual. Se
//!   desapila, se avanza el cursor y, si el token tiene valor semántico,
//!   se entrega al constructor del AST.
//! - Un no terminal en el tope se reemplaza por el cuerpo de la
//!   producción que indica la tabla, en orden inverso, sobre un marcador
//!   de reducción.
//! - Un marcador de reducción en el tope indica que todos los símbolos
//!   de su producción ya fueron consumidos, por lo cual se pliegan sus
//!   fragmentos en el AST. Los marcadores no aparecen en la traza.
//!
//! La entrada se acepta cuando la pila se vacía al mismo tiempo que se
//! consume el token `$`. Solo se reporta el primer error; no hay
//! recuperación.

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    mem,
};

use thiserror::Error;

use crate::{
    ast::{Builder, Program},
    grammar::{Grammar, NonTerminal, ProductionId, Symbol, Terminal},
    lex::Token,
    source::{Located, Span},
    table::ParseTable,
};

/// Error de análisis sintáctico.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Expected '{expected}', got '{}'", .found.lexeme())]
    ExpectedTerminal { expected: Terminal, found: Token },

    #[error("Unexpected {found} while parsing {nonterminal}, expected one of: {}", list(.expected))]
    NoTableEntry {
        nonterminal: NonTerminal,
        found: Token,
        expected: BTreeSet<Terminal>,
    },

    #[error("Abrupt end of program, expected {expected}")]
    UnexpectedEndOfInput { expected: Symbol },

    #[error("Expected end of input, found {found} instead")]
    TrailingInput { found: Token },

    #[error("Number literal `{0}` is out of range, valid range is [0, {}]", u32::MAX)]
    NumberOutOfRange(String),

    #[error("Production {0} does not match its AST construction rule")]
    MalformedReduction(ProductionId),
}

fn list(terminals: &BTreeSet<Terminal>) -> String {
    terminals
        .iter()
        .map(|terminal| format!("`{}`", terminal))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Una acción registrada en la traza.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Se consumió un terminal.
    Match(Terminal),

    /// Se expandió un no terminal.
    Apply {
        production: ProductionId,
        epsilon: bool,
    },

    /// Se consumió `$` con la pila vacía.
    Accept,
}

impl Display for Action {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Match(terminal) => write!(fmt, "Match {}", terminal),
            Action::Apply {
                production,
                epsilon: false,
            } => write!(fmt, "Apply rule {}", production),
            Action::Apply {
                production,
                epsilon: true,
            } => write!(fmt, "Apply rule {} (ε)", production),
            Action::Accept => fmt.write_str("ACCEPT"),
        }
    }
}

/// Un paso de la traza.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Símbolos en la pila antes de la acción, del fondo al tope.
    pub stack: Vec<Symbol>,

    /// Índice del token de lookahead.
    pub cursor: usize,

    pub lookahead: Terminal,
    pub action: Action,
}

/// Resultado de un análisis exitoso.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parse {
    pub program: Program,
    pub trace: Vec<Step>,
}

/// Analiza una secuencia de tokens completa.
pub fn parse(
    grammar: &Grammar,
    table: &ParseTable,
    tokens: Vec<Located<Token>>,
) -> Result<Parse, Located<SyntaxError>> {
    let mut parser = Parser::new(grammar, table, tokens);
    let program = parser.run()?;

    Ok(Parse {
        program,
        trace: parser.into_trace(),
    })
}

#[derive(Copy, Clone, Debug)]
enum Entry {
    Symbol(Symbol),
    Reduce { production: ProductionId, base: usize },
}

/// Estado de un análisis en curso.
///
/// La gramática y la tabla se comparten por referencia; todo lo demás
/// pertenece a este análisis únicamente.
///
/// `symbols` refleja las entradas [`Entry::Symbol`] de `stack`, sin los
/// marcadores de reducción, los cuales crecen con cada sentencia.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
    tokens: Vec<Located<Token>>,
    end: Located<Token>,
    cursor: usize,
    stack: Vec<Entry>,
    symbols: Vec<Symbol>,
    builder: Builder,
    trace: Vec<Step>,
    root: Option<ProductionId>,
}

type Parsed<T> = Result<T, Located<SyntaxError>>;

impl<'g> Parser<'g> {
    /// Prepara un análisis. Si la secuencia no termina en `$`, se
    /// agrega uno inmediatamente después del último token.
    pub fn new(
        grammar: &'g Grammar,
        table: &'g ParseTable,
        mut tokens: Vec<Located<Token>>,
    ) -> Self {
        let end = match tokens.last() {
            Some(last) if last.val().kind() == Terminal::End => last.clone(),
            Some(last) => Located::at(Token::end(), Span::single(last.span().end())),
            None => Located::at(Token::end(), Span::default()),
        };

        if tokens.last() != Some(&end) {
            tokens.push(end.clone());
        }

        let symbols = vec![
            Symbol::Terminal(Terminal::End),
            Symbol::NonTerminal(table.start()),
        ];

        Parser {
            grammar,
            table,
            tokens,
            end,
            cursor: 0,
            stack: symbols.iter().map(|&symbol| Entry::Symbol(symbol)).collect(),
            symbols,
            builder: Builder::new(),
            trace: Vec::new(),
            root: None,
        }
    }

    /// Ejecuta la máquina hasta aceptar o hasta el primer error.
    pub fn run(&mut self) -> Parsed<Program> {
        while let Some(&entry) = self.stack.last() {
            let lookahead = self.lookahead().clone();

            match entry {
                Entry::Reduce { production, base } => {
                    self.reduce(production, base, lookahead.span())?
                }

                Entry::Symbol(Symbol::Terminal(expected)) => self.expect(expected, lookahead)?,
                Entry::Symbol(Symbol::NonTerminal(nonterminal)) => {
                    self.expand(nonterminal, lookahead)?
                }
            }
        }

        if let Some(trailing) = self.tokens.get(self.cursor) {
            let (span, found) = trailing.clone().split();
            return Err(Located::at(SyntaxError::TrailingInput { found }, span));
        }

        let root = self.root.unwrap_or(ProductionId(0));
        mem::take(&mut self.builder).finish(root, self.end.span())
    }

    /// Traza acumulada hasta el momento.
    pub fn trace(&self) -> &[Step] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<Step> {
        self.trace
    }

    /// Tokens de entrada, incluyendo el `$` final.
    pub fn tokens(&self) -> &[Located<Token>] {
        &self.tokens
    }

    fn lookahead(&self) -> &Located<Token> {
        self.tokens.get(self.cursor).unwrap_or(&self.end)
    }

    fn expect(&mut self, expected: Terminal, lookahead: Located<Token>) -> Parsed<()> {
        let found = lookahead.val().kind();
        if found != expected {
            let (span, found) = lookahead.split();
            let error = if found.kind() == Terminal::End {
                SyntaxError::UnexpectedEndOfInput {
                    expected: Symbol::Terminal(expected),
                }
            } else if expected == Terminal::End {
                SyntaxError::TrailingInput { found }
            } else {
                SyntaxError::ExpectedTerminal { expected, found }
            };

            return Err(Located::at(error, span));
        }

        let action = match expected {
            Terminal::End if self.symbols.len() == 1 => Action::Accept,
            _ => Action::Match(expected),
        };

        self.record(found, action);
        self.stack.pop();
        self.symbols.pop();
        self.cursor += 1;
        self.builder.shift(lookahead);

        Ok(())
    }

    fn expand(&mut self, nonterminal: NonTerminal, lookahead: Located<Token>) -> Parsed<()> {
        let found = lookahead.val().kind();
        let id = match self.table.get(nonterminal, found) {
            Some(id) => id,
            None => {
                let (span, found) = lookahead.split();
                let error = if found.kind() == Terminal::End {
                    SyntaxError::UnexpectedEndOfInput {
                        expected: Symbol::NonTerminal(nonterminal),
                    }
                } else {
                    SyntaxError::NoTableEntry {
                        nonterminal,
                        found,
                        expected: self.table.expected(nonterminal),
                    }
                };

                return Err(Located::at(error, span));
            }
        };

        let grammar = self.grammar;
        let production = grammar
            .production(id)
            .ok_or_else(|| Located::at(SyntaxError::MalformedReduction(id), lookahead.span()))?;

        self.record(
            found,
            Action::Apply {
                production: id,
                epsilon: production.is_epsilon(),
            },
        );

        self.stack.pop();
        self.symbols.pop();
        self.root.get_or_insert(id);

        self.stack.push(Entry::Reduce {
            production: id,
            base: self.builder.height(),
        });

        let body = production.body().iter().rev();
        self.stack.extend(body.clone().map(|&symbol| Entry::Symbol(symbol)));
        self.symbols.extend(body);

        Ok(())
    }

    fn reduce(&mut self, id: ProductionId, base: usize, span: Span) -> Parsed<()> {
        let reduction = self
            .grammar
            .production(id)
            .map(|production| production.reduction())
            .ok_or_else(|| Located::at(SyntaxError::MalformedReduction(id), span))?;

        log::trace!("Reduce {} ({:?})", id, reduction);
        self.stack.pop();
        self.builder.reduce(id, reduction, base, span)
    }

    fn record(&mut self, lookahead: Terminal, action: Action) {
        let stack = self.symbols.clone();

        if log::log_enabled!(log::Level::Trace) {
            let rendered: Vec<_> = stack.iter().map(ToString::to_string).collect();
            log::trace!("[{}] on `{}`: {}", rendered.join(" "), lookahead, action);
        }

        self.trace.push(Step {
            stack,
            cursor: self.cursor,
            lookahead,
            action,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::Analysis,
        ast::{Assignment, Comparison, Condition, IfStatement, Value},
        lex::Lexer,
        source::Position,
    };

    struct Fixture {
        grammar: Grammar,
        table: ParseTable,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();

            let grammar = Grammar::grades();
            let table = ParseTable::build(&grammar, &Analysis::compute(&grammar)).unwrap();
            Fixture { grammar, table }
        }

        fn parse(&self, text: &str) -> Result<Parse, Located<SyntaxError>> {
            let tokens = Lexer::new(text).tokenize().unwrap();
            parse(&self.grammar, &self.table, tokens)
        }
    }

    fn assignment(target: &str, letter: &str) -> Assignment {
        Assignment {
            target: target.into(),
            value: Value {
                letter: letter.into(),
            },
        }
    }

    #[test]
    fn accepts_chained_statements() {
        let fixture = Fixture::new();
        let parse = fixture
            .parse("if score >= 90 then grade is A else grade is F if points <= 50 then result is P")
            .unwrap();

        assert_eq!(
            parse.program.statements,
            vec![
                IfStatement {
                    condition: Condition {
                        variable: "score".into(),
                        comparison: Comparison::GreaterOrEqual,
                        threshold: 90,
                    },
                    then: assignment("grade", "A"),
                    otherwise: Some(assignment("grade", "F")),
                },
                IfStatement {
                    condition: Condition {
                        variable: "points".into(),
                        comparison: Comparison::LessOrEqual,
                        threshold: 50,
                    },
                    then: assignment("result", "P"),
                    otherwise: None,
                },
            ]
        );
    }

    #[test]
    fn trace_starts_with_start_symbol_and_ends_in_accept() {
        let fixture = Fixture::new();
        let trace = fixture.parse("if x >= 1 then y is A").unwrap().trace;

        let first = &trace[0];
        assert_eq!(
            first.stack,
            vec![
                Symbol::Terminal(Terminal::End),
                Symbol::NonTerminal(NonTerminal::Program)
            ]
        );
        assert_eq!(
            first.action,
            Action::Apply {
                production: ProductionId(1),
                epsilon: false,
            }
        );

        let last = trace.last().unwrap();
        assert_eq!(last.action, Action::Accept);
        assert_eq!(last.stack, vec![Symbol::Terminal(Terminal::End)]);
    }

    #[test]
    fn epsilon_rules_are_traced() {
        let fixture = Fixture::new();
        let trace = fixture.parse("if x >= 1 then y is A").unwrap().trace;

        let epsilons: Vec<_> = trace
            .iter()
            .filter_map(|step| match step.action {
                Action::Apply {
                    production,
                    epsilon: true,
                } => Some(production),
                _ => None,
            })
            .collect();

        assert_eq!(epsilons, vec![ProductionId(8), ProductionId(4)]);
    }

    #[test]
    fn missing_then_is_reported_at_the_offending_token() {
        let fixture = Fixture::new();
        let error = fixture
            .parse("if score >= 90 grade is A")
            .unwrap_err();

        assert_eq!(
            error.val(),
            &SyntaxError::ExpectedTerminal {
                expected: Terminal::Then,
                found: Token::new(Terminal::Identifier, "grade"),
            }
        );
        assert_eq!(error.span().start(), Position::new(1, 16));
        assert_eq!(error.val().to_string(), "Expected 'then', got 'grade'");
    }

    #[test]
    fn oversized_threshold_fails_at_the_number() {
        let fixture = Fixture::new();
        let error = fixture
            .parse("if x >= 99999999999 then y is A")
            .unwrap_err();

        assert_eq!(
            error.val(),
            &SyntaxError::NumberOutOfRange("99999999999".into())
        );
        assert_eq!(error.span().to_string(), "1:[9-19]");

        let error = fixture
            .parse("if x >= 4294967296 then y is A")
            .unwrap_err();
        assert!(matches!(error.val(), SyntaxError::NumberOutOfRange(_)));

        let parse = fixture.parse("if x >= 4294967295 then y is A").unwrap();
        assert_eq!(parse.program.statements[0].condition.threshold, u32::MAX);
    }

    #[test]
    fn long_statement_lists_keep_source_order() {
        let fixture = Fixture::new();

        let source: String = (0..5000)
            .map(|threshold| format!("if score >= {} then grade is A ", threshold))
            .collect();

        let parse = fixture.parse(&source).unwrap();
        let statements = &parse.program.statements;

        assert_eq!(statements.len(), 5000);
        assert!(statements
            .iter()
            .enumerate()
            .all(|(index, statement)| statement.condition.threshold == index as u32));

        let deepest = parse.trace.iter().map(|step| step.stack.len()).max();
        assert!(deepest <= Some(8));
    }

    #[test]
    fn statements_must_start_with_if() {
        let fixture = Fixture::new();
        let error = fixture.parse("grade is A").unwrap_err();

        match error.val() {
            SyntaxError::NoTableEntry {
                nonterminal,
                expected,
                ..
            } => {
                assert_eq!(*nonterminal, NonTerminal::Program);
                assert_eq!(expected, &BTreeSet::from([Terminal::If]));
            }

            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn truncated_input_is_unexpected_end() {
        let fixture = Fixture::new();

        let error = fixture.parse("if score >= 90 then grade is").unwrap_err();
        assert_eq!(
            error.val(),
            &SyntaxError::UnexpectedEndOfInput {
                expected: Symbol::NonTerminal(NonTerminal::Value),
            }
        );

        let error = fixture.parse("if score >=").unwrap_err();
        assert_eq!(
            error.val(),
            &SyntaxError::UnexpectedEndOfInput {
                expected: Symbol::Terminal(Terminal::Number),
            }
        );

        let error = fixture.parse("").unwrap_err();
        assert_eq!(
            error.val(),
            &SyntaxError::UnexpectedEndOfInput {
                expected: Symbol::NonTerminal(NonTerminal::Program),
            }
        );
    }

    #[test]
    fn dangling_else_is_rejected() {
        let fixture = Fixture::new();
        let error = fixture
            .parse("if x >= 1 then y is A else y is B else y is C")
            .unwrap_err();

        assert!(matches!(
            error.val(),
            SyntaxError::NoTableEntry {
                nonterminal: NonTerminal::StatementTail,
                ..
            }
        ));
    }

    #[test]
    fn tokens_after_end_marker_are_trailing() {
        let fixture = Fixture::new();
        let mut tokens = Lexer::new("if x >= 1 then y is A").tokenize().unwrap();
        let extra = tokens[0].clone();
        tokens.push(extra);

        let error = parse(&fixture.grammar, &fixture.table, tokens).unwrap_err();
        assert_eq!(
            error.val(),
            &SyntaxError::TrailingInput {
                found: Token::new(Terminal::If, "if"),
            }
        );
    }

    #[test]
    fn missing_end_marker_is_supplied() {
        let fixture = Fixture::new();
        let mut tokens = Lexer::new("if x >= 1 then y is A").tokenize().unwrap();
        tokens.pop();

        let parse = parse(&fixture.grammar, &fixture.table, tokens).unwrap();
        assert_eq!(parse.program.statements.len(), 1);
    }

    #[test]
    fn trace_survives_errors() {
        let fixture = Fixture::new();
        let tokens = Lexer::new("if x >= 1 y").tokenize().unwrap();

        let mut parser = Parser::new(&fixture.grammar, &fixture.table, tokens);
        assert!(parser.run().is_err());

        let last = parser.trace().last().unwrap();
        assert_eq!(last.action, Action::Match(Terminal::Number));
    }

    #[test]
    fn action_display() {
        let apply = Action::Apply {
            production: ProductionId(8),
            epsilon: true,
        };

        assert_eq!(apply.to_string(), "Apply rule 8 (ε)");
        assert_eq!(Action::Match(Terminal::If).to_string(), "Match if");
        assert_eq!(Action::Accept.to_string(), "ACCEPT");
    }
}
