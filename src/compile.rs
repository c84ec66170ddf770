//! Orquestación de las fases.
//!
//! Un [`Compiler`] se construye una sola vez: la gramática, su análisis
//! y la tabla quedan fijos a partir de ese momento y se comparten entre
//! todas las compilaciones, incluso entre hilos.

use std::io;

use thiserror::Error;

use crate::{
    analysis::Analysis,
    ast::Program,
    codegen,
    error::Diagnostics,
    grammar::Grammar,
    lex::{LexicalError, Lexer, Token},
    parse::{Parser, Step, SyntaxError},
    source::Located,
    table::{GrammarConflictError, ParseTable},
};

/// Falla de una compilación particular.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{}", .0.val())]
    Lexical(Located<LexicalError>),

    /// Se conserva la traza hasta el punto del error.
    #[error("{}", .error.val())]
    Syntax {
        error: Located<SyntaxError>,
        tokens: Vec<Located<Token>>,
        trace: Vec<Step>,
    },

    #[error("Failed to emit generated code")]
    Output(#[from] io::Error),
}

impl CompileError {
    /// Presentación al usuario, si el error tiene ubicación.
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        match self {
            CompileError::Lexical(error) => {
                Some(Diagnostics::from(error.clone()).kind("Lexical error"))
            }

            CompileError::Syntax { error, .. } => {
                Some(Diagnostics::from(error.clone()).kind("Syntax error"))
            }

            CompileError::Output(_) => None,
        }
    }
}

/// Resultado de una compilación exitosa.
#[derive(Clone, Debug)]
pub struct Compilation {
    pub tokens: Vec<Located<Token>>,
    pub program: Program,
    pub trace: Vec<Step>,
    pub output: String,
}

#[derive(Clone, Debug)]
pub struct Compiler {
    grammar: Grammar,
    analysis: Analysis,
    table: ParseTable,
}

impl Compiler {
    /// Compilador para la gramática integrada.
    pub fn new() -> Result<Self, GrammarConflictError> {
        Compiler::with_grammar(Grammar::grades())
    }

    /// Analiza `grammar` y construye su tabla. Falla si no es LL(1).
    pub fn with_grammar(grammar: Grammar) -> Result<Self, GrammarConflictError> {
        let analysis = Analysis::compute(&grammar);
        let table = ParseTable::build(&grammar, &analysis)?;

        Ok(Compiler {
            grammar,
            analysis,
            table,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Compila un programa completo: léxico, sintaxis y generación.
    pub fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(CompileError::Lexical)?;

        log::debug!("Lexed {} token(s)", tokens.len());

        let mut parser = Parser::new(&self.grammar, &self.table, tokens);
        let program = match parser.run() {
            Ok(program) => program,
            Err(error) => {
                return Err(CompileError::Syntax {
                    error,
                    tokens: parser.tokens().to_vec(),
                    trace: parser.into_trace(),
                })
            }
        };

        let tokens = parser.tokens().to_vec();
        let trace = parser.into_trace();
        log::debug!(
            "Accepted {} statement(s) in {} step(s)",
            program.statements.len(),
            trace.len()
        );

        let mut output = Vec::new();
        codegen::emit(&program, &mut output)?;

        Ok(Compilation {
            tokens,
            program,
            trace,
            output: String::from_utf8_lossy(&output).into_owned(),
        })
    }
}
