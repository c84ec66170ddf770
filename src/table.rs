//! Construcción de la tabla LL(1).
//!
//! Para cada producción `A → α` se asigna la producción a la celda
//! `[A, t]` para todo `t` en FIRST(α). Si α es anulable, también se
//! asigna para todo `t` en FOLLOW(A). Una celda que recibiría una
//! segunda producción constituye un conflicto; la gramática se rechaza
//! por ambigua antes de analizar cualquier entrada. Se reportan todos
//! los conflictos encontrados, no solo el primero.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
};

use thiserror::Error;

use crate::{
    analysis::Analysis,
    grammar::{Grammar, NonTerminal, ProductionId, Terminal},
};

/// Una celda reclamada por más de una producción.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub head: NonTerminal,
    pub terminal: Terminal,
    pub existing: ProductionId,
    pub incoming: ProductionId,
}

impl Display for Conflict {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "[{}, {}] claimed by productions {} and {}",
            self.head, self.terminal, self.existing, self.incoming
        )
    }
}

/// La gramática no es LL(1).
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Grammar is not LL(1): {} conflicting cell(s)", .conflicts.len())]
pub struct GrammarConflictError {
    pub conflicts: Vec<Conflict>,
}

/// Tabla de análisis sintáctico LL(1).
///
/// Las celdas ausentes son celdas de error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTable {
    start: NonTerminal,
    cells: BTreeMap<(NonTerminal, Terminal), ProductionId>,
}

impl ParseTable {
    /// Deriva la tabla a partir de la gramática y su análisis.
    pub fn build(grammar: &Grammar, analysis: &Analysis) -> Result<Self, GrammarConflictError> {
        let mut cells = BTreeMap::new();
        let mut conflicts = Vec::new();

        for production in grammar.productions() {
            let head = production.head();
            let first = analysis.first_of(production.body());

            let mut lookaheads: BTreeSet<Terminal> = first.terminals;
            if first.nullable {
                if let Some(follow) = analysis.follow(head) {
                    lookaheads.extend(follow.iter().copied());
                }

                if head == grammar.start() {
                    lookaheads.insert(Terminal::End);
                }
            }

            for terminal in lookaheads {
                match cells.get(&(head, terminal)) {
                    Some(&existing) if existing != production.id() => {
                        log::debug!(
                            "Conflict at [{}, {}]: {} vs {}",
                            head,
                            terminal,
                            existing,
                            production.id()
                        );

                        conflicts.push(Conflict {
                            head,
                            terminal,
                            existing,
                            incoming: production.id(),
                        });
                    }

                    Some(_) => (),
                    None => {
                        cells.insert((head, terminal), production.id());
                    }
                }
            }
        }

        if !conflicts.is_empty() {
            log::warn!("Rejecting grammar with {} conflict(s)", conflicts.len());
            return Err(GrammarConflictError { conflicts });
        }

        log::debug!("LL(1) table built with {} cells", cells.len());
        Ok(ParseTable {
            start: grammar.start(),
            cells,
        })
    }

    /// Símbolo inicial de la gramática de origen.
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    /// Consulta la celda `[nonterminal, terminal]`.
    pub fn get(&self, nonterminal: NonTerminal, terminal: Terminal) -> Option<ProductionId> {
        self.cells.get(&(nonterminal, terminal)).copied()
    }

    /// Terminales con celda no vacía para un no terminal.
    pub fn expected(&self, nonterminal: NonTerminal) -> BTreeSet<Terminal> {
        self.cells
            .keys()
            .filter(|(row, _)| *row == nonterminal)
            .map(|&(_, terminal)| terminal)
            .collect()
    }

    /// Celdas no vacías, en orden de fila y columna.
    pub fn cells(&self) -> impl Iterator<Item = (NonTerminal, Terminal, ProductionId)> + '_ {
        self.cells
            .iter()
            .map(|(&(nonterminal, terminal), &id)| (nonterminal, terminal, id))
    }
}
