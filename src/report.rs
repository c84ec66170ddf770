//! Reportes legibles de cada fase.
//!
//! Nada de esto participa en el análisis; solo presenta gramática,
//! conjuntos, tabla, trazas y conflictos sobre cualquier [`Write`].

use std::io::{self, Write};

use bitflags::bitflags;

use crate::{
    analysis::Analysis,
    grammar::{Grammar, Terminal},
    lex::Token,
    parse::Step,
    source::Located,
    table::{GrammarConflictError, ParseTable},
};

bitflags! {
    /// Reportes a presentar junto a una compilación.
    pub struct ReportOptions: u32 {
        /// Producciones numeradas.
        const GRAMMAR = 0x01;

        /// Conjuntos FIRST y FOLLOW.
        const SETS = 0x02;

        /// Tabla LL(1).
        const TABLE = 0x04;

        /// Tokens con su ubicación.
        const TOKENS = 0x08;

        /// Traza de la máquina de pila, también en caso de error.
        const TRACE = 0x10;

        /// Árbol sintáctico resultante.
        const AST = 0x20;
    }
}

/// Tokens de entrada restantes que se muestran por paso.
const INPUT_PREVIEW: usize = 4;

/// Celda vacía de la tabla.
const EMPTY_CELL: &str = "—";

fn heading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(60))
}

/// Escribe las producciones con su número.
pub fn write_grammar<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    heading(out, "GRAMMAR")?;

    for production in grammar.productions() {
        writeln!(out, "{:>4} {}", format!("{}.", production.id()), production)?;
    }

    writeln!(out)
}

/// Escribe FIRST (con ε) y FOLLOW de cada no terminal.
pub fn write_sets<W: Write>(out: &mut W, analysis: &Analysis) -> io::Result<()> {
    heading(out, "FIRST SETS")?;
    for (nonterminal, first) in analysis.first_sets() {
        writeln!(out, "  FIRST({}) = {}", nonterminal, first)?;
    }

    writeln!(out)?;
    heading(out, "FOLLOW SETS")?;

    for (nonterminal, follow) in analysis.follow_sets() {
        let items: Vec<_> = follow.iter().map(ToString::to_string).collect();
        writeln!(out, "  FOLLOW({}) = {{ {} }}", nonterminal, items.join(", "))?;
    }

    for nonterminal in analysis.unreachable() {
        writeln!(out, "  warning: {} is unreachable", nonterminal)?;
    }

    writeln!(out)
}

/// Escribe la tabla con no terminales por fila y terminales por columna.
pub fn write_table<W: Write>(out: &mut W, grammar: &Grammar, table: &ParseTable) -> io::Result<()> {
    heading(out, "LL(1) PARSING TABLE")?;

    let rows = grammar.nonterminals();
    let row_width = rows
        .iter()
        .map(|row| row.to_string().chars().count())
        .max()
        .unwrap_or(0);

    let widths: Vec<usize> = Terminal::ALL
        .iter()
        .map(|column| column.to_string().chars().count().max(3))
        .collect();

    write!(out, "{:row_width$} |", "", row_width = row_width)?;
    for (column, width) in Terminal::ALL.iter().zip(&widths) {
        write!(out, " {:<width$}", column.to_string(), width = width)?;
    }
    writeln!(out)?;

    let total = row_width + 2 + widths.iter().map(|width| width + 1).sum::<usize>();
    writeln!(out, "{}", "-".repeat(total))?;

    for row in rows {
        write!(out, "{:<row_width$} |", row.to_string(), row_width = row_width)?;
        for (&column, width) in Terminal::ALL.iter().zip(&widths) {
            let cell = match table.get(row, column) {
                Some(id) => id.to_string(),
                None => String::from(EMPTY_CELL),
            };

            write!(out, " {:<width$}", cell, width = width)?;
        }

        writeln!(out)?;
    }

    writeln!(out)
}

/// Escribe cada token con su ubicación.
pub fn write_tokens<W: Write>(out: &mut W, tokens: &[Located<Token>]) -> io::Result<()> {
    heading(out, "TOKENS")?;

    for token in tokens {
        writeln!(out, "  {:<10} {}", token.span().to_string(), token.val())?;
    }

    writeln!(out)
}

/// Escribe una traza de análisis.
///
/// `tokens` debe ser la misma secuencia de entrada que produjo la traza,
/// de la cual se toma la entrada restante de cada paso.
pub fn write_trace<W: Write>(
    out: &mut W,
    trace: &[Step],
    tokens: &[Located<Token>],
) -> io::Result<()> {
    heading(out, "PARSE TRACE")?;

    let rows: Vec<[String; 4]> = trace
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let stack: Vec<_> = step.stack.iter().map(ToString::to_string).collect();
            [
                (index + 1).to_string(),
                stack.join(" "),
                remaining_input(tokens, step.cursor),
                step.action.to_string(),
            ]
        })
        .collect();

    let header = ["Step", "Stack", "Input", "Action"];
    let mut widths = header.map(|title| title.chars().count());

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |out: &mut W, cells: [&str; 4]| {
        writeln!(
            out,
            "{:<w0$} | {:<w1$} | {:<w2$} | {}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        )
    };

    line(out, header)?;
    writeln!(
        out,
        "{}",
        "-".repeat(widths.iter().sum::<usize>() + 3 * (widths.len() - 1))
    )?;

    for row in &rows {
        line(out, [&row[0], &row[1], &row[2], &row[3]])?;
    }

    writeln!(out)
}

fn remaining_input(tokens: &[Located<Token>], cursor: usize) -> String {
    let rest = tokens.get(cursor..).unwrap_or(&[]);

    let mut shown: Vec<_> = rest
        .iter()
        .take(INPUT_PREVIEW)
        .map(|token| match token.val().kind() {
            Terminal::End => Terminal::End.to_string(),
            _ => token.val().lexeme().to_owned(),
        })
        .collect();

    if rest.len() > INPUT_PREVIEW {
        shown.push(String::from("..."));
    }

    shown.join(" ")
}

/// Escribe los conflictos de una gramática rechazada.
pub fn write_conflicts<W: Write>(out: &mut W, error: &GrammarConflictError) -> io::Result<()> {
    heading(out, "CONFLICTS")?;

    for conflict in &error.conflicts {
        writeln!(out, "  {}", conflict)?;
    }

    writeln!(out, "{}", error)
}
