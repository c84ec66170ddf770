//! Conjuntos FIRST y FOLLOW.
//!
//! Ambos conjuntos se calculan por punto fijo: se recorren todas las
//! producciones en pasadas completas hasta que ninguna pasada modifica
//! conjunto alguno. Los conjuntos solo crecen y están acotados por el
//! alfabeto finito, por lo cual el cálculo siempre termina.
//!
//! El marcador sintético ε de FIRST se representa aparte como la
//! propiedad de ser anulable ([`FirstSet::nullable`]), de manera que
//! los conjuntos de terminales nunca lo contienen.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
};

use crate::grammar::{Grammar, NonTerminal, Symbol, Terminal};

/// FIRST de un no terminal o de una secuencia de símbolos.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirstSet {
    pub terminals: BTreeSet<Terminal>,
    pub nullable: bool,
}

impl FirstSet {
    /// Determina si `terminal` puede iniciar una derivación.
    pub fn contains(&self, terminal: Terminal) -> bool {
        self.terminals.contains(&terminal)
    }
}

impl Display for FirstSet {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<String> = self.terminals.iter().map(ToString::to_string).collect();
        if self.nullable {
            items.push(String::from("ε"));
        }

        write!(fmt, "{{ {} }}", items.join(", "))
    }
}

/// Resultado del análisis de una gramática.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analysis {
    first: BTreeMap<NonTerminal, FirstSet>,
    follow: BTreeMap<NonTerminal, BTreeSet<Terminal>>,
    unreachable: BTreeSet<NonTerminal>,
}

impl Analysis {
    /// Calcula FIRST y FOLLOW para todos los no terminales de `grammar`.
    pub fn compute(grammar: &Grammar) -> Self {
        let nonterminals = grammar.nonterminals();

        let mut analysis = Analysis {
            first: nonterminals
                .iter()
                .map(|&nonterminal| (nonterminal, FirstSet::default()))
                .collect(),
            follow: nonterminals
                .iter()
                .map(|&nonterminal| (nonterminal, BTreeSet::new()))
                .collect(),
            unreachable: grammar.unreachable(),
        };

        let mut passes = 1;
        while analysis.refine_first(grammar) {
            passes += 1;
        }

        log::debug!("FIRST sets closed after {} passes", passes);

        let mut passes = 1;
        while analysis.refine_follow(grammar) {
            passes += 1;
        }

        log::debug!("FOLLOW sets closed after {} passes", passes);

        for nonterminal in &analysis.unreachable {
            log::info!("{} is unreachable from {}", nonterminal, grammar.start());
        }

        analysis
    }

    /// Ejecuta una pasada adicional de ambos puntos fijos.
    ///
    /// Retorna `true` si algún conjunto cambió. Sobre un resultado de
    /// [`Analysis::compute`] siempre retorna `false`.
    pub fn refine(&mut self, grammar: &Grammar) -> bool {
        let first = self.refine_first(grammar);
        let follow = self.refine_follow(grammar);
        first || follow
    }

    /// FIRST de un no terminal.
    pub fn first(&self, nonterminal: NonTerminal) -> Option<&FirstSet> {
        self.first.get(&nonterminal)
    }

    /// FOLLOW de un no terminal.
    pub fn follow(&self, nonterminal: NonTerminal) -> Option<&BTreeSet<Terminal>> {
        self.follow.get(&nonterminal)
    }

    /// Todos los conjuntos FIRST, en orden de no terminal.
    pub fn first_sets(&self) -> impl Iterator<Item = (NonTerminal, &FirstSet)> {
        self.first.iter().map(|(&nonterminal, set)| (nonterminal, set))
    }

    /// Todos los conjuntos FOLLOW, en orden de no terminal.
    pub fn follow_sets(&self) -> impl Iterator<Item = (NonTerminal, &BTreeSet<Terminal>)> {
        self.follow.iter().map(|(&nonterminal, set)| (nonterminal, set))
    }

    /// No terminales inalcanzables desde el símbolo inicial.
    pub fn unreachable(&self) -> &BTreeSet<NonTerminal> {
        &self.unreachable
    }

    /// FIRST de una secuencia de símbolos.
    ///
    /// Una secuencia vacía es anulable y no tiene terminales.
    pub fn first_of(&self, symbols: &[Symbol]) -> FirstSet {
        let mut result = FirstSet::default();

        for symbol in symbols {
            match *symbol {
                Symbol::Terminal(terminal) => {
                    result.terminals.insert(terminal);
                    return result;
                }

                Symbol::NonTerminal(nonterminal) => {
                    let first = match self.first.get(&nonterminal) {
                        Some(first) => first,
                        None => return result,
                    };

                    result.terminals.extend(first.terminals.iter().copied());
                    if !first.nullable {
                        return result;
                    }
                }
            }
        }

        result.nullable = true;
        result
    }

    fn refine_first(&mut self, grammar: &Grammar) -> bool {
        let mut changed = false;

        for production in grammar.productions() {
            let derived = self.first_of(production.body());
            let first = self.first.entry(production.head()).or_default();

            for terminal in derived.terminals {
                changed |= first.terminals.insert(terminal);
            }

            if derived.nullable && !first.nullable {
                first.nullable = true;
                changed = true;
            }
        }

        changed
    }

    fn refine_follow(&mut self, grammar: &Grammar) -> bool {
        let mut changed = self
            .follow
            .entry(grammar.start())
            .or_default()
            .insert(Terminal::End);

        for production in grammar.productions() {
            let body = production.body();
            for (index, symbol) in body.iter().enumerate() {
                let target = match *symbol {
                    Symbol::NonTerminal(nonterminal) => nonterminal,
                    Symbol::Terminal(_) => continue,
                };

                let rest = self.first_of(&body[index + 1..]);
                let mut gained = rest.terminals;

                if rest.nullable {
                    if let Some(inherited) = self.follow.get(&production.head()) {
                        gained.extend(inherited.iter().copied());
                    }
                }

                let follow = self.follow.entry(target).or_default();
                for terminal in gained {
                    changed |= follow.insert(terminal);
                }
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Reduction;
    use NonTerminal as N;
    use Terminal as T;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn first(analysis: &Analysis, nonterminal: NonTerminal) -> (Vec<Terminal>, bool) {
        let set = analysis.first(nonterminal).unwrap();
        (set.terminals.iter().copied().collect(), set.nullable)
    }

    fn follow(analysis: &Analysis, nonterminal: NonTerminal) -> Vec<Terminal> {
        analysis
            .follow(nonterminal)
            .unwrap()
            .iter()
            .copied()
            .collect()
    }

    #[test]
    fn first_sets_of_builtin_grammar() {
        init_logger();
        let analysis = Analysis::compute(&Grammar::grades());

        assert_eq!(first(&analysis, N::Program), (vec![T::If], false));
        assert_eq!(first(&analysis, N::StatementTail), (vec![T::If], true));
        assert_eq!(first(&analysis, N::OptionalElse), (vec![T::Else], true));
        assert_eq!(first(&analysis, N::Condition), (vec![T::Identifier], false));
        assert_eq!(
            first(&analysis, N::Comparison),
            (vec![T::GreaterOrEqual, T::LessOrEqual], false)
        );
        assert_eq!(first(&analysis, N::Value), (vec![T::Letter], false));
    }

    #[test]
    fn follow_sets_of_builtin_grammar() {
        init_logger();
        let analysis = Analysis::compute(&Grammar::grades());

        assert_eq!(follow(&analysis, N::Program), vec![T::End]);
        assert_eq!(follow(&analysis, N::StatementTail), vec![T::End]);
        assert_eq!(follow(&analysis, N::Statement), vec![T::If, T::End]);
        assert_eq!(follow(&analysis, N::OptionalElse), vec![T::If, T::End]);
        assert_eq!(follow(&analysis, N::Condition), vec![T::Then]);
        assert_eq!(follow(&analysis, N::Comparison), vec![T::Number]);
        assert_eq!(
            follow(&analysis, N::Assignment),
            vec![T::If, T::Else, T::End]
        );
        assert_eq!(follow(&analysis, N::Value), vec![T::If, T::Else, T::End]);
    }

    #[test]
    fn fixed_point_is_idempotent() {
        let grammar = Grammar::grades();
        let mut analysis = Analysis::compute(&grammar);
        let closed = analysis.clone();

        assert!(!analysis.refine(&grammar));
        assert_eq!(analysis, closed);
    }

    #[test]
    fn first_of_sequences() {
        let analysis = Analysis::compute(&Grammar::grades());

        let empty = analysis.first_of(&[]);
        assert!(empty.nullable);
        assert!(empty.terminals.is_empty());

        let tail_then_else = analysis.first_of(&[
            Symbol::NonTerminal(N::StatementTail),
            Symbol::NonTerminal(N::OptionalElse),
        ]);
        assert!(tail_then_else.nullable);
        assert!(tail_then_else.contains(T::If) && tail_then_else.contains(T::Else));

        let terminal_first = analysis.first_of(&[
            Symbol::NonTerminal(N::OptionalElse),
            Symbol::Terminal(T::Then),
        ]);
        assert!(!terminal_first.nullable);
        assert_eq!(
            terminal_first.terminals,
            BTreeSet::from([T::Else, T::Then])
        );
    }

    #[test]
    fn unreachable_nonterminals_are_flagged_but_analyzed() {
        init_logger();
        let rules = vec![
            (N::Value, vec![Symbol::Terminal(T::Letter)], Reduction::Value),
            (
                N::Comparison,
                vec![Symbol::Terminal(T::GreaterOrEqual)],
                Reduction::Comparison,
            ),
        ];

        let grammar = Grammar::new(N::Value, rules).unwrap();
        let analysis = Analysis::compute(&grammar);

        assert_eq!(analysis.unreachable(), &BTreeSet::from([N::Comparison]));
        assert_eq!(first(&analysis, N::Comparison), (vec![T::GreaterOrEqual], false));
        assert!(follow(&analysis, N::Comparison).is_empty());
    }

    #[test]
    fn first_set_display_marks_epsilon() {
        let analysis = Analysis::compute(&Grammar::grades());
        assert_eq!(
            analysis.first(N::OptionalElse).unwrap().to_string(),
            "{ else, ε }"
        );
    }
}
