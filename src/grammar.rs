//! Modelo de la gramática.
//!
//! # Alfabeto
//! Tanto los terminales ([`Terminal`]) como los no terminales
//! ([`NonTerminal`]) forman alfabetos cerrados y conocidos de antemano,
//! por lo cual se representan como enumeraciones y no como cadenas.
//! Una [`Grammar`] es únicamente una lista ordenada de producciones
//! sobre esos alfabetos junto a un símbolo inicial.
//!
//! # Producciones
//! Cada producción lleva un identificador entero estable, asignado en
//! orden de declaración a partir de 1, el cual se utiliza para mostrar
//! tablas y trazas. Además, cada producción lleva una [`Reduction`] que
//! indica cómo se sintetiza un nodo del AST cuando la producción termina
//! de reconocerse.
//!
//! # Gramática del lenguaje
//! ```text
//! 1.  <Program>         → <StatementList>
//! 2.  <StatementList>   → <Statement> <StatementList'>
//! 3.  <StatementList'>  → <Statement> <StatementList'>
//! 4.  <StatementList'>  → ε
//! 5.  <Statement>       → <IfStatement> <OptionalElse>
//! 6.  <IfStatement>     → if <Condition> then <Assignment>
//! 7.  <OptionalElse>    → else <Assignment>
//! 8.  <OptionalElse>    → ε
//! 9.  <Condition>       → IDENTIFIER <Comparison> NUMBER
//! 10. <Comparison>      → >=
//! 11. <Comparison>      → <=
//! 12. <Assignment>      → IDENTIFIER is <Value>
//! 13. <Value>           → LETTER
//! ```

use std::{
    collections::{BTreeSet, VecDeque},
    fmt::{self, Display},
};

use thiserror::Error;

/// Un símbolo terminal.
///
/// El orden de declaración es también el orden de las columnas de la
/// tabla de análisis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terminal {
    If,
    Then,
    Else,
    Is,
    GreaterOrEqual,
    LessOrEqual,
    Identifier,
    Number,
    Letter,

    /// Marcador de fin de entrada, `$`.
    End,
}

impl Terminal {
    /// Todos los terminales, en orden.
    pub const ALL: [Terminal; 10] = [
        Terminal::If,
        Terminal::Then,
        Terminal::Else,
        Terminal::Is,
        Terminal::GreaterOrEqual,
        Terminal::LessOrEqual,
        Terminal::Identifier,
        Terminal::Number,
        Terminal::Letter,
        Terminal::End,
    ];

    /// Determina si el lexema de este terminal es relevante para el AST.
    ///
    /// Las palabras clave y el fin de entrada no aportan información
    /// más allá de su presencia.
    pub fn is_semantic(self) -> bool {
        use Terminal::*;
        matches!(
            self,
            GreaterOrEqual | LessOrEqual | Identifier | Number | Letter
        )
    }
}

impl Display for Terminal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Terminal::*;
        let string = match self {
            If             => "if",
            Then           => "then",
            Else           => "else",
            Is             => "is",
            GreaterOrEqual => ">=",
            LessOrEqual    => "<=",
            Identifier     => "IDENTIFIER",
            Number         => "NUMBER",
            Letter         => "LETTER",
            End            => "$",
        };

        fmt.write_str(string)
    }
}

/// Un símbolo no terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NonTerminal {
    Program,
    StatementList,
    StatementTail,
    Statement,
    IfStatement,
    OptionalElse,
    Condition,
    Comparison,
    Assignment,
    Value,
}

impl NonTerminal {
    /// Todos los no terminales, en orden.
    pub const ALL: [NonTerminal; 10] = [
        NonTerminal::Program,
        NonTerminal::StatementList,
        NonTerminal::StatementTail,
        NonTerminal::Statement,
        NonTerminal::IfStatement,
        NonTerminal::OptionalElse,
        NonTerminal::Condition,
        NonTerminal::Comparison,
        NonTerminal::Assignment,
        NonTerminal::Value,
    ];
}

impl Display for NonTerminal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NonTerminal::*;
        let string = match self {
            Program       => "<Program>",
            StatementList => "<StatementList>",
            StatementTail => "<StatementList'>",
            Statement     => "<Statement>",
            IfStatement   => "<IfStatement>",
            OptionalElse  => "<OptionalElse>",
            Condition     => "<Condition>",
            Comparison    => "<Comparison>",
            Assignment    => "<Assignment>",
            Value         => "<Value>",
        };

        fmt.write_str(string)
    }
}

/// Un símbolo gramatical.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl From<Terminal> for Symbol {
    fn from(terminal: Terminal) -> Self {
        Symbol::Terminal(terminal)
    }
}

impl From<NonTerminal> for Symbol {
    fn from(nonterminal: NonTerminal) -> Self {
        Symbol::NonTerminal(nonterminal)
    }
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(terminal) => terminal.fmt(fmt),
            Symbol::NonTerminal(nonterminal) => nonterminal.fmt(fmt),
        }
    }
}

/// Identificador estable de una producción.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub u32);

impl Display for ProductionId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// Regla de construcción del AST asociada a una producción.
///
/// Cuando el analizador sintáctico termina de consumir todos los
/// símbolos de una producción, los fragmentos acumulados por ella
/// se pliegan según esta regla. Ver [`crate::ast`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Envuelve la lista de sentencias en la raíz.
    Program,

    /// Antepone una sentencia a la lista que le sigue.
    Prepend,

    /// Lista vacía.
    Empty,

    /// Une una rama `if` con su `else` opcional.
    Statement,

    /// Condición y asignación de una rama `if`.
    Branch,

    /// Asignación alternativa.
    Else,

    /// Ausencia de `else`.
    NoElse,

    /// Identificador, comparación y número.
    Condition,

    /// Operador de comparación.
    Comparison,

    /// Identificador y valor.
    Assignment,

    /// Letra literal.
    Value,
}

/// Una producción `head → body`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Production {
    id: ProductionId,
    head: NonTerminal,
    body: Vec<Symbol>,
    reduction: Reduction,
}

impl Production {
    pub fn id(&self) -> ProductionId {
        self.id
    }

    pub fn head(&self) -> NonTerminal {
        self.head
    }

    /// Cuerpo de la producción; vacío si deriva ε.
    pub fn body(&self) -> &[Symbol] {
        &self.body
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn is_epsilon(&self) -> bool {
        self.body.is_empty()
    }
}

impl Display for Production {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} →", self.head)?;
        if self.body.is_empty() {
            return fmt.write_str(" ε");
        }

        for symbol in &self.body {
            write!(fmt, " {}", symbol)?;
        }

        Ok(())
    }
}

/// Error de construcción de una gramática.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GrammarError {
    /// Un no terminal aparece en un cuerpo pero no tiene producciones.
    #[error("Non-terminal {symbol} used by production {production} has no productions")]
    Dangling {
        symbol: NonTerminal,
        production: ProductionId,
    },

    /// El símbolo inicial no tiene producciones.
    #[error("Start symbol {0} has no productions")]
    NoStart(NonTerminal),
}

/// Una gramática libre de contexto sobre el alfabeto del lenguaje.
///
/// Es inmutable una vez construida.
#[derive(Clone, Debug)]
pub struct Grammar {
    start: NonTerminal,
    productions: Vec<Production>,
}

impl Grammar {
    /// Construye una gramática a partir de producciones en orden.
    ///
    /// Los identificadores se asignan en el orden dado, desde 1. Falla
    /// si algún no terminal referido no tiene producciones propias.
    pub fn new<I>(start: NonTerminal, rules: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (NonTerminal, Vec<Symbol>, Reduction)>,
    {
        let productions: Vec<_> = rules
            .into_iter()
            .enumerate()
            .map(|(index, (head, body, reduction))| Production {
                id: ProductionId(index as u32 + 1),
                head,
                body,
                reduction,
            })
            .collect();

        let heads: BTreeSet<_> = productions.iter().map(Production::head).collect();
        if !heads.contains(&start) {
            return Err(GrammarError::NoStart(start));
        }

        for production in &productions {
            for symbol in production.body() {
                if let Symbol::NonTerminal(symbol) = *symbol {
                    if !heads.contains(&symbol) {
                        return Err(GrammarError::Dangling {
                            symbol,
                            production: production.id(),
                        });
                    }
                }
            }
        }

        Ok(Grammar { start, productions })
    }

    /// La gramática fija del lenguaje de asignación de notas.
    pub fn grades() -> Self {
        use {NonTerminal as N, Reduction as R, Terminal as T};

        let t = Symbol::Terminal;
        let n = Symbol::NonTerminal;

        let rules = vec![
            (N::Program, vec![n(N::StatementList)], R::Program),
            (N::StatementList, vec![n(N::Statement), n(N::StatementTail)], R::Prepend),
            (N::StatementTail, vec![n(N::Statement), n(N::StatementTail)], R::Prepend),
            (N::StatementTail, vec![], R::Empty),
            (N::Statement, vec![n(N::IfStatement), n(N::OptionalElse)], R::Statement),
            (
                N::IfStatement,
                vec![t(T::If), n(N::Condition), t(T::Then), n(N::Assignment)],
                R::Branch,
            ),
            (N::OptionalElse, vec![t(T::Else), n(N::Assignment)], R::Else),
            (N::OptionalElse, vec![], R::NoElse),
            (
                N::Condition,
                vec![t(T::Identifier), n(N::Comparison), t(T::Number)],
                R::Condition,
            ),
            (N::Comparison, vec![t(T::GreaterOrEqual)], R::Comparison),
            (N::Comparison, vec![t(T::LessOrEqual)], R::Comparison),
            (N::Assignment, vec![t(T::Identifier), t(T::Is), n(N::Value)], R::Assignment),
            (N::Value, vec![t(T::Letter)], R::Value),
        ];

        match Grammar::new(N::Program, rules) {
            Ok(grammar) => grammar,
            Err(error) => unreachable!("built-in grammar is malformed: {}", error),
        }
    }

    /// Obtiene el símbolo inicial.
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    /// Todas las producciones, en orden de identificador.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Busca una producción por identificador.
    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.productions.get(index)
    }

    /// Producciones cuya cabeza es `head`.
    pub fn productions_of(&self, head: NonTerminal) -> impl Iterator<Item = &Production> {
        self.productions
            .iter()
            .filter(move |production| production.head() == head)
    }

    /// No terminales que son cabeza de al menos una producción.
    pub fn nonterminals(&self) -> BTreeSet<NonTerminal> {
        self.productions.iter().map(Production::head).collect()
    }

    /// No terminales que no pueden alcanzarse desde el símbolo inicial.
    pub fn unreachable(&self) -> BTreeSet<NonTerminal> {
        let mut reached = BTreeSet::new();
        let mut pending = VecDeque::from([self.start]);

        while let Some(head) = pending.pop_front() {
            if !reached.insert(head) {
                continue;
            }

            for production in self.productions_of(head) {
                for symbol in production.body() {
                    if let Symbol::NonTerminal(next) = *symbol {
                        pending.push_back(next);
                    }
                }
            }
        }

        self.nonterminals().difference(&reached).copied().collect()
    }
}
