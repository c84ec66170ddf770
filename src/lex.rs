//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens, cada una con un terminal de
//! la gramática como clase. Los espacios en blanco se descartan. Cada
//! token emitido está asociado a una ubicación en el código fuente
//! original, lo cual permite rastrear errores de fases posteriores.
//!
//! # Reglas del lenguaje
//! - Las palabras son secuencias de letras, incluyendo letras fuera de
//!   ASCII como `puntuación`.
//! - Las palabras clave (`if`, `then`, `else`, `is`) son case-insensitive,
//!   por lo cual tanto `then` como `THEN` y `Then` resultan en
//!   [`Terminal::Then`].
//! - Una única letra mayúscula (`A`, `Ñ`) es un [`Terminal::Letter`]; cualquier
//!   otra palabra es un identificador.
//! - Los números son secuencias de dígitos decimales. Su rango se
//!   verifica al construir el AST, no aquí.
//!
//! # Errores
//! El primer carácter fuera del alfabeto detiene el análisis. No se
//! emiten tokens posteriores a un error.

use std::{
    fmt::{self, Display},
    mem,
};

use thiserror::Error;

use crate::{
    grammar::Terminal,
    source::{self, Located, Position, Positioned, Span},
};

// Case-insensitive
pub use unicase::Ascii as NoCase;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexicalError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?} to complete a comparison operator")]
    Expected(char),
}

/// Objeto resultante del análisis léxico.
///
/// Un token es inmutable una vez construido. La clase del token es
/// directamente un terminal de la gramática.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: Terminal,
    lexeme: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: Terminal, lexeme: S) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
        }
    }

    /// Token de fin de entrada.
    pub fn end() -> Self {
        Token::new(Terminal::End, "")
    }

    pub fn kind(&self) -> Terminal {
        self.kind
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Terminal::*;

        match self.kind {
            Identifier => write!(fmt, "identifier `{}`", self.lexeme),
            Number => write!(fmt, "number `{}`", self.lexeme),
            Letter => write!(fmt, "letter `{}`", self.lexeme),
            End => fmt.write_str("end of input"),
            keyword => write!(fmt, "`{}`", keyword),
        }
    }
}

/// Busca una palabra clave, sin distinguir mayúsculas.
fn keyword(word: &str) -> Option<Terminal> {
    const KEYWORDS: &[(NoCase<&str>, Terminal)] = &[
        (NoCase::new("if"),   Terminal::If),
        (NoCase::new("then"), Terminal::Then),
        (NoCase::new("else"), Terminal::Else),
        (NoCase::new("is"),   Terminal::Is),
    ];

    KEYWORDS
        .iter()
        .find(|&&(name, _)| name == NoCase::new(word))
        .map(|&(_, keyword)| keyword)
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<'a> {
    source: Positioned<'a>,
    state: State,
    start: Position,
    finished: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido
    /// y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `>` o `<`; debe seguir `=`.
    Angle(Terminal),

    /// Constante entera, dígito por dígito.
    Number(String),

    /// Término que puede ser un identificador, letra o palabra clave.
    Word(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir de un texto.
    pub fn new(text: &'a str) -> Self {
        Lexer {
            source: source::consume(text),
            state: State::Start,
            start: Position::default(),
            finished: false,
        }
    }

    /// Reduce la entrada a una secuencia de tokens terminada en `$`,
    /// o al primer error léxico.
    pub fn tokenize(self) -> Result<Vec<Located<Token>>, Located<LexicalError>> {
        self.collect()
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexicalError> {
        use State::*;

        loop {
            let next_char = self.source.peek();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.source.next_position();
            }

            match (&mut self.state, next_char) {
                (Start, None) => return Ok(None),

                (Start, Some('>')) => self.state = Angle(Terminal::GreaterOrEqual),
                (Start, Some('<')) => self.state = Angle(Terminal::LessOrEqual),

                (Start, Some(c)) if c.is_alphabetic() => self.state = Word(c.to_string()),
                (Start, Some(c)) if c.is_ascii_digit() => self.state = Number(c.to_string()),

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => return Err(LexicalError::BadChar(c)),

                // Emisión retardada
                (Complete(token), _) => return Ok(Some(mem::replace(token, Token::end()))),

                (Angle(kind), Some('=')) => {
                    let kind = *kind;
                    self.state = Complete(Token::new(kind, kind.to_string()));
                }

                (Angle(_), _) => return Err(LexicalError::Expected('=')),

                (Number(digits), Some(digit)) if digit.is_ascii_digit() => digits.push(digit),
                (Number(digits), _) => {
                    return Ok(Some(Token::new(Terminal::Number, mem::take(digits))));
                }

                (Word(word), Some(c)) if c.is_alphabetic() => word.push(c),
                (Word(word), _) => return Ok(Some(classify(mem::take(word)))),
            }

            // Si no hubo retorno, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            self.source.next();
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexicalError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.lex() {
            Ok(Some(token)) => {
                self.state = State::Start;

                let span = Span::new(self.start, self.source.next_position());
                Some(Ok(Located::at(token, span)))
            }

            Ok(None) => {
                self.finished = true;

                let span = Span::single(self.source.next_position());
                Some(Ok(Located::at(Token::end(), span)))
            }

            Err(error) => {
                self.finished = true;
                Some(Err(Located::at(error, Span::single(self.start))))
            }
        }
    }
}

/// Distingue palabras clave, letras e identificadores.
fn classify(word: String) -> Token {
    if let Some(keyword) = keyword(&word) {
        return Token::new(keyword, word);
    }

    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_uppercase() => Token::new(Terminal::Letter, word),
        _ => Token::new(Terminal::Identifier, word),
    }
}
