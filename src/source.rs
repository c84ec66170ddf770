//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error.

use std::{
    fmt::{self, Debug, Display, Formatter},
    str::Chars,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    span: Span,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Span, T) {
        (self.span, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, span: Span) -> Self {
        Located { value, span }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            span: self.span,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Un rango de posiciones, `end` excluido.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    start: Position,
    end: Position,
}

impl Span {
    /// Construye un rango entre dos posiciones.
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Rango de un único carácter.
    pub fn single(at: Position) -> Self {
        Span {
            start: at,
            end: at.advance(),
        }
    }

    /// Unifica un rango de ubicaciones.
    pub fn to(self, other: Span) -> Self {
        Span {
            start: self.start,
            end: other.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.end
    }
}

impl Display for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let Span { start, end } = *self;
        if end == start.advance() || end == start || end.line() != start.line() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "{}:[{}-{}]", start.line, start.column, end.column - 1)
        }
    }
}

impl Debug for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Construye una posición arbitraria, ambos componentes desde 1.
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Itera sobre los caracteres de un texto fuente junto a su posición.
///
/// Cada carácter emitido incluye a la posición donde inicia. La posición
/// siguiente al último carácter se obtiene con [`Positioned::next_position`].
pub fn consume(text: &str) -> Positioned<'_> {
    Positioned {
        chars: text.chars(),
        next: Position::default(),
    }
}

/// Un flujo de entrada, carácter por carácter, con la posición de cada uno.
#[derive(Clone)]
pub struct Positioned<'a> {
    chars: Chars<'a>,
    next: Position,
}

impl Positioned<'_> {
    /// Posición que le corresponderá al siguiente carácter.
    pub fn next_position(&self) -> Position {
        self.next
    }

    /// Observa el siguiente carácter sin consumirlo.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }
}

impl Iterator for Positioned<'_> {
    type Item = (char, Position);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        let here = self.next;

        self.next = match c {
            '\n' => here.newline(),
            '\t' => here.tab(),
            _ => here.advance(),
        };

        Some((c, here))
    }
}
