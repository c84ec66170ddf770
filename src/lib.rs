//! Compilador LL(1) para reglas de asignación de calificaciones.
//!
//! # Gramática
//! La gramática se describe como datos en [`grammar`]. A partir de ella
//! se calculan los conjuntos FIRST y FOLLOW en [`analysis`], y con estos
//! la tabla de análisis sintáctico en [`table`]. Una gramática que no es
//! LL(1) se rechaza en este punto, antes de analizar cualquier entrada.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente. Este texto se somete
//! primero a análisis léxico en [`lex`], de lo cual se obtiene un flujo
//! de tokens. El flujo de tokens se consume por la máquina de pila de
//! [`parse`], guiada únicamente por la tabla, la cual construye el AST
//! descrito en [`ast`] a medida que reconoce cada producción.
//!
//! # Back end
//! El AST se traduce a Python en [`codegen`] por medio de plantillas
//! fijas. [`compile`] orquesta todas las fases y [`report`] presenta los
//! resultados intermedios.

#[macro_use]
mod macros;

pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod compile;
pub mod error;
pub mod grammar;
pub mod lex;
pub mod parse;
pub mod report;
pub mod source;
pub mod table;
