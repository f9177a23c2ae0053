//! Compilador para MiniScript.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente.
//! Este archivo se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. El flujo de tokens se
//! dispone en un AST por medio de análisis sintáctico en [`parse`].
//! El árbol sintáctico es procesado por análisis semántico en
//! [`semantic`], que resuelve nombres contra una tabla de símbolos
//! con scopes anidados y anota cada expresión con su tipo.
//!
//! # Representación intermedia
//! Un árbol validado se aplana en [`lower`] a una secuencia lineal
//! de código de tres direcciones, descrita en [`ir`]. El listado
//! resultante es el producto final de este compilador: las fases de
//! generación de código máquina quedan fuera de su alcance.
//!
//! Cada fase consume por completo la salida de la anterior y acumula
//! sus errores en vez de abortar con el primero; la tubería no avanza
//! a la siguiente fase mientras haya errores pendientes, los cuales se
//! presentan con [`error::Diagnostics`].

pub mod error;
pub mod ir;
pub mod lex;
pub mod lower;
pub mod parse;
pub mod semantic;
pub mod source;
