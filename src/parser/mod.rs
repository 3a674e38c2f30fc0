//! Quill source code parser
//!
//! This module transforms Quill source text into an arena-backed syntax tree:
//! - [`token`]: Token kinds, spans and lexical error flags
//! - [`lexer`]: Scanning (source text → tokens), lookahead and speculation
//! - [`parse`]: The [`Parser`] and its error recovery
//! - [`ast`]: AST node definitions and storage
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary
//! operators. Declarations are entered into the scope table while parsing
//! and every written type is registered as a pending type, so the tree is
//! ready for resolution as soon as parsing ends. Malformed input produces
//! error nodes rather than failing the parse.

pub mod ast;
pub mod lexer;
pub mod parse;
pub mod token;

mod declarations;
mod expressions;
mod statements;

pub use parse::Parser;
