//! # Introduction
//!
//! Quill is the front end of a compiler for a small statically typed
//! language. It scans and parses source text into an arena-backed syntax
//! tree, keeps going past malformed input, and resolves every name and
//! type in the result, including overloaded function calls.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Scanner → Parser → AST → Type resolution → Resolver → Diagnostics
//! ```
//!
//! 1. [`parser`]: scans the source (with lookahead and speculative
//!    scanning) and builds the AST, entering declarations into scopes and
//!    registering every written type as a pending type.
//! 2. [`symbols`]: the scope tree and the interning type table, including
//!    resolution of pending types and the coercion rules.
//! 3. [`resolver`]: binds names, selects overloads and checks types.
//! 4. [`diagnostics`]: the lexical, syntax and semantic error records.
//! 5. [`session`]: runs the pipeline and owns everything it produces.
//!
//! ## Language overview
//!
//! Declarations: `var x i32 = 1;`, `struct P { x i32; }`,
//! `fn f(a i32, b i32 = 0) -> (i32, bool) { ... }`.
//! Types: built-in numbers, `bool`, `string`, structs, pointers (`^T`),
//! arrays (`[4]T`, `[]T`) and function types (`fn(i32) -> bool`).
//! Control flow: `if`/`else`, `while`, `return`, `break`, `continue`.

pub mod diagnostics;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod symbols;

pub use diagnostics::{CompileError, Diagnostic, DiagnosticKind, Diagnostics};
pub use session::{CoercionPolicy, Options, Session};
