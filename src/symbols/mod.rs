//! Symbol and type tables
//!
//! - [`scope`]: The scope tree and per-scope symbol lists
//! - [`types`]: Interned types, pending types and coercion rules
//!
//! Both tables are filled while parsing and consulted by the resolver.

pub mod scope;
pub mod types;

pub use scope::{ScopeId, ScopeKind, ScopeTable, Symbol, SymbolFilter};
pub use types::{CoercionRules, NumericWidening, Strict, TypeId, TypeTable};
