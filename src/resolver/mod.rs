//! Name and type resolution
//!
//! This module binds every name in a parsed program to its declaration and
//! checks types:
//! - [`engine`]: The [`Resolver`] and its shared helpers
//! - [`overload`]: Exact and loose overload selection
//! - `expressions`: Literals, operators, names, members and calls
//! - `statements`: Declarations, control flow and assignments
//!
//! # Resolution Model
//!
//! Pending types are resolved before this pass runs, so every declaration
//! already carries its type in a slot. The resolver walks the tree once,
//! records the type of each expression in the tree's side table and
//! collects diagnostics without stopping. Only an
//! [`InternalError`](crate::diagnostics::InternalError) ends the walk early.

pub mod engine;
pub mod overload;

mod expressions;
mod statements;

pub use engine::{Resolution, Resolver};
pub use overload::{select_overload, ArgType, Candidate, Selection};
