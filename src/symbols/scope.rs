//! Lexical scopes and their symbol bindings
//!
//! Scopes form a tree through parent links and are addressed by
//! [`ScopeId`]. The built-in scope is the root; the global scope is its
//! only direct child. Each scope maps a name to the ordered list of
//! bindings declared under it, so overloaded functions simply share one
//! list. Definitions never check for collisions: the resolver runs
//! [`ScopeTable::audit_duplicates`] once per scope instead.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::parser::ast::NodeId;
use crate::symbols::types::TypeId;

/// Numeric id of a scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const BUILTIN: ScopeId = ScopeId(0);
    pub const GLOBAL: ScopeId = ScopeId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    BuiltIn,
    Global,
    Struct,
    CodeBlock,
}

/// What a name is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Variable, parameter or struct member declaration
    Var(NodeId),
    /// Function definition
    Func(NodeId),
    /// Struct definition
    Struct(NodeId),
    BuiltInType(TypeId),
}

impl Symbol {
    pub fn filter(&self) -> SymbolFilter {
        match self {
            Symbol::Var(_) => SymbolFilter::VAR,
            Symbol::Func(_) => SymbolFilter::FUNC,
            Symbol::Struct(_) | Symbol::BuiltInType(_) => SymbolFilter::TYPE,
        }
    }

    /// Declaration node, if the symbol was declared in source.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Symbol::Var(node) | Symbol::Func(node) | Symbol::Struct(node) => Some(*node),
            Symbol::BuiltInType(_) => None,
        }
    }
}

bitflags::bitflags! {
    /// Set of symbol kinds accepted by a lookup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFilter: u8 {
        const VAR = 1 << 0;
        const FUNC = 1 << 1;
        const TYPE = 1 << 2;
    }
}

impl SymbolFilter {
    pub fn accepts(self, symbol: &Symbol) -> bool {
        self.intersects(symbol.filter())
    }
}

type SymbolMap<'src> = IndexMap<&'src str, SmallVec<[Symbol; 1]>, FxBuildHasher>;

#[derive(Debug)]
pub struct Scope<'src> {
    pub kind: ScopeKind,
    /// `None` only for the built-in root.
    pub parent: Option<ScopeId>,
    symbols: SymbolMap<'src>,
}

impl<'src> Scope<'src> {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            symbols: IndexMap::default(),
        }
    }

    /// Bindings for `name` declared directly in this scope.
    pub fn bindings(&self, name: &str) -> &[Symbol] {
        self.symbols.get(name).map_or(&[], |list| list.as_slice())
    }

    pub fn len(&self) -> usize {
        self.symbols.values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// A binding removed by the duplicate audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate<'src> {
    pub name: &'src str,
    /// The first binding, which stays in the scope.
    pub kept: Symbol,
    pub removed: Symbol,
    /// Shared signature of duplicate functions.
    pub signature: Option<TypeId>,
}

#[derive(Debug)]
pub struct ScopeTable<'src> {
    scopes: Vec<Scope<'src>>,
}

impl<'src> ScopeTable<'src> {
    /// Create the table with the built-in and global scopes in place.
    pub fn new() -> Self {
        Self {
            scopes: vec![
                Scope::new(ScopeKind::BuiltIn, None),
                Scope::new(ScopeKind::Global, Some(ScopeId::BUILTIN)),
            ],
        }
    }

    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, Some(parent)));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope<'src> {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// Append a binding. Collisions are left for the audit.
    pub fn define(&mut self, scope: ScopeId, name: &'src str, symbol: Symbol) {
        self.scopes[scope.index()]
            .symbols
            .entry(name)
            .or_default()
            .push(symbol);
    }

    /// Every binding of `name` accepted by `filter`, from `scope` outward
    /// (inner to outer), each paired with its declaring scope.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        filter: SymbolFilter,
        include_parents: bool,
    ) -> SmallVec<[(ScopeId, Symbol); 4]> {
        let mut found = SmallVec::new();
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.get(id);
            found.extend(
                scope
                    .bindings(name)
                    .iter()
                    .filter(|symbol| filter.accepts(symbol))
                    .map(|symbol| (id, *symbol)),
            );
            if !include_parents {
                break;
            }
            current = scope.parent;
        }

        found
    }

    /// Innermost binding of `name` accepted by `filter`.
    pub fn lookup_first(
        &self,
        scope: ScopeId,
        name: &str,
        filter: SymbolFilter,
        include_parents: bool,
    ) -> Option<(ScopeId, Symbol)> {
        self.lookup(scope, name, filter, include_parents)
            .first()
            .copied()
    }

    /// Find and remove duplicate bindings in one scope.
    ///
    /// Duplicates are counted per kind: a second variable or a second
    /// struct under one name is a duplicate, and so is a second function
    /// whose signature equals an earlier one. Functions with an unknown
    /// signature are never considered duplicates. The first binding is
    /// kept; later ones are removed and returned.
    pub fn audit_duplicates<F>(&mut self, scope: ScopeId, signature_of: F) -> Vec<Duplicate<'src>>
    where
        F: Fn(NodeId) -> Option<TypeId>,
    {
        let mut duplicates = Vec::new();

        for (&name, list) in self.scopes[scope.index()].symbols.iter_mut() {
            if list.len() < 2 {
                continue;
            }

            let mut first_var = None;
            let mut first_struct = None;
            let mut signatures: SmallVec<[(TypeId, Symbol); 4]> = SmallVec::new();

            list.retain(|symbol| {
                let (first, signature) = match *symbol {
                    Symbol::Var(_) => (&mut first_var, None),
                    Symbol::Struct(_) => (&mut first_struct, None),
                    Symbol::Func(node) => {
                        let Some(signature) = signature_of(node) else {
                            return true;
                        };
                        match signatures.iter().find(|(seen, _)| *seen == signature) {
                            Some((_, kept)) => {
                                duplicates.push(Duplicate {
                                    name,
                                    kept: *kept,
                                    removed: *symbol,
                                    signature: Some(signature),
                                });
                                return false;
                            }
                            None => {
                                signatures.push((signature, *symbol));
                                return true;
                            }
                        }
                    }
                    Symbol::BuiltInType(_) => return true,
                };

                match first {
                    Some(kept) => {
                        duplicates.push(Duplicate {
                            name,
                            kept: *kept,
                            removed: *symbol,
                            signature,
                        });
                        false
                    }
                    None => {
                        *first = Some(*symbol);
                        true
                    }
                }
            });
        }

        duplicates
    }
}

impl Default for ScopeTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use la_arena::{Idx, RawIdx};

    fn node(n: u32) -> NodeId {
        Idx::from_raw(RawIdx::from(n))
    }

    #[test]
    fn test_lookup_walks_parents_inner_to_outer() {
        let mut table = ScopeTable::new();
        let block = table.push(ScopeKind::CodeBlock, ScopeId::GLOBAL);
        table.define(ScopeId::GLOBAL, "f", Symbol::Func(node(1)));
        table.define(block, "f", Symbol::Func(node(2)));
        table.define(block, "x", Symbol::Var(node(3)));

        let found = table.lookup(block, "f", SymbolFilter::FUNC, true);
        assert_eq!(
            found.as_slice(),
            &[
                (block, Symbol::Func(node(2))),
                (ScopeId::GLOBAL, Symbol::Func(node(1)))
            ]
        );

        let local_only = table.lookup(block, "f", SymbolFilter::FUNC, false);
        assert_eq!(local_only.len(), 1);

        assert!(table.lookup(block, "x", SymbolFilter::FUNC, true).is_empty());
        assert!(table.lookup(ScopeId::GLOBAL, "x", SymbolFilter::VAR, true).is_empty());
    }

    #[test]
    fn test_audit_counts_each_kind_independently() {
        let mut table = ScopeTable::new();
        let g = ScopeId::GLOBAL;
        table.define(g, "a", Symbol::Var(node(1)));
        table.define(g, "a", Symbol::Struct(node(2)));
        table.define(g, "a", Symbol::Var(node(3)));
        table.define(g, "a", Symbol::Struct(node(4)));

        let duplicates = table.audit_duplicates(g, |_| None);
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].removed, Symbol::Var(node(3)));
        assert_eq!(duplicates[0].kept, Symbol::Var(node(1)));
        assert_eq!(duplicates[1].removed, Symbol::Struct(node(4)));
        assert_eq!(
            table.get(g).bindings("a"),
            &[Symbol::Var(node(1)), Symbol::Struct(node(2))]
        );
    }

    #[test]
    fn test_audit_keeps_overloads_with_distinct_signatures() {
        let mut table = ScopeTable::new();
        let g = ScopeId::GLOBAL;
        table.define(g, "f", Symbol::Func(node(1)));
        table.define(g, "f", Symbol::Func(node(2)));
        table.define(g, "f", Symbol::Func(node(3)));

        let signature = |n: NodeId| match u32::from(n.into_raw()) {
            1 | 3 => Some(TypeId::I32),
            _ => Some(TypeId::I64),
        };
        let duplicates = table.audit_duplicates(g, signature);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].removed, Symbol::Func(node(3)));
        assert_eq!(table.get(g).bindings("f").len(), 2);

        // a second audit finds nothing left to remove
        assert!(table.audit_duplicates(g, signature).is_empty());
    }
}
