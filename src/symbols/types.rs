//! Canonical type store with two-phase (pending) resolution
//!
//! While parsing, every written type is registered as a *pending* type: a
//! description (base name or function signature, plus modifiers) that
//! names things which may not be declared yet. AST fields that need the
//! final type hold a [`TypeSlotId`] instead of a [`TypeId`]; the slot is
//! registered against the pending type with
//! [`TypeTable::set_update_on_resolve`] and receives the final id when
//! [`TypeTable::resolve_all`] runs after parsing.
//!
//! Concrete types are interned: structurally equal types share one id.
//! Built-in types occupy fixed sentinel ids at the start of the table.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::diagnostics::{Diagnostic, Diagnostics, SemanticError};
use crate::parser::ast::{Ast, Node, NodeId};
use crate::parser::token::{LiteralValue, Span};
use crate::symbols::scope::{ScopeId, ScopeTable, Symbol, SymbolFilter};

/// Interned type id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const I8: TypeId = TypeId(0);
    pub const I16: TypeId = TypeId(1);
    pub const I32: TypeId = TypeId(2);
    pub const I64: TypeId = TypeId(3);
    pub const U8: TypeId = TypeId(4);
    pub const U16: TypeId = TypeId(5);
    pub const U32: TypeId = TypeId(6);
    pub const U64: TypeId = TypeId(7);
    pub const F32: TypeId = TypeId(8);
    pub const F64: TypeId = TypeId(9);
    pub const BOOL: TypeId = TypeId(10);
    pub const STRING: TypeId = TypeId(11);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_integer(self) -> bool {
        self.0 <= TypeId::U64.0
    }

    pub fn is_signed(self) -> bool {
        self.0 <= TypeId::I64.0
    }

    pub fn is_unsigned(self) -> bool {
        (TypeId::U8.0..=TypeId::U64.0).contains(&self.0)
    }

    pub fn is_float(self) -> bool {
        (TypeId::F32.0..=TypeId::F64.0).contains(&self.0)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Bit width of a built-in numeric type.
    pub fn width(self) -> Option<u32> {
        match self {
            TypeId::I8 | TypeId::U8 => Some(8),
            TypeId::I16 | TypeId::U16 => Some(16),
            TypeId::I32 | TypeId::U32 | TypeId::F32 => Some(32),
            TypeId::I64 | TypeId::U64 | TypeId::F64 => Some(64),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Built-in type names in sentinel order.
const BUILTINS: [(&str, TypeId); 12] = [
    ("i8", TypeId::I8),
    ("i16", TypeId::I16),
    ("i32", TypeId::I32),
    ("i64", TypeId::I64),
    ("u8", TypeId::U8),
    ("u16", TypeId::U16),
    ("u32", TypeId::U32),
    ("u64", TypeId::U64),
    ("f32", TypeId::F32),
    ("f64", TypeId::F64),
    ("bool", TypeId::BOOL),
    ("string", TypeId::STRING),
];

const ALIASES: [(&str, TypeId); 2] = [("int", TypeId::I32), ("float", TypeId::F64)];

/// Type modifier, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Pointer,
    /// Fixed length, or `None` for an unsized array.
    Array(Option<u64>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape<'src> {
    /// Built-in or struct type, identified by name and declaring scope.
    Value { name: &'src str, scope: ScopeId },
    Function {
        params: SmallVec<[TypeId; 4]>,
        returns: SmallVec<[TypeId; 2]>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type<'src> {
    pub shape: TypeShape<'src>,
    pub modifiers: SmallVec<[Modifier; 2]>,
}

impl<'src> Type<'src> {
    pub fn value(name: &'src str, scope: ScopeId) -> Self {
        Type {
            shape: TypeShape::Value { name, scope },
            modifiers: SmallVec::new(),
        }
    }

    pub fn function(params: &[TypeId], returns: &[TypeId]) -> Self {
        Type {
            shape: TypeShape::Function {
                params: params.into(),
                returns: returns.into(),
            },
            modifiers: SmallVec::new(),
        }
    }

    /// Same type with `modifier` applied on the outside.
    pub fn wrapped(&self, modifier: Modifier) -> Self {
        let mut modifiers = SmallVec::with_capacity(self.modifiers.len() + 1);
        modifiers.push(modifier);
        modifiers.extend_from_slice(&self.modifiers);
        Type {
            shape: self.shape.clone(),
            modifiers,
        }
    }

    /// Same type with the outermost modifier removed.
    pub fn unwrapped(&self) -> Option<(Modifier, Self)> {
        let (first, rest) = self.modifiers.split_first()?;
        Some((
            *first,
            Type {
                shape: self.shape.clone(),
                modifiers: rest.into(),
            },
        ))
    }

    /// Parameter and return types of an unmodified function type.
    pub fn as_function(&self) -> Option<(&[TypeId], &[TypeId])> {
        match &self.shape {
            TypeShape::Function { params, returns } if self.modifiers.is_empty() => {
                Some((params, returns))
            }
            _ => None,
        }
    }
}

/// Handle to a registered pending type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u32);

/// An AST field that receives a type once its pending type resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSlotId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Resolved(TypeId),
    /// Resolution failed; a diagnostic has been reported.
    Failed,
}

/// Modifier as written, before array lengths are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingModifier {
    Pointer,
    Array(Option<NodeId>),
}

#[derive(Debug, Clone)]
enum PendingShape<'src> {
    Named(&'src str),
    Function {
        params: Vec<PendingId>,
        returns: Vec<PendingId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingState {
    Waiting,
    Resolved(TypeId),
    Failed,
}

#[derive(Debug, Clone)]
struct PendingType<'src> {
    shape: PendingShape<'src>,
    modifiers: SmallVec<[PendingModifier; 2]>,
    scope: ScopeId,
    span: Span,
    outputs: SmallVec<[TypeSlotId; 2]>,
    state: PendingState,
}

#[derive(Debug)]
pub struct TypeTable<'src> {
    types: Vec<Type<'src>>,
    interned: FxHashMap<Type<'src>, TypeId>,
    pending: Vec<PendingType<'src>>,
    slots: Vec<SlotState>,
}

impl<'src> TypeTable<'src> {
    /// Create the table and register the built-in types and their names
    /// in the built-in scope.
    pub fn new(scopes: &mut ScopeTable<'src>) -> Self {
        let mut table = Self {
            types: Vec::new(),
            interned: FxHashMap::default(),
            pending: Vec::new(),
            slots: Vec::new(),
        };

        for (name, expected) in BUILTINS {
            let id = table.ensure_in_table(Type::value(name, ScopeId::BUILTIN));
            debug_assert_eq!(id, expected);
            scopes.define(ScopeId::BUILTIN, name, Symbol::BuiltInType(id));
        }
        for (alias, id) in ALIASES {
            scopes.define(ScopeId::BUILTIN, alias, Symbol::BuiltInType(id));
        }

        table
    }

    /// Intern a fully known type.
    pub fn ensure_in_table(&mut self, ty: Type<'src>) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type<'src> {
        &self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn function(&mut self, params: &[TypeId], returns: &[TypeId]) -> TypeId {
        self.ensure_in_table(Type::function(params, returns))
    }

    /// Pointer to `id`.
    pub fn pointer_to(&mut self, id: TypeId) -> TypeId {
        let ty = self.get(id).wrapped(Modifier::Pointer);
        self.ensure_in_table(ty)
    }

    /// Strip the outermost modifier if it is a pointer.
    pub fn pointee(&mut self, id: TypeId) -> Option<TypeId> {
        match self.get(id).unwrapped()? {
            (Modifier::Pointer, inner) => Some(self.ensure_in_table(inner)),
            _ => None,
        }
    }

    /// Strip the outermost modifier if it is an array.
    pub fn element(&mut self, id: TypeId) -> Option<TypeId> {
        match self.get(id).unwrapped()? {
            (Modifier::Array(_), inner) => Some(self.ensure_in_table(inner)),
            _ => None,
        }
    }

    /// Parameter and return types if `id` is an unmodified function type.
    pub fn signature(&self, id: TypeId) -> Option<(&[TypeId], &[TypeId])> {
        self.get(id).as_function()
    }

    /// Name and declaring scope of an unmodified struct or built-in type.
    pub fn value_base(&self, id: TypeId) -> Option<(&'src str, ScopeId)> {
        let ty = self.get(id);
        match ty.shape {
            TypeShape::Value { name, scope } if ty.modifiers.is_empty() => Some((name, scope)),
            _ => None,
        }
    }

    pub fn register_pending_non_func_type(
        &mut self,
        scope: ScopeId,
        base: &'src str,
        modifiers: SmallVec<[PendingModifier; 2]>,
        span: Span,
    ) -> PendingId {
        self.register(PendingShape::Named(base), modifiers, scope, span)
    }

    pub fn register_pending_func_type(
        &mut self,
        scope: ScopeId,
        modifiers: SmallVec<[PendingModifier; 2]>,
        params: Vec<PendingId>,
        returns: Vec<PendingId>,
        span: Span,
    ) -> PendingId {
        self.register(
            PendingShape::Function { params, returns },
            modifiers,
            scope,
            span,
        )
    }

    fn register(
        &mut self,
        shape: PendingShape<'src>,
        modifiers: SmallVec<[PendingModifier; 2]>,
        scope: ScopeId,
        span: Span,
    ) -> PendingId {
        let id = PendingId(self.pending.len() as u32);
        self.pending.push(PendingType {
            shape,
            modifiers,
            scope,
            span,
            outputs: SmallVec::new(),
            state: PendingState::Waiting,
        });
        id
    }

    /// Allocate an empty slot.
    pub fn new_slot(&mut self) -> TypeSlotId {
        let id = TypeSlotId(self.slots.len() as u32);
        self.slots.push(SlotState::Pending);
        id
    }

    /// Have `slot` receive the final type of `pending`.
    pub fn set_update_on_resolve(&mut self, pending: PendingId, slot: TypeSlotId) {
        let entry = &mut self.pending[pending.0 as usize];
        match entry.state {
            PendingState::Waiting => entry.outputs.push(slot),
            PendingState::Resolved(id) => self.slots[slot.0 as usize] = SlotState::Resolved(id),
            PendingState::Failed => self.slots[slot.0 as usize] = SlotState::Failed,
        }
    }

    /// New slot already registered against `pending`.
    pub fn slot_for(&mut self, pending: PendingId) -> TypeSlotId {
        let slot = self.new_slot();
        self.set_update_on_resolve(pending, slot);
        slot
    }

    pub fn slot(&self, slot: TypeSlotId) -> SlotState {
        self.slots[slot.0 as usize]
    }

    /// Resolved type of a slot, if any.
    pub fn slot_type(&self, slot: TypeSlotId) -> Option<TypeId> {
        match self.slot(slot) {
            SlotState::Resolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| p.state == PendingState::Waiting)
            .count()
    }

    /// Resolve every waiting pending type and fill its output slots.
    /// Returns false if any type failed; those slots are marked failed and
    /// a diagnostic is reported for each failing name.
    #[instrument(skip_all)]
    pub fn resolve_all(
        &mut self,
        scopes: &ScopeTable<'src>,
        ast: &Ast<'src>,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let waiting = self.pending_count();
        let mut success = true;

        for index in 0..self.pending.len() {
            let id = PendingId(index as u32);
            if self.resolve_pending(id, scopes, ast, diagnostics).is_none() {
                success = false;
            }
        }

        for index in 0..self.pending.len() {
            let state = match self.pending[index].state {
                PendingState::Resolved(id) => SlotState::Resolved(id),
                PendingState::Failed => SlotState::Failed,
                PendingState::Waiting => continue,
            };
            for slot in std::mem::take(&mut self.pending[index].outputs) {
                self.slots[slot.0 as usize] = state;
            }
        }

        debug!(waiting, types = self.types.len(), success, "resolved pending types");
        success
    }

    fn resolve_pending(
        &mut self,
        id: PendingId,
        scopes: &ScopeTable<'src>,
        ast: &Ast<'src>,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypeId> {
        let entry = &self.pending[id.0 as usize];
        match entry.state {
            PendingState::Resolved(resolved) => return Some(resolved),
            PendingState::Failed => return None,
            PendingState::Waiting => {}
        }
        let shape = entry.shape.clone();
        let modifiers = entry.modifiers.clone();
        let scope = entry.scope;
        let span = entry.span;

        let base = match shape {
            PendingShape::Named(name) => self.resolve_name(name, scope, span, scopes, diagnostics),
            PendingShape::Function { params, returns } => {
                let params = self.resolve_list(&params, scopes, ast, diagnostics);
                let returns = self.resolve_list(&returns, scopes, ast, diagnostics);
                match (params, returns) {
                    (Some(params), Some(returns)) => Some(self.function(&params, &returns)),
                    _ => None,
                }
            }
        };
        let resolved =
            base.and_then(|base| self.apply_modifiers(base, &modifiers, ast, diagnostics));

        self.pending[id.0 as usize].state = match resolved {
            Some(ty) => PendingState::Resolved(ty),
            None => PendingState::Failed,
        };
        resolved
    }

    fn resolve_list(
        &mut self,
        ids: &[PendingId],
        scopes: &ScopeTable<'src>,
        ast: &Ast<'src>,
        diagnostics: &mut Diagnostics,
    ) -> Option<SmallVec<[TypeId; 4]>> {
        let mut resolved = SmallVec::with_capacity(ids.len());
        let mut complete = true;
        for id in ids {
            match self.resolve_pending(*id, scopes, ast, diagnostics) {
                Some(ty) => resolved.push(ty),
                None => complete = false,
            }
        }
        complete.then_some(resolved)
    }

    fn resolve_name(
        &mut self,
        name: &'src str,
        scope: ScopeId,
        span: Span,
        scopes: &ScopeTable<'src>,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypeId> {
        match scopes.lookup_first(scope, name, SymbolFilter::TYPE, true) {
            Some((_, Symbol::BuiltInType(id))) => Some(id),
            Some((declared_in, Symbol::Struct(_))) => {
                Some(self.ensure_in_table(Type::value(name, declared_in)))
            }
            _ => {
                diagnostics.semantic(
                    SemanticError::UnresolvedType {
                        name: name.to_string(),
                    },
                    span,
                );
                None
            }
        }
    }

    fn apply_modifiers(
        &mut self,
        base: TypeId,
        modifiers: &[PendingModifier],
        ast: &Ast<'src>,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypeId> {
        let mut ty = base;
        // innermost modifier is written last
        for modifier in modifiers.iter().rev() {
            let modifier = match *modifier {
                PendingModifier::Pointer => Modifier::Pointer,
                PendingModifier::Array(None) => Modifier::Array(None),
                PendingModifier::Array(Some(length)) => match array_length(ast, length) {
                    Some(length) => Modifier::Array(Some(length)),
                    None => {
                        diagnostics.push(Diagnostic::semantic(
                            SemanticError::ArrayLength,
                            ast.span(length),
                        ));
                        return None;
                    }
                },
            };
            let wrapped = self.get(ty).wrapped(modifier);
            ty = self.ensure_in_table(wrapped);
        }
        Some(ty)
    }

    /// Human readable rendering of a type.
    pub fn display(&self, id: TypeId) -> String {
        let ty = self.get(id);
        let mut out = String::new();
        for modifier in &ty.modifiers {
            match modifier {
                Modifier::Pointer => out.push('^'),
                Modifier::Array(Some(length)) => out.push_str(&format!("[{}]", length)),
                Modifier::Array(None) => out.push_str("[]"),
            }
        }
        match &ty.shape {
            TypeShape::Value { name, .. } => out.push_str(name),
            TypeShape::Function { params, returns } => {
                let params: Vec<String> = params.iter().map(|p| self.display(*p)).collect();
                out.push_str(&format!("fn({})", params.join(", ")));
                match returns.as_slice() {
                    [] => {}
                    [single] => out.push_str(&format!(" -> {}", self.display(*single))),
                    many => {
                        let many: Vec<String> = many.iter().map(|r| self.display(*r)).collect();
                        out.push_str(&format!(" -> ({})", many.join(", ")));
                    }
                }
            }
        }
        out
    }
}

/// Value of an array length expression: a non-negative integer literal,
/// possibly parenthesised.
fn array_length(ast: &Ast<'_>, node: NodeId) -> Option<u64> {
    match ast.node(node) {
        Node::Literal { token } => match ast.token(*token).lexeme.value {
            LiteralValue::Int(value) => u64::try_from(value).ok(),
            _ => None,
        },
        Node::Group { inner } => array_length(ast, *inner),
        _ => None,
    }
}

/// Pluggable "may a value of `from` be used where `to` is expected"
/// predicate. Only consulted when the two types differ.
pub trait CoercionRules {
    fn is_coercible(&self, from: TypeId, to: TypeId) -> bool;
}

/// Lossless numeric widening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericWidening;

impl CoercionRules for NumericWidening {
    fn is_coercible(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return false;
        }
        let (Some(from_width), Some(to_width)) = (from.width(), to.width()) else {
            return false;
        };

        if from.is_integer() && to.is_float() {
            return true;
        }
        if from.is_float() && to.is_float() {
            return to_width > from_width;
        }
        if from.is_signed() && to.is_signed() {
            return to_width > from_width;
        }
        if from.is_unsigned() && to.is_unsigned() {
            return to_width > from_width;
        }
        from.is_unsigned() && to.is_signed() && to_width > from_width
    }
}

/// No implicit conversions at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl CoercionRules for Strict {
    fn is_coercible(&self, _from: TypeId, _to: TypeId) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_have_sentinel_ids() {
        let mut scopes = ScopeTable::new();
        let types = TypeTable::new(&mut scopes);

        assert_eq!(types.len(), BUILTINS.len());
        assert_eq!(
            scopes.lookup_first(ScopeId::GLOBAL, "int", SymbolFilter::TYPE, true),
            Some((ScopeId::BUILTIN, Symbol::BuiltInType(TypeId::I32)))
        );
        assert_eq!(types.display(TypeId::U16), "u16");
        assert!(TypeId::U64.is_integer());
        assert!(!TypeId::F32.is_integer());
        assert!(TypeId::F32.is_float());
        assert!(!TypeId::BOOL.is_numeric());
    }

    #[test]
    fn test_interning_collapses_equal_types() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);

        let a = types.function(&[TypeId::I32, TypeId::BOOL], &[TypeId::F64]);
        let b = types.function(&[TypeId::I32, TypeId::BOOL], &[TypeId::F64]);
        let c = types.function(&[TypeId::BOOL, TypeId::I32], &[TypeId::F64]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(types.display(a), "fn(i32, bool) -> f64");

        let ptr = types.pointer_to(TypeId::I32);
        assert_eq!(types.pointer_to(TypeId::I32), ptr);
        assert_eq!(types.pointee(ptr), Some(TypeId::I32));
        assert_eq!(types.pointee(TypeId::I32), None);
        assert_eq!(types.element(ptr), None);
        assert_eq!(types.display(ptr), "^i32");
    }

    #[test]
    fn test_modifier_order_matters() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);

        let i32_array = Type::value("i32", ScopeId::BUILTIN).wrapped(Modifier::Array(Some(3)));
        let array = types.ensure_in_table(i32_array);
        let pointer_to_array = types.pointer_to(array);
        let pointer = types.pointer_to(TypeId::I32);
        let wrapped = types.get(pointer).wrapped(Modifier::Array(Some(3)));
        let array_of_pointers = types.ensure_in_table(wrapped);

        assert_ne!(pointer_to_array, array_of_pointers);
        assert_eq!(types.display(pointer_to_array), "^[3]i32");
        assert_eq!(types.display(array_of_pointers), "[3]^i32");
        assert_eq!(types.element(array_of_pointers), Some(pointer));
    }

    #[test]
    fn test_pending_slots_receive_resolved_type() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let ast = Ast::new("");
        let mut diagnostics = Diagnostics::new();

        let int = types.register_pending_non_func_type(
            ScopeId::GLOBAL,
            "int",
            SmallVec::from_slice(&[PendingModifier::Pointer]),
            Span::default(),
        );
        let missing = types.register_pending_non_func_type(
            ScopeId::GLOBAL,
            "Missing",
            SmallVec::new(),
            Span::new(4, 11),
        );
        let func = types.register_pending_func_type(
            ScopeId::GLOBAL,
            SmallVec::new(),
            vec![int],
            vec![],
            Span::default(),
        );
        let first = types.slot_for(int);
        let second = types.slot_for(int);
        let broken = types.slot_for(missing);
        let func_slot = types.slot_for(func);
        assert_eq!(types.slot(first), SlotState::Pending);

        assert!(!types.resolve_all(&scopes, &ast, &mut diagnostics));

        let pointer = types.pointer_to(TypeId::I32);
        assert_eq!(types.slot_type(first), Some(pointer));
        assert_eq!(types.slot_type(second), Some(pointer));
        assert_eq!(types.slot(broken), SlotState::Failed);
        assert_eq!(types.display(types.slot_type(func_slot).unwrap()), "fn(^i32)");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.as_slice()[0].span, Span::new(4, 11));

        // slots registered after resolution are filled immediately
        let late = types.slot_for(int);
        assert_eq!(types.slot_type(late), Some(pointer));
    }

    #[test]
    fn test_numeric_widening() {
        let rules = NumericWidening;
        assert!(rules.is_coercible(TypeId::I8, TypeId::I32));
        assert!(rules.is_coercible(TypeId::U8, TypeId::U64));
        assert!(rules.is_coercible(TypeId::U16, TypeId::I32));
        assert!(rules.is_coercible(TypeId::I32, TypeId::F32));
        assert!(rules.is_coercible(TypeId::F32, TypeId::F64));
        assert!(!rules.is_coercible(TypeId::I32, TypeId::I16));
        assert!(!rules.is_coercible(TypeId::I32, TypeId::U64));
        assert!(!rules.is_coercible(TypeId::U32, TypeId::I32));
        assert!(!rules.is_coercible(TypeId::F64, TypeId::F32));
        assert!(!rules.is_coercible(TypeId::BOOL, TypeId::I32));
        assert!(!rules.is_coercible(TypeId::I32, TypeId::I32));
        assert!(!Strict.is_coercible(TypeId::I8, TypeId::I16));
    }
}
