// Resolution engine: walks the tree, binds names and checks types

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::diagnostics::{Diagnostic, Diagnostics, InternalError, Related, SemanticError};
use crate::parser::ast::{Ast, Node, NodeId, SymbolRef};
use crate::resolver::overload::{type_tier, Tier};
use crate::symbols::scope::{ScopeId, ScopeTable, Symbol};
use crate::symbols::types::{CoercionRules, TypeId, TypeTable};

/// Outcome of resolving one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An expression with a known type.
    Value(TypeId),
    /// A statement, or a call that does not produce exactly one value.
    NoValue,
    /// An overloaded name the parent has to pick a candidate for. The
    /// candidates are stored in the node's [`SymbolRef::Unresolved`].
    Candidates,
    /// Something below failed and has been reported already.
    Unresolved,
}

impl Resolution {
    pub fn value(self) -> Option<TypeId> {
        match self {
            Resolution::Value(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Innermost enclosing function, consulted by `return`.
#[derive(Debug, Clone)]
pub(crate) struct FunctionContext {
    /// Declared return types; `None` where the type failed to resolve.
    pub returns: SmallVec<[Option<TypeId>; 2]>,
}

/// Name and type resolution pass over one parsed program
pub struct Resolver<'a, 'src> {
    pub(crate) ast: &'a mut Ast<'src>,
    pub(crate) scopes: &'a mut ScopeTable<'src>,
    pub(crate) types: &'a mut TypeTable<'src>,
    pub(crate) rules: &'a dyn CoercionRules,
    pub(crate) diagnostics: Diagnostics,

    /// Enclosing functions, innermost last
    pub(crate) functions: Vec<FunctionContext>,

    /// Number of loops around the current statement
    pub(crate) breakable: u32,

    /// Scopes whose duplicate bindings have been audited
    audited: FxHashSet<ScopeId>,
}

impl<'a, 'src> Resolver<'a, 'src> {
    pub fn new(
        ast: &'a mut Ast<'src>,
        scopes: &'a mut ScopeTable<'src>,
        types: &'a mut TypeTable<'src>,
        rules: &'a dyn CoercionRules,
    ) -> Self {
        Resolver {
            ast,
            scopes,
            types,
            rules,
            diagnostics: Diagnostics::new(),
            functions: Vec::new(),
            breakable: 0,
            audited: FxHashSet::default(),
        }
    }

    /// Resolve the whole program rooted at `root` and return the
    /// diagnostics found. Only an internal error stops the walk.
    #[instrument(skip_all)]
    pub fn run(mut self, root: NodeId) -> Result<Diagnostics, InternalError> {
        let Node::Program { items, scope } = self.ast.node(root).clone() else {
            return Err(InternalError::UnexpectedNode {
                what: self.ast.node(root).kind_name(),
            });
        };

        self.audit(scope);
        for item in items {
            self.resolve(item)?;
        }

        debug!(
            diagnostics = self.diagnostics.len(),
            audited = self.audited.len(),
            "resolved program"
        );
        Ok(self.diagnostics)
    }

    /// Resolve any node below the program root.
    pub(crate) fn resolve(&mut self, id: NodeId) -> Result<Resolution, InternalError> {
        let node = self.ast.node(id).clone();
        let resolution = match node {
            // syntax errors were reported by the parser; their partial
            // contents are not resolved
            Node::Error { .. } => Resolution::Unresolved,
            Node::Program { .. } => {
                return Err(InternalError::UnexpectedNode { what: "nested program" })
            }

            Node::Literal { .. }
            | Node::Unary { .. }
            | Node::Binary { .. }
            | Node::Group { .. }
            | Node::Symbol { .. }
            | Node::Member { .. }
            | Node::Deref { .. }
            | Node::Subscript { .. }
            | Node::Call { .. }
            | Node::FuncLiteral { .. } => self.resolve_expression(id, node)?,

            Node::ExprStmt { .. }
            | Node::Assign { .. }
            | Node::VarDecl { .. }
            | Node::StructDefn { .. }
            | Node::FuncDefn { .. }
            | Node::If { .. }
            | Node::While { .. }
            | Node::Block { .. }
            | Node::Return { .. }
            | Node::Break
            | Node::Continue => self.resolve_statement(id, node)?,
        };

        if let Resolution::Value(ty) = resolution {
            self.ast.set_type(id, ty);
        }
        Ok(resolution)
    }

    // ===== Diagnostics =====

    pub(crate) fn report(&mut self, error: SemanticError, node: NodeId) {
        let span = self.ast.span(node);
        self.diagnostics.semantic(error, span);
    }

    pub(crate) fn report_with(&mut self, error: SemanticError, node: NodeId, related: Related) {
        let span = self.ast.span(node);
        self.diagnostics
            .push(Diagnostic::semantic(error, span).with_related(related));
    }

    pub(crate) fn display(&self, ty: TypeId) -> String {
        self.types.display(ty)
    }

    // ===== Scopes =====

    /// Run the duplicate audit for `scope` the first time it is entered.
    pub(crate) fn audit(&mut self, scope: ScopeId) {
        if !self.audited.insert(scope) {
            return;
        }

        let ast = &*self.ast;
        let types = &*self.types;
        let duplicates = self
            .scopes
            .audit_duplicates(scope, |node| function_type(ast, types, node));

        for duplicate in duplicates {
            let name = duplicate.name.to_string();
            let error = match duplicate.removed {
                Symbol::Var(_) => SemanticError::DuplicateVariable { name },
                Symbol::Struct(_) => SemanticError::DuplicateStruct { name },
                Symbol::Func(_) => SemanticError::DuplicateFunction {
                    name,
                    signature: duplicate
                        .signature
                        .map(|ty| self.display(ty))
                        .unwrap_or_default(),
                },
                Symbol::BuiltInType(_) => {
                    continue;
                }
            };
            let (Some(removed), Some(kept)) = (duplicate.removed.node(), duplicate.kept.node())
            else {
                continue;
            };
            self.report_with(error, removed, Related::Node(kept));
        }
    }

    // ===== Declarations =====

    /// Declared type of a variable, member, parameter or function symbol.
    pub(crate) fn symbol_type(&self, symbol: Symbol) -> Option<TypeId> {
        match symbol {
            Symbol::Var(node) => match self.ast.node(node) {
                Node::VarDecl { ty, .. } => self.types.slot_type(*ty),
                _ => None,
            },
            Symbol::Func(node) => function_type(self.ast, self.types, node),
            Symbol::Struct(_) | Symbol::BuiltInType(_) => None,
        }
    }

    /// Number of leading parameters without a default value, if `symbol`
    /// is a function definition.
    pub(crate) fn required_params(&self, symbol: Symbol) -> Option<usize> {
        let Symbol::Func(node) = symbol else {
            return None;
        };
        let Node::FuncDefn { header, .. } = self.ast.node(node) else {
            return None;
        };
        let required = header
            .params
            .iter()
            .filter(|param| {
                matches!(
                    self.ast.node(**param),
                    Node::VarDecl { init: None, .. }
                )
            })
            .count();
        Some(required)
    }

    /// Declared type of a `VarDecl` node.
    pub(crate) fn decl_type(&self, decl: NodeId) -> Option<TypeId> {
        self.symbol_type(Symbol::Var(decl))
    }

    // ===== Value checks =====

    /// The value type of an operand, reporting operands that cannot be
    /// used as a value. An overloaded name only has a value when a
    /// variable shadows every candidate function.
    pub(crate) fn expect_value(&mut self, node: NodeId, resolution: Resolution) -> Option<TypeId> {
        match resolution {
            Resolution::Value(ty) => Some(ty),
            Resolution::Unresolved => None,
            Resolution::NoValue => {
                self.report(SemanticError::NoValue, node);
                None
            }
            Resolution::Candidates => {
                let shadowing = match self.candidates_of(node).first() {
                    Some(var @ Symbol::Var(_)) => Some(*var),
                    _ => None,
                };
                let Some(var) = shadowing else {
                    self.report_ambiguous(node);
                    return None;
                };
                let ty = self.symbol_type(var)?;
                self.commit(node, var, ty);
                Some(ty)
            }
        }
    }

    /// Check that the value of `node` can be used where `expected` is
    /// required. An overloaded name is narrowed to its unique exact
    /// candidate, or failing that its unique coercible one.
    pub(crate) fn expect_type(
        &mut self,
        node: NodeId,
        resolution: Resolution,
        expected: TypeId,
        context: &'static str,
    ) {
        if resolution == Resolution::Candidates {
            if self.pick_candidate(node, expected).is_none() {
                self.report_ambiguous(node);
            }
            return;
        }

        let Some(found) = self.expect_value(node, resolution) else {
            return;
        };
        if type_tier(found, expected, self.rules).is_none() {
            let error = SemanticError::TypeMismatch {
                context,
                expected: self.display(expected),
                found: self.display(found),
            };
            self.report(error, node);
        }
    }

    pub(crate) fn report_ambiguous(&mut self, node: NodeId) {
        let name = self.symbol_name(node).to_string();
        self.report(SemanticError::AmbiguousReference { name }, node);
    }

    // ===== Candidates =====

    /// Candidates stored on an overloaded symbol node, looking through
    /// parentheses.
    pub(crate) fn candidates_of(&self, node: NodeId) -> SmallVec<[Symbol; 2]> {
        match self.ast.node(node) {
            Node::Group { inner } => self.candidates_of(*inner),
            Node::Symbol {
                state: SymbolRef::Unresolved(candidates),
                ..
            } => candidates.clone(),
            _ => SmallVec::new(),
        }
    }

    /// Resolve an overloaded symbol to the candidate that best fits where
    /// `expected` is required: the unique exact match, else the unique
    /// loose one. Returns the chosen type.
    pub(crate) fn pick_candidate(&mut self, node: NodeId, expected: TypeId) -> Option<TypeId> {
        let mut exact: SmallVec<[(Symbol, TypeId); 2]> = SmallVec::new();
        let mut loose: SmallVec<[(Symbol, TypeId); 2]> = SmallVec::new();
        for symbol in self.candidates_of(node) {
            let Some(ty) = self.symbol_type(symbol) else {
                continue;
            };
            match type_tier(ty, expected, self.rules) {
                Some(Tier::Exact) => exact.push((symbol, ty)),
                Some(Tier::Loose) => loose.push((symbol, ty)),
                None => {}
            }
        }

        let (symbol, ty) = match (exact.as_slice(), loose.as_slice()) {
            ([only], _) | ([], [only]) => *only,
            _ => return None,
        };
        self.commit(node, symbol, ty);
        Some(ty)
    }

    /// Bind an overloaded symbol node (and any groups around it) to one
    /// candidate.
    pub(crate) fn commit(&mut self, node: NodeId, symbol: Symbol, ty: TypeId) {
        self.ast.set_type(node, ty);
        match self.ast.node_mut(node) {
            Node::Group { inner } => {
                let inner = *inner;
                self.commit(inner, symbol, ty);
            }
            Node::Symbol { state, .. } => {
                *state = match symbol {
                    Symbol::Var(decl) => SymbolRef::Var(decl),
                    Symbol::Func(decl) => SymbolRef::Func(decl),
                    Symbol::Struct(_) | Symbol::BuiltInType(_) => return,
                };
            }
            _ => {}
        }
    }

    /// Name of a symbol node, looking through parentheses.
    pub(crate) fn symbol_name(&self, node: NodeId) -> &'src str {
        match self.ast.node(node) {
            Node::Group { inner } => self.symbol_name(*inner),
            _ => self.ast.name_of(node).unwrap_or_default(),
        }
    }
}

/// Function type of a function definition node.
pub(crate) fn function_type(ast: &Ast<'_>, types: &TypeTable<'_>, node: NodeId) -> Option<TypeId> {
    match ast.node(node) {
        Node::FuncDefn { header, .. } | Node::FuncLiteral { header, .. } => {
            types.slot_type(header.ty)
        }
        _ => None,
    }
}
