//! Expression resolution
//!
//! Each expression resolves to a [`Resolution`]. Names are bound by
//! gathering every function and at most one variable visible under the
//! name; a single candidate binds immediately, several are left on the
//! node for the parent to choose from. Calls choose with
//! [`select_overload`], typed contexts (initializers, assignments,
//! arguments to a known signature) pick the candidate of the expected
//! type, and every other parent reports an ambiguous reference.
//!
//! Binary operands must have identical types; coercions only apply where
//! a value flows into a declared type.
//!
//! All resolution methods are implemented as `pub(crate)` methods on the
//! [`Resolver`] struct.

use smallvec::SmallVec;
use tracing::trace;

use crate::diagnostics::{InternalError, SemanticError};
use crate::parser::ast::{BinaryOp, FuncHeader, Node, NodeId, SymbolRef, TokenRef, UnaryOp};
use crate::parser::token::{LiteralValue, TokenKind};
use crate::resolver::engine::{FunctionContext, Resolution, Resolver};
use crate::resolver::overload::{select_overload, ArgType, Candidate, Selection};
use crate::symbols::scope::{ScopeId, Symbol, SymbolFilter};
use crate::symbols::types::{TypeId, TypeSlotId};

impl<'a, 'src> Resolver<'a, 'src> {
    pub(crate) fn resolve_expression(
        &mut self,
        id: NodeId,
        node: Node,
    ) -> Result<Resolution, InternalError> {
        match node {
            Node::Literal { token } => Ok(self.resolve_literal(id, token)),
            Node::Unary { op, operand } => self.resolve_unary(id, op, operand),
            Node::Binary { op, left, right } => self.resolve_binary(id, op, left, right),
            Node::Group { inner } => self.resolve(inner),
            Node::Symbol {
                name,
                scope,
                signature,
                state,
            } => Ok(self.resolve_symbol(id, name, scope, signature, state)),
            Node::Member { owner, name, state } => self.resolve_member(id, owner, name, state),
            Node::Deref { operand } => {
                let resolution = self.resolve(operand)?;
                let Some(ty) = self.expect_value(operand, resolution) else {
                    return Ok(Resolution::Unresolved);
                };
                match self.types.pointee(ty) {
                    Some(pointee) => Ok(Resolution::Value(pointee)),
                    None => {
                        let ty = self.display(ty);
                        self.report(SemanticError::NotPointer { ty }, id);
                        Ok(Resolution::Unresolved)
                    }
                }
            }
            Node::Subscript { array, index } => self.resolve_subscript(id, array, index),
            Node::Call { callee, args } => self.resolve_call(id, callee, &args),
            Node::FuncLiteral { header, body } => {
                self.resolve_function(&header, body)?;
                Ok(self
                    .types
                    .slot_type(header.ty)
                    .map_or(Resolution::Unresolved, Resolution::Value))
            }
            other => Err(InternalError::UnexpectedNode {
                what: other.kind_name(),
            }),
        }
    }

    fn resolve_literal(&mut self, id: NodeId, token: TokenRef) -> Resolution {
        let lexeme = self.ast.token(token).lexeme;
        let ty = match (lexeme.kind, lexeme.value) {
            (TokenKind::IntLiteral, LiteralValue::Int(value)) => {
                if i32::try_from(value).is_ok() {
                    TypeId::I32
                } else {
                    TypeId::I64
                }
            }
            (TokenKind::IntLiteral, _) => TypeId::I64,
            (TokenKind::FloatLiteral, _) => TypeId::F64,
            (TokenKind::BoolLiteral, _) => TypeId::BOOL,
            (TokenKind::StringLiteral, _) => TypeId::STRING,
            (kind, _) => {
                trace!(?kind, ?id, "literal node with non-literal token");
                return Resolution::Unresolved;
            }
        };
        Resolution::Value(ty)
    }

    fn resolve_unary(
        &mut self,
        id: NodeId,
        op: UnaryOp,
        operand: NodeId,
    ) -> Result<Resolution, InternalError> {
        let resolution = self.resolve(operand)?;
        let Some(ty) = self.expect_value(operand, resolution) else {
            return Ok(Resolution::Unresolved);
        };

        let valid = match op {
            UnaryOp::Plus | UnaryOp::Negate => ty.is_numeric(),
            UnaryOp::Not => ty == TypeId::BOOL,
            UnaryOp::AddressOf => return Ok(Resolution::Value(self.types.pointer_to(ty))),
        };
        if !valid {
            let error = SemanticError::InvalidOperand {
                op: op.symbol(),
                ty: self.display(ty),
            };
            self.report(error, id);
            return Ok(Resolution::Unresolved);
        }
        Ok(Resolution::Value(ty))
    }

    fn resolve_binary(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> Result<Resolution, InternalError> {
        let left_resolution = self.resolve(left)?;
        let right_resolution = self.resolve(right)?;
        let left_ty = self.expect_value(left, left_resolution);
        let right_ty = self.expect_value(right, right_resolution);
        let (Some(left_ty), Some(right_ty)) = (left_ty, right_ty) else {
            return Ok(Resolution::Unresolved);
        };

        if left_ty != right_ty {
            let error = SemanticError::TypeMismatch {
                context: "binary operation",
                expected: self.display(left_ty),
                found: self.display(right_ty),
            };
            self.report(error, id);
            return Ok(Resolution::Unresolved);
        }

        let valid = if op.is_arithmetic() || op.is_comparison() {
            left_ty.is_numeric()
        } else if op.is_bitwise() {
            left_ty.is_integer()
        } else if op.is_logical() {
            left_ty == TypeId::BOOL
        } else {
            // equality works on any type
            true
        };
        if !valid {
            let error = SemanticError::InvalidOperand {
                op: op.symbol(),
                ty: self.display(left_ty),
            };
            self.report(error, id);
            return Ok(Resolution::Unresolved);
        }

        if op.is_comparison() || op.is_equality() {
            Ok(Resolution::Value(TypeId::BOOL))
        } else {
            Ok(Resolution::Value(left_ty))
        }
    }

    // ===== Names =====

    fn resolve_symbol(
        &mut self,
        id: NodeId,
        name: TokenRef,
        scope: ScopeId,
        signature: Option<TypeSlotId>,
        state: SymbolRef,
    ) -> Resolution {
        // already bound by an earlier run
        match state {
            SymbolRef::Var(decl) | SymbolRef::MemberVar(decl) => {
                return self.bound_type(Symbol::Var(decl));
            }
            SymbolRef::Func(decl) => return self.bound_type(Symbol::Func(decl)),
            SymbolRef::Unresolved(_) => {}
        }

        let text = self.ast.text(name);
        let candidates = self.gather_candidates(scope, text);

        if candidates.is_empty() {
            let error = if self
                .scopes
                .lookup_first(scope, text, SymbolFilter::TYPE, true)
                .is_some()
            {
                SemanticError::NotAValue {
                    name: text.to_string(),
                }
            } else {
                SemanticError::UnresolvedIdentifier {
                    name: text.to_string(),
                }
            };
            self.report(error, id);
            return Resolution::Unresolved;
        }

        if let Some(signature) = signature {
            return self.resolve_by_signature(id, text, &candidates, signature);
        }

        if let [only] = candidates.as_slice() {
            let resolution = self.bound_type(*only);
            if let Resolution::Value(ty) = resolution {
                self.commit(id, *only, ty);
            }
            return resolution;
        }

        trace!(name = text, count = candidates.len(), "overloaded name");
        if let Node::Symbol { state, .. } = self.ast.node_mut(id) {
            *state = SymbolRef::Unresolved(candidates);
        }
        Resolution::Candidates
    }

    /// Functions visible under `name` plus the innermost variable, ordered
    /// innermost first. The variable goes in front of every function
    /// declared in a scope outside its own.
    fn gather_candidates(&self, scope: ScopeId, name: &str) -> SmallVec<[Symbol; 2]> {
        let functions = self.scopes.lookup(scope, name, SymbolFilter::FUNC, true);
        let variable = self.scopes.lookup_first(scope, name, SymbolFilter::VAR, true);

        let mut candidates: SmallVec<[Symbol; 2]> =
            functions.iter().map(|(_, symbol)| *symbol).collect();
        if let Some((var_scope, var)) = variable {
            // lookup order is innermost first, and inner scopes have larger ids
            let position = functions
                .iter()
                .position(|(declared_in, _)| *declared_in < var_scope)
                .unwrap_or(functions.len());
            candidates.insert(position, var);
        }
        candidates
    }

    /// Type of a bound symbol; unresolved if its declared type failed.
    fn bound_type(&self, symbol: Symbol) -> Resolution {
        self.symbol_type(symbol)
            .map_or(Resolution::Unresolved, Resolution::Value)
    }

    /// `fn(name = T...)`: the unique candidate whose type is the signature.
    fn resolve_by_signature(
        &mut self,
        id: NodeId,
        name: &str,
        candidates: &[Symbol],
        signature: TypeSlotId,
    ) -> Resolution {
        let Some(wanted) = self.types.slot_type(signature) else {
            return Resolution::Unresolved;
        };

        let matching: SmallVec<[Symbol; 2]> = candidates
            .iter()
            .copied()
            .filter(|symbol| self.symbol_type(*symbol) == Some(wanted))
            .collect();

        match matching.as_slice() {
            [only] => {
                self.commit(id, *only, wanted);
                Resolution::Value(wanted)
            }
            _ => {
                let error = SemanticError::NoSignatureMatch {
                    name: name.to_string(),
                    signature: self.display(wanted),
                };
                self.report(error, id);
                Resolution::Unresolved
            }
        }
    }

    fn resolve_member(
        &mut self,
        id: NodeId,
        owner: NodeId,
        name: TokenRef,
        state: SymbolRef,
    ) -> Result<Resolution, InternalError> {
        let resolution = self.resolve(owner)?;
        if let SymbolRef::MemberVar(decl) = state {
            return Ok(self.bound_type(Symbol::Var(decl)));
        }

        let Some(owner_ty) = self.expect_value(owner, resolution) else {
            return Ok(Resolution::Unresolved);
        };

        let member_scope = self
            .types
            .value_base(owner_ty)
            .and_then(|(type_name, declared_in)| {
                self.scopes
                    .lookup_first(declared_in, type_name, SymbolFilter::TYPE, false)
            })
            .and_then(|(_, symbol)| match symbol {
                Symbol::Struct(defn) => match self.ast.node(defn) {
                    Node::StructDefn { scope, .. } => Some(*scope),
                    _ => None,
                },
                _ => None,
            });
        let Some(member_scope) = member_scope else {
            let ty = self.display(owner_ty);
            self.report(SemanticError::NoMembers { ty }, id);
            return Ok(Resolution::Unresolved);
        };

        let text = self.ast.text(name);
        match self
            .scopes
            .lookup_first(member_scope, text, SymbolFilter::VAR, false)
        {
            Some((_, Symbol::Var(decl))) => {
                if let Node::Member { state, .. } = self.ast.node_mut(id) {
                    *state = SymbolRef::MemberVar(decl);
                }
                Ok(self.bound_type(Symbol::Var(decl)))
            }
            _ => {
                let error = SemanticError::UnresolvedMember {
                    name: text.to_string(),
                    owner: self.display(owner_ty),
                };
                self.report(error, id);
                Ok(Resolution::Unresolved)
            }
        }
    }

    fn resolve_subscript(
        &mut self,
        id: NodeId,
        array: NodeId,
        index: NodeId,
    ) -> Result<Resolution, InternalError> {
        let array_resolution = self.resolve(array)?;
        let index_resolution = self.resolve(index)?;

        if let Some(index_ty) = self.expect_value(index, index_resolution) {
            if !index_ty.is_integer() {
                let error = SemanticError::TypeMismatch {
                    context: "array index",
                    expected: "integer".to_string(),
                    found: self.display(index_ty),
                };
                self.report(error, index);
            }
        }

        let Some(array_ty) = self.expect_value(array, array_resolution) else {
            return Ok(Resolution::Unresolved);
        };
        match self.types.element(array_ty) {
            Some(element) => Ok(Resolution::Value(element)),
            None => {
                let ty = self.display(array_ty);
                self.report(SemanticError::NotArray { ty }, id);
                Ok(Resolution::Unresolved)
            }
        }
    }

    // ===== Calls =====

    fn resolve_call(
        &mut self,
        id: NodeId,
        callee: NodeId,
        args: &[NodeId],
    ) -> Result<Resolution, InternalError> {
        let callee_resolution = self.resolve(callee)?;
        let mut arg_resolutions = Vec::with_capacity(args.len());
        for arg in args {
            arg_resolutions.push(self.resolve(*arg)?);
        }

        let signature = match callee_resolution {
            Resolution::Candidates => {
                return Ok(self.resolve_overloaded_call(id, callee, args, &arg_resolutions));
            }
            Resolution::Value(ty) => ty,
            Resolution::NoValue => {
                self.report(SemanticError::NoValue, callee);
                return Ok(Resolution::Unresolved);
            }
            Resolution::Unresolved => return Ok(Resolution::Unresolved),
        };

        let Some((params, returns)) = self.types.signature(signature) else {
            let ty = self.display(signature);
            self.report(SemanticError::NotCallable { ty }, callee);
            return Ok(Resolution::Unresolved);
        };
        let params: SmallVec<[TypeId; 4]> = params.into();
        let returns: SmallVec<[TypeId; 2]> = returns.into();

        let required = self
            .callee_symbol(callee)
            .and_then(|symbol| self.required_params(symbol))
            .unwrap_or(params.len());

        if !(required..=params.len()).contains(&args.len()) {
            let expected = if required == params.len() {
                required.to_string()
            } else {
                format!("{} to {}", required, params.len())
            };
            self.report(
                SemanticError::ArgumentCount {
                    expected,
                    found: args.len(),
                },
                id,
            );
            return Ok(call_result(&returns));
        }

        for ((arg, resolution), param) in args.iter().zip(&arg_resolutions).zip(&params) {
            self.expect_type(*arg, *resolution, *param, "argument");
        }
        Ok(call_result(&returns))
    }

    /// Declaration a callee expression is bound to, looking through
    /// parentheses.
    fn callee_symbol(&self, callee: NodeId) -> Option<Symbol> {
        match self.ast.node(callee) {
            Node::Group { inner } => self.callee_symbol(*inner),
            Node::Symbol { state, .. } => match state {
                SymbolRef::Func(decl) => Some(Symbol::Func(*decl)),
                SymbolRef::Var(decl) => Some(Symbol::Var(*decl)),
                _ => None,
            },
            _ => None,
        }
    }

    fn resolve_overloaded_call(
        &mut self,
        id: NodeId,
        callee: NodeId,
        args: &[NodeId],
        arg_resolutions: &[Resolution],
    ) -> Resolution {
        let mut arg_types = Vec::with_capacity(args.len());
        for (arg, resolution) in args.iter().zip(arg_resolutions) {
            let ty = match resolution {
                Resolution::Value(ty) => ArgType::Known(*ty),
                Resolution::Candidates => ArgType::Candidates(
                    self.candidates_of(*arg)
                        .into_iter()
                        .filter_map(|symbol| self.symbol_type(symbol))
                        .collect(),
                ),
                Resolution::NoValue => {
                    self.report(SemanticError::NoValue, *arg);
                    return Resolution::Unresolved;
                }
                Resolution::Unresolved => return Resolution::Unresolved,
            };
            arg_types.push(ty);
        }

        let symbols = self.candidates_of(callee);
        let candidates: Vec<Option<Candidate>> = symbols
            .iter()
            .map(|symbol| {
                let ty = self.symbol_type(*symbol)?;
                let (params, _) = self.types.signature(ty)?;
                let required = self.required_params(*symbol).unwrap_or(params.len());
                Some(Candidate::new(params, required))
            })
            .collect();

        let name = self.symbol_name(callee).to_string();
        let chosen = match select_overload(&candidates, &arg_types, self.rules) {
            Selection::Exact(index) | Selection::Loose(index) => index,
            Selection::Ambiguous(indices) => {
                let error = SemanticError::AmbiguousCall {
                    name,
                    count: indices.len(),
                };
                self.report(error, id);
                return Resolution::Unresolved;
            }
            Selection::NoMatch => {
                let args = arg_types
                    .iter()
                    .map(|arg| match arg {
                        ArgType::Known(ty) => self.display(*ty),
                        ArgType::Candidates(_) => "<overloaded>".to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report(SemanticError::NoMatchingOverload { name, args }, id);
                return Resolution::Unresolved;
            }
        };
        trace!(name = %name, chosen, "selected overload");

        let symbol = symbols[chosen];
        let Some(callee_ty) = self.symbol_type(symbol) else {
            return Resolution::Unresolved;
        };
        self.commit(callee, symbol, callee_ty);

        let Some((params, returns)) = self.types.signature(callee_ty) else {
            return Resolution::Unresolved;
        };
        let params: SmallVec<[TypeId; 4]> = params.into();
        let returns: SmallVec<[TypeId; 2]> = returns.into();

        // overloaded arguments bind to whatever matched their parameter
        for ((arg, resolution), param) in args.iter().zip(arg_resolutions).zip(&params) {
            if *resolution == Resolution::Candidates {
                self.expect_type(*arg, *resolution, *param, "argument");
            }
        }
        call_result(&returns)
    }

    // ===== Functions =====

    /// Resolve the parameters, returns and body of a function definition
    /// or literal.
    pub(crate) fn resolve_function(
        &mut self,
        header: &FuncHeader,
        body: NodeId,
    ) -> Result<(), InternalError> {
        self.audit(header.scope);

        for decl in header.params.iter().chain(&header.returns) {
            self.resolve(*decl)?;
        }

        let returns = header
            .returns
            .iter()
            .map(|decl| self.decl_type(*decl))
            .collect();
        self.functions.push(FunctionContext { returns });
        let breakable = std::mem::replace(&mut self.breakable, 0);

        let result = self.resolve(body);

        self.breakable = breakable;
        self.functions.pop();
        result.map(|_| ())
    }
}

/// Value of a call returning `returns`.
fn call_result(returns: &[TypeId]) -> Resolution {
    match returns {
        [single] => Resolution::Value(*single),
        _ => Resolution::NoValue,
    }
}
