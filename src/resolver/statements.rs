//! Statement resolution
//!
//! This module handles resolution of all statement types, including:
//!
//! - Variable, struct and function declarations
//! - Control flow (`if`/`else`, `while`)
//! - `return`, `break` and `continue`
//! - Blocks, assignments and expression statements
//!
//! # Scopes
//!
//! Every scope is audited for duplicate bindings the first time the walk
//! enters it, before any of its statements are resolved.
//!
//! # Control Flow
//!
//! - Loops increment a breakable counter; `break` and `continue` with a
//!   counter of zero are errors
//! - Function bodies push a context holding the declared return types,
//!   which `return` statements are checked against

use crate::diagnostics::{InternalError, SemanticError};
use crate::parser::ast::{AssignOp, Node, NodeId, SymbolRef};
use crate::resolver::engine::{Resolution, Resolver};
use crate::symbols::types::TypeId;

impl<'a, 'src> Resolver<'a, 'src> {
    pub(crate) fn resolve_statement(
        &mut self,
        id: NodeId,
        node: Node,
    ) -> Result<Resolution, InternalError> {
        match node {
            Node::ExprStmt { expr } => {
                let resolution = self.resolve(expr)?;
                if resolution == Resolution::Candidates {
                    self.expect_value(expr, resolution);
                }
            }
            Node::Assign { op, target, value } => self.resolve_assign(op, target, value)?,
            Node::VarDecl { ty, init, scope, .. } => {
                self.audit(scope);
                let declared = self.types.slot_type(ty);
                if let Some(init) = init {
                    let resolution = self.resolve(init)?;
                    match declared {
                        Some(declared) => {
                            self.expect_type(init, resolution, declared, "initializer")
                        }
                        None => {
                            self.expect_value(init, resolution);
                        }
                    }
                }
            }
            Node::StructDefn { members, scope, .. } => {
                self.audit(scope);
                for member in members {
                    self.resolve(member)?;
                }
            }
            Node::FuncDefn { header, body, .. } => self.resolve_function(&header, body)?,
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_condition(condition)?;
                self.resolve(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve(else_branch)?;
                }
            }
            Node::While { condition, body } => {
                self.resolve_condition(condition)?;
                self.breakable += 1;
                let result = self.resolve(body);
                self.breakable -= 1;
                result?;
            }
            Node::Block { statements, scope } => {
                self.audit(scope);
                for statement in statements {
                    self.resolve(statement)?;
                }
            }
            Node::Return { values } => self.resolve_return(id, &values)?,
            Node::Break => {
                if self.breakable == 0 {
                    self.report(SemanticError::BreakOutsideLoop, id);
                }
            }
            Node::Continue => {
                if self.breakable == 0 {
                    self.report(SemanticError::ContinueOutsideLoop, id);
                }
            }
            other => {
                return Err(InternalError::UnexpectedNode {
                    what: other.kind_name(),
                })
            }
        }
        Ok(Resolution::NoValue)
    }

    fn resolve_condition(&mut self, condition: NodeId) -> Result<(), InternalError> {
        let resolution = self.resolve(condition)?;
        if let Some(ty) = self.expect_value(condition, resolution) {
            if ty != TypeId::BOOL {
                let error = SemanticError::TypeMismatch {
                    context: "condition",
                    expected: self.display(TypeId::BOOL),
                    found: self.display(ty),
                };
                self.report(error, condition);
            }
        }
        Ok(())
    }

    fn resolve_assign(
        &mut self,
        op: AssignOp,
        target: NodeId,
        value: NodeId,
    ) -> Result<(), InternalError> {
        let target_resolution = self.resolve(target)?;
        let value_resolution = self.resolve(value)?;

        if !self.is_place(target) {
            self.report(SemanticError::NotAssignable, target);
            return Ok(());
        }
        let Some(target_ty) = self.expect_value(target, target_resolution) else {
            // still resolve overloaded names on the right
            self.expect_value(value, value_resolution);
            return Ok(());
        };

        if op != AssignOp::Assign && !target_ty.is_numeric() {
            let error = SemanticError::InvalidOperand {
                op: op.symbol(),
                ty: self.display(target_ty),
            };
            self.report(error, target);
            return Ok(());
        }

        self.expect_type(value, value_resolution, target_ty, "assignment");
        Ok(())
    }

    /// Whether `node` denotes a storage location.
    fn is_place(&self, node: NodeId) -> bool {
        match self.ast.node(node) {
            Node::Group { inner } => self.is_place(*inner),
            Node::Symbol { state, .. } => !matches!(state, SymbolRef::Func(_)),
            Node::Member { .. } | Node::Subscript { .. } | Node::Deref { .. } => true,
            _ => false,
        }
    }

    fn resolve_return(&mut self, id: NodeId, values: &[NodeId]) -> Result<(), InternalError> {
        let mut resolutions = Vec::with_capacity(values.len());
        for value in values {
            resolutions.push(self.resolve(*value)?);
        }

        let Some(context) = self.functions.last() else {
            self.report(SemanticError::ReturnOutsideFunction, id);
            return Ok(());
        };
        let expected = context.returns.clone();

        if expected.len() != values.len() {
            self.report(
                SemanticError::ReturnCount {
                    expected: expected.len(),
                    found: values.len(),
                },
                id,
            );
            return Ok(());
        }

        for ((value, resolution), expected) in values.iter().zip(resolutions).zip(expected) {
            match expected {
                Some(expected) => self.expect_type(*value, resolution, expected, "return value"),
                None => {
                    self.expect_value(*value, resolution);
                }
            }
        }
        Ok(())
    }
}
