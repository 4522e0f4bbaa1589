//! Collects the immediate throw contributions of a body.
//!
//! The result maps each contributing expression node to the `Throws` it
//! adds on its own, not cumulatively for its subtree. Nested function
//! expressions are opaque here (they have their own configurations), late
//! variable initializers are deferred to the variable, and `try`/`catch`
//! subtracts the caught types from the protected body's contributions.

use crate::resolver::ResolverSession;
use crate::throws::Throws;
use throws_ast::{ExprKind, NodeId, NodeKind, StmtKind};

/// Immediate throw contributions of every expression under `body`.
pub fn find_throws(
    session: &mut ResolverSession<'_>,
    body: NodeId,
) -> Vec<(NodeId, Throws)> {
    let mut out = Vec::new();
    visit(session, body, &mut out);
    out
}

fn visit(session: &mut ResolverSession<'_>, node: NodeId, out: &mut Vec<(NodeId, Throws)>) {
    enum Shape {
        FunctionExpression,
        Expression,
        LateDeclaration,
        EagerDeclaration(Option<NodeId>),
        Try { body: NodeId, caught: Vec<Option<throws_ast::TypeId>>, rest: Vec<NodeId> },
        Other,
    }

    let shape = {
        let program = session.program();
        match &program.ast.node(node).kind {
            NodeKind::Expr(ExprKind::FunctionExpression { .. }) => Shape::FunctionExpression,
            NodeKind::Expr(_) => Shape::Expression,
            NodeKind::Stmt(StmtKind::VariableDeclaration { element }) => {
                let variable = program.elements.get(*element).as_variable();
                match variable {
                    Some(var) if var.is_late => Shape::LateDeclaration,
                    Some(var) => Shape::EagerDeclaration(var.initializer),
                    None => Shape::Other,
                }
            }
            NodeKind::Stmt(StmtKind::Try { body, catches, finally }) => Shape::Try {
                body: *body,
                caught: catches.iter().map(|c| c.exception_type).collect(),
                rest: catches
                    .iter()
                    .map(|c| c.body)
                    .chain(finally.iter().copied())
                    .collect(),
            },
            NodeKind::Stmt(_) => Shape::Other,
        }
    };

    match shape {
        // Opaque: uses of the literal contribute through its own node.
        Shape::FunctionExpression => {}
        Shape::Expression => {
            for child in session.program().ast.children(node) {
                visit(session, child, out);
            }
            if let Some(conf) = session.get_configuration(node) {
                if !conf.throws.is_empty() {
                    out.push((node, conf.throws));
                }
            }
        }
        // Deferred to first access; surfaced on the variable itself.
        Shape::LateDeclaration => {}
        Shape::EagerDeclaration(initializer) => {
            if let Some(init) = initializer {
                visit(session, init, out);
            }
        }
        Shape::Try { body, caught, rest } => {
            let mut protected = Vec::new();
            visit(session, body, &mut protected);
            for exception_type in caught {
                match exception_type {
                    Some(ty) => {
                        let program = session.program();
                        protected = protected
                            .into_iter()
                            .filter_map(|(n, throws)| {
                                let remaining = throws.subtract(ty, program);
                                (!remaining.is_empty()).then_some((n, remaining))
                            })
                            .collect();
                    }
                    // An untyped clause catches everything.
                    None => protected.clear(),
                }
            }
            out.extend(protected);
            for handler in rest {
                visit(session, handler, out);
            }
        }
        Shape::Other => {
            for child in session.program().ast.children(node) {
                visit(session, child, out);
            }
        }
    }
}
