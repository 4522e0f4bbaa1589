//! Per-expression configuration rules.
//!
//! Each expression kind maps to a configuration describing what evaluating
//! it throws now and what its value does when promoted. Child resolution
//! failures are not bubbled up here; an unknown child simply contributes
//! nothing, and its own node carries whatever is known about it.

use crate::configuration::{Configuration, PromotionKind};
use crate::element_config;
use crate::resolver::ResolverSession;
use crate::throw_finder;
use crate::throws::Throws;
use std::collections::BTreeMap;
use throws_ast::{ExprKind, NodeId, StmtKind};
use tracing::debug;

pub(crate) fn compute_configuration(
    session: &mut ResolverSession<'_>,
    node: NodeId,
) -> Option<Configuration> {
    let program = session.program();
    let kind = program.ast.expr_kind(node)?.clone();
    match kind {
        ExprKind::Literal(_) | ExprKind::This | ExprKind::SuperRef => {
            Some(Configuration::empty())
        }
        ExprKind::IsTest { .. } | ExprKind::TypeLiteral { .. } => Some(Configuration::empty()),

        // Value-copying wrappers.
        ExprKind::Parenthesized { inner } | ExprKind::NamedArgument { inner, .. } => {
            Some(Configuration::for_value(child_value(session, inner)))
        }

        ExprKind::Identifier { element }
        | ExprKind::PropertyAccess { element, .. }
        | ExprKind::ConstructorReference { element } => {
            let element = element?;
            session.get_element_configuration(element)
        }

        ExprKind::Invocation { callee, args: _ } => {
            let callee_conf = session.get_configuration(callee)?;
            Some(promote_invoke(session, callee_conf))
        }
        ExprKind::Index { operator, .. } | ExprKind::BinaryOp { operator, .. } => {
            let operator = operator?;
            let operator_conf = session.get_element_configuration(operator)?;
            Some(promote_invoke(session, operator_conf))
        }
        ExprKind::InstanceCreation { constructor, args: _ } => {
            let constructor = constructor?;
            let constructor_conf = session.get_element_configuration(constructor)?;
            Some(promote_invoke(session, constructor_conf))
        }

        ExprKind::Await { inner } => {
            let inner_conf = session.get_configuration(inner)?;
            match inner_conf.value.get(&PromotionKind::Await) {
                Some(awaited) => Some(awaited.clone()),
                // Awaiting a non-future passes the value through.
                None => Some(Configuration::for_value(inner_conf.value)),
            }
        }

        ExprKind::Assignment { target, value } => {
            let value_slots = child_value(session, value);
            let throws = target
                .and_then(|t| session.get_element_configuration(t))
                .map(|conf| conf.throws)
                .unwrap_or_else(Throws::empty);
            Some(Configuration { throws, value: value_slots })
        }

        ExprKind::Conditional { then_branch, else_branch, .. } => {
            Some(union_branches(session, &[then_branch, else_branch]))
        }
        ExprKind::SwitchExpression { arms, .. } => Some(union_branches(session, &arms)),

        ExprKind::FunctionExpression { element } => {
            if let Some(param) = session.program().static_parameter_of(node) {
                // Context-driven: the literal may throw whatever its
                // receiver accepts.
                if let Some(conf) = session.get_element_configuration(param) {
                    return Some(conf);
                }
            }
            function_literal_configuration(session, element)
        }

        ExprKind::Cast { inner, ty } => {
            let value = child_value(session, inner);
            let throws = if session.program().is_top_type(ty) {
                Throws::empty()
            } else {
                Throws::exactly(session.program().core().type_error)
            };
            Some(Configuration { throws, value })
        }
        ExprKind::NullAssert { inner } => {
            let value = child_value(session, inner);
            Some(Configuration {
                throws: Throws::exactly(session.program().core().type_error),
                value,
            })
        }

        ExprKind::Throw { inner, thrown_type } => {
            let value = child_value(session, inner);
            Some(Configuration { throws: Throws::exactly(thrown_type), value })
        }
        ExprKind::Rethrow => {
            let ty = enclosing_catch_type(session, node);
            Some(Configuration::throws_exactly(ty))
        }

        ExprKind::IfNull { left, right } => {
            let left_value = Configuration::for_value(child_value(session, left));
            let right_value = Configuration::for_value(child_value(session, right));
            Some(left_value.union(&right_value, session.program()))
        }

        ExprKind::PatternAssignment { value } => {
            let slots = child_value(session, value);
            Some(Configuration {
                // Refutation of the pattern surfaces as a StateError.
                throws: Throws::exactly(session.program().core().state_error),
                value: slots,
            })
        }
    }
}

/// The value slots of a child expression; an unknown child has none.
fn child_value(
    session: &mut ResolverSession<'_>,
    node: NodeId,
) -> BTreeMap<PromotionKind, Configuration> {
    session
        .get_configuration(node)
        .map(|conf| conf.value)
        .unwrap_or_default()
}

/// Result of calling a value: its `invoke` slot, or a `NoSuchMethodError`
/// when the value has no callable shape.
fn promote_invoke(session: &ResolverSession<'_>, conf: Configuration) -> Configuration {
    match conf.value.get(&PromotionKind::Invoke) {
        Some(result) => result.clone(),
        None => {
            debug!("invoking a value with no invoke slot");
            Configuration::throws_exactly(session.program().core().no_such_method_error)
        }
    }
}

fn union_branches(session: &mut ResolverSession<'_>, branches: &[NodeId]) -> Configuration {
    let configurations: Vec<Configuration> = branches
        .iter()
        .filter_map(|&b| session.get_configuration(b))
        .collect();
    Configuration::union_all(&configurations, session.program())
}

/// The exception type of the catch clause enclosing `node`, `Object` when
/// the clause is untyped or there is none.
fn enclosing_catch_type(session: &ResolverSession<'_>, node: NodeId) -> throws_ast::TypeId {
    let program = session.program();
    let mut current = node;
    while let Some(parent) = program.ast.parent(current) {
        if let Some(StmtKind::Try { catches, .. }) = program.ast.stmt_kind(parent) {
            for clause in catches {
                if clause.body == current {
                    return clause.exception_type.unwrap_or(program.core().object);
                }
            }
        }
        current = parent;
    }
    program.core().object
}

/// Standalone configuration of a function literal, from its own body: body
/// throws union under `invoke`, an extra `await` shell for async bodies. A
/// throw-free body still yields an explicit zero-throws slot rather than no
/// slot at all.
pub fn function_literal_configuration(
    session: &mut ResolverSession<'_>,
    element: throws_ast::ElementId,
) -> Option<Configuration> {
    let exec = session.program().elements.get(element).as_executable()?.clone();
    let body = exec.body?;
    let found = throw_finder::find_throws(session, body);
    let program = session.program();
    let mut throws = Throws::empty();
    for (_, node_throws) in &found {
        throws = throws.union(node_throws, program);
    }
    let mut inner = Configuration::throws(throws);
    if exec.is_async {
        inner = element_config::wrap_slot(PromotionKind::Await, inner);
    }
    Some(element_config::wrap_slot(PromotionKind::Invoke, inner))
}
