//! The lint drivers. Each rule reads configurations from a resolver
//! session and reports through the diagnostic reporter; none of them
//! mutates the program.

use crate::annotations::has_conflicting_annotations;
use crate::configuration::Configuration;
use crate::diagnostics::{DiagnosticCode, DiagnosticReporter};
use crate::element_config::{equivalent_annotation_throws, inherited_configuration};
use crate::expr_config::function_literal_configuration;
use crate::resolver::ResolverSession;
use throws_ast::{
    ElementId, ElementKind, ExecutableKind, ExprKind, NodeId, Program, StmtKind, TypeId,
    VariableKind,
};

/// Run all rules over the session's program.
pub fn run_lints(session: &mut ResolverSession<'_>) -> Vec<crate::diagnostics::Diagnostic> {
    let mut reporter = DiagnosticReporter::new();
    uncaught_throw(session, &mut reporter);
    unsafe_assignment(session, &mut reporter);
    unsafe_override(session, &mut reporter);
    conflicting_annotations(session.program(), &mut reporter);
    reporter.into_diagnostics()
}

/// Expression kinds that originate throws themselves. Aggregators
/// (conditionals, `??`, wrappers) re-expose their children's throws and
/// would double-report them.
fn originates_throws(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Identifier { .. }
            | ExprKind::PropertyAccess { .. }
            | ExprKind::ConstructorReference { .. }
            | ExprKind::Invocation { .. }
            | ExprKind::Index { .. }
            | ExprKind::InstanceCreation { .. }
            | ExprKind::BinaryOp { .. }
            | ExprKind::Await { .. }
            | ExprKind::Assignment { .. }
            | ExprKind::Cast { .. }
            | ExprKind::NullAssert { .. }
            | ExprKind::Throw { .. }
            | ExprKind::Rethrow
            | ExprKind::PatternAssignment { .. }
    )
}

/// uncaught_throw: a throw site whose type the enclosing function does not
/// permit, after accounting for enclosing `try` statements.
fn uncaught_throw(session: &mut ResolverSession<'_>, reporter: &mut DiagnosticReporter) {
    let program = session.program();
    let nodes: Vec<NodeId> = program
        .ast
        .ids()
        .filter(|&node| {
            program
                .ast
                .expr_kind(node)
                .is_some_and(originates_throws)
        })
        .collect();

    for node in nodes {
        let Some(conf) = session.configuration(node) else {
            continue;
        };
        if conf.throws.is_empty() {
            continue;
        }
        let program = session.program();
        let Some((owner, caught, catch_all)) = enclosing_function(program, node) else {
            continue;
        };
        let Some(exec) = program.elements.get(owner).as_executable() else {
            continue;
        };
        let is_accessor = matches!(exec.kind, ExecutableKind::Getter | ExecutableKind::Setter);
        let is_async = exec.is_async;
        let Some(owner_conf) = session.element_configuration(owner) else {
            continue;
        };
        if catch_all {
            continue;
        }
        let program = session.program();
        let Some(mut allowed) = equivalent_annotation_throws(&owner_conf, is_accessor, is_async)
        else {
            continue;
        };
        for ty in caught {
            allowed.insert(ty, program);
        }

        for &thrown in &conf.throws.thrown_types {
            if !allowed.covers(thrown, program) {
                reporter.report(
                    DiagnosticCode::UncaughtThrow,
                    program.ast.span(node),
                    format!("{} can't be thrown here", program.display_type(thrown)),
                );
            }
        }
        let object = program.core().object;
        if conf.throws.can_throw_undeclared
            && !allowed.can_throw_undeclared
            && !allowed.covers(object, program)
        {
            reporter.report(
                DiagnosticCode::UncaughtThrow,
                program.ast.span(node),
                format!("{} can't be thrown here", program.display_type(object)),
            );
        }
    }
}

/// Walk from an expression to its enclosing function, accumulating the
/// exception types caught by the `try` statements passed through.
fn enclosing_function(
    program: &Program,
    node: NodeId,
) -> Option<(ElementId, Vec<TypeId>, bool)> {
    let mut caught = Vec::new();
    let mut catch_all = false;
    let mut current = node;
    loop {
        if let Some(owner) = program.body_root_owner(current) {
            return Some((owner, caught, catch_all));
        }
        let parent = program.ast.parent(current)?;
        if let Some(StmtKind::Try { body, catches, .. }) = program.ast.stmt_kind(parent) {
            // Only the protected body is guarded, not the handlers.
            if *body == current {
                for clause in catches {
                    match clause.exception_type {
                        Some(ty) => caught.push(ty),
                        None => catch_all = true,
                    }
                }
            }
        }
        current = parent;
    }
}

/// unsafe_assignment: the source configuration must fit the target's at
/// level 1 (the source's own evaluation throws are uncaught_throw's job).
fn unsafe_assignment(session: &mut ResolverSession<'_>, reporter: &mut DiagnosticReporter) {
    let program = session.program();
    let mut checks: Vec<(NodeId, ElementId)> = Vec::new();

    for node in program.ast.ids() {
        match program.ast.expr_kind(node) {
            Some(ExprKind::Invocation { args, .. })
            | Some(ExprKind::InstanceCreation { args, .. }) => {
                for arg in args {
                    if let Some(param) = arg.param {
                        checks.push((arg.expr, param));
                    }
                }
            }
            Some(ExprKind::Assignment { target: Some(target), value }) => {
                let target = setter_parameter(program, *target).unwrap_or(*target);
                checks.push((*value, target));
            }
            _ => {}
        }
    }
    for element in program.elements.ids() {
        if let ElementKind::Variable(var) = &program.elements.get(element).kind {
            if var.kind != VariableKind::Parameter {
                if let Some(init) = var.initializer {
                    checks.push((init, element));
                }
            }
        }
    }

    for (source, target) in checks {
        let Some(target_conf) = session.element_configuration(target) else {
            continue;
        };
        let Some(source_conf) = source_configuration(session, source) else {
            continue;
        };
        let program = session.program();
        if !source_conf.is_compatible(&target_conf, 1, program) {
            reporter.report(
                DiagnosticCode::UnsafeAssignment,
                program.ast.span(source),
                "This assignment is potentially unsafe",
            );
        }
    }
}

/// Assigning through a setter checks against its parameter.
fn setter_parameter(program: &Program, target: ElementId) -> Option<ElementId> {
    let exec = program.elements.get(target).as_executable()?;
    if exec.kind == ExecutableKind::Setter {
        exec.params.first().copied()
    } else {
        None
    }
}

/// The configuration an assignment source carries. A function literal is
/// judged by its own body here, not by the context-driven configuration
/// the resolver hands out, otherwise the rule could never fire.
fn source_configuration(
    session: &mut ResolverSession<'_>,
    node: NodeId,
) -> Option<Configuration> {
    let program = session.program();
    let mut current = node;
    loop {
        match program.ast.expr_kind(current) {
            Some(ExprKind::Parenthesized { inner })
            | Some(ExprKind::NamedArgument { inner, .. }) => current = *inner,
            Some(ExprKind::FunctionExpression { element }) => {
                return function_literal_configuration(session, *element);
            }
            _ => return session.configuration(node),
        }
    }
}

/// unsafe_override: an instance member must stay compatible with the
/// intersection of what it overrides.
fn unsafe_override(session: &mut ResolverSession<'_>, reporter: &mut DiagnosticReporter) {
    let program = session.program();
    let members: Vec<ElementId> = program
        .elements
        .ids()
        .filter(|&element| is_overridable_member(program, element))
        .collect();

    for member in members {
        let Some(member_conf) = session.element_configuration(member) else {
            continue;
        };
        let Some(inherited) = inherited_configuration(session, member) else {
            continue;
        };
        let program = session.program();
        if !member_conf.is_compatible(&inherited, 0, program) {
            reporter.report(
                DiagnosticCode::UnsafeOverride,
                program.elements.get(member).span,
                "This override's configuration isn't compatible with the overridden configuration",
            );
        }
    }
}

fn is_overridable_member(program: &Program, element: ElementId) -> bool {
    let member = program.elements.get(element);
    let Some(class) = member.enclosing else {
        return false;
    };
    if program.elements.get(class).as_class().is_none() {
        return false;
    }
    match &member.kind {
        ElementKind::Executable(exec) => {
            !exec.is_static && !exec.is_synthetic && exec.kind != ExecutableKind::Constructor
        }
        ElementKind::Variable(var) => var.kind == VariableKind::Field && !var.is_static,
        _ => false,
    }
}

/// conflicting_annotations: mixed marker kinds on one element.
fn conflicting_annotations(program: &Program, reporter: &mut DiagnosticReporter) {
    for element in program.elements.ids() {
        let data = program.elements.get(element);
        if has_conflicting_annotations(&data.metadata) {
            reporter.report(
                DiagnosticCode::ConflictingAnnotations,
                data.span,
                "Conflicting throws annotations on this element",
            );
        }
    }
}
