//! Per-element configuration rules.
//!
//! Precedence for an element: the override table verbatim, then explicit
//! annotations, then the body or initializer, then configuration inherited
//! from overridden members. Executable results are wrapped to the right
//! access level by `adapt`: async bodies go under `await`, everything but
//! accessors under `invoke`.

use crate::annotations::read_throws;
use crate::configuration::{Configuration, PromotionKind};
use crate::resolver::ResolverSession;
use crate::throw_finder;
use crate::throws::Throws;
use crate::type_config::derive_value_throws;
use std::collections::{BTreeMap, HashSet, VecDeque};
use throws_ast::{
    ElementId, ElementKind, ExecutableElement, ExecutableKind, VariableElement, VariableKind,
};

pub(crate) fn compute_element_configuration(
    session: &mut ResolverSession<'_>,
    element: ElementId,
) -> Option<Configuration> {
    let program = session.program();
    let location = program.elements.location_of(element);
    if let Some(stored) = session.overrides().lookup(&location) {
        return Some(stored.clone());
    }

    match &program.elements.get(element).kind {
        ElementKind::Executable(exec) => {
            let exec = exec.clone();
            executable_configuration(session, element, exec)
        }
        ElementKind::Variable(var) => {
            let var = var.clone();
            variable_configuration(session, element, var)
        }
        // Libraries, classes and typedefs carry no configuration of their
        // own; typedef annotations flow in through the type deriver.
        _ => None,
    }
}

fn executable_configuration(
    session: &mut ResolverSession<'_>,
    element: ElementId,
    exec: ExecutableElement,
) -> Option<Configuration> {
    if exec.is_synthetic {
        // A synthetic accessor forwards to its field declaration.
        if let Some(field) = exec.field {
            return session.get_element_configuration(field);
        }
        if exec.kind == ExecutableKind::Constructor {
            return Some(wrap_slot(PromotionKind::Invoke, Configuration::empty()));
        }
    }

    let is_accessor = matches!(exec.kind, ExecutableKind::Getter | ExecutableKind::Setter);
    let return_value = derive_value_throws(session, exec.return_type);

    let program = session.program();
    let declared = read_throws(&program.elements.get(element).metadata, program);
    let declared = (!declared.inferred).then_some(declared);

    let chosen = if let Some(declared) = declared {
        declared
    } else if let Some(body) = exec.body {
        let found = throw_finder::find_throws(session, body);
        let program = session.program();
        let mut throws = Throws::empty();
        for (_, contribution) in &found {
            throws = throws.union(contribution, program);
        }
        throws
    } else if let Some(inherited) = inherited_configuration(session, element) {
        // Abstract or external member: adopt what the overridden members
        // agree on.
        equivalent_annotation_throws(&inherited, is_accessor, exec.is_async)
            .unwrap_or_else(Throws::empty)
    } else {
        Throws::empty()
    };

    Some(adapt(is_accessor, exec.is_async, chosen, return_value))
}

fn variable_configuration(
    session: &mut ResolverSession<'_>,
    element: ElementId,
    var: VariableElement,
) -> Option<Configuration> {
    let type_value = var
        .declared_type
        .map(|ty| derive_value_throws(session, ty))
        .filter(|slots| !slots.is_empty());
    let init_conf = var.initializer.and_then(|init| session.get_configuration(init));
    let annot_value = annotation_value_slots(session, element, &var);
    let inherited = if var.kind == VariableKind::Field && !var.is_static {
        inherited_configuration(session, element)
    } else {
        None
    };

    let mut sources = Vec::new();
    if let Some(init) = init_conf {
        if var.is_late {
            // Evaluation happens on first read; the initializer's throws
            // become the access throws.
            sources.push(init);
        } else {
            sources.push(Configuration::for_value(init.value));
        }
    }
    if let Some(type_value) = type_value {
        sources.push(Configuration::for_value(type_value));
    }
    if let Some(annot_value) = annot_value {
        sources.push(Configuration::for_value(annot_value));
    }
    if let Some(inherited) = inherited {
        sources.push(inherited);
    }

    if sources.is_empty() {
        // Nothing known: leave the element unconfigured rather than
        // claiming it throws nothing.
        return None;
    }
    Some(Configuration::resolve(&sources, session.program()))
}

/// Where a variable annotation lands: `invoke` for callable types, `await`
/// for future types, nowhere when the type is both, neither, or missing.
fn annotation_value_slots(
    session: &mut ResolverSession<'_>,
    element: ElementId,
    var: &VariableElement,
) -> Option<BTreeMap<PromotionKind, Configuration>> {
    let program = session.program();
    let declared = read_throws(&program.elements.get(element).metadata, program);
    if declared.inferred {
        return None;
    }
    let ty = var.declared_type?;
    let callable = program.types.function_return(ty).is_some()
        || program.call_method_of(ty).is_some();
    let future = program.future_value_type(ty).is_some();
    let kind = match (callable, future) {
        (true, false) => PromotionKind::Invoke,
        (false, true) => PromotionKind::Await,
        _ => return None,
    };
    let mut slots = BTreeMap::new();
    slots.insert(kind, Configuration::throws(declared));
    Some(slots)
}

/// Wrap raw body throws into the element's access shape.
pub(crate) fn adapt(
    is_accessor: bool,
    is_async: bool,
    throws: Throws,
    return_value: BTreeMap<PromotionKind, Configuration>,
) -> Configuration {
    let mut conf = Configuration { throws, value: return_value };
    if is_async {
        conf = wrap_slot(PromotionKind::Await, conf);
    }
    if !is_accessor {
        conf = wrap_slot(PromotionKind::Invoke, conf);
    }
    conf
}

pub(crate) fn wrap_slot(kind: PromotionKind, inner: Configuration) -> Configuration {
    let mut value = BTreeMap::new();
    value.insert(kind, inner);
    Configuration::for_value(value)
}

/// Inverse of `adapt`: recover the `Throws` one would annotate on the body.
/// `None` when the expected shells are missing.
pub fn equivalent_annotation_throws(
    conf: &Configuration,
    is_accessor: bool,
    is_async: bool,
) -> Option<Throws> {
    let mut current = conf;
    if !is_accessor {
        current = current.value.get(&PromotionKind::Invoke)?;
    }
    if is_async {
        current = current.value.get(&PromotionKind::Await)?;
    }
    Some(current.throws.clone())
}

/// Intersection of the configurations of the members `element` overrides.
///
/// Breadth-first over superclass, interfaces, mixins, and mixin superclass
/// constraints; the first same-named non-static non-constructor member on a
/// branch stops descent through that branch. Private members only match in
/// the declaring library.
pub(crate) fn inherited_configuration(
    session: &mut ResolverSession<'_>,
    element: ElementId,
) -> Option<Configuration> {
    let program = session.program();
    let member = program.elements.get(element);
    let class = member.enclosing?;
    program.elements.get(class).as_class()?;
    if is_static_or_constructor(program, element) {
        return None;
    }
    let name = member.name;
    let is_private = member.is_private();
    let member_library = program.elements.library_of(element);

    let mut queue: VecDeque<ElementId> = program.supertype_classes(class).into();
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut collected = Vec::new();

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        let program = session.program();
        let found = program
            .elements
            .get(current)
            .as_class()
            .into_iter()
            .flat_map(|c| c.members.iter().copied())
            .find(|&candidate| {
                program.elements.get(candidate).name == name
                    && !is_static_or_constructor(program, candidate)
                    && (!is_private
                        || program.elements.library_of(candidate) == member_library)
            });
        match found {
            Some(overridden) => {
                if let Some(conf) = session.get_element_configuration(overridden) {
                    collected.push(conf);
                }
            }
            None => queue.extend(program.supertype_classes(current)),
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(Configuration::intersect_all(&collected, session.program()))
    }
}

fn is_static_or_constructor(program: &throws_ast::Program, element: ElementId) -> bool {
    match &program.elements.get(element).kind {
        ElementKind::Executable(exec) => {
            exec.is_static || exec.kind == ExecutableKind::Constructor
        }
        ElementKind::Variable(var) => var.is_static,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throws_ast::Program;

    #[test]
    fn adapt_round_trips_through_equivalent_annotation() {
        let program = Program::new();
        let core = *program.core();
        let throws = Throws::exactly(core.format_exception);

        for (is_accessor, is_async) in
            [(false, false), (false, true), (true, false), (true, true)]
        {
            let conf = adapt(is_accessor, is_async, throws.clone(), BTreeMap::new());
            let recovered = equivalent_annotation_throws(&conf, is_accessor, is_async);
            assert_eq!(recovered, Some(throws.clone()), "accessor={is_accessor} async={is_async}");
        }
    }

    #[test]
    fn equivalent_annotation_fails_on_missing_shells() {
        let conf = Configuration::empty();
        assert!(equivalent_annotation_throws(&conf, false, false).is_none());
        // An accessor's sync configuration has no shells to unwrap.
        assert!(equivalent_annotation_throws(&conf, true, false).is_some());
    }
}
