//! Derives the configuration implied by a type alone.
//!
//! Function types contribute an `invoke` slot, future types an `await`
//! slot, structural callables (a non-static instance `call` method) an
//! `invoke` slot borrowed from that member. A typedef alias contributes its
//! annotations to the slot, except on a future-of-callable where the slot
//! the annotation means is ambiguous and the alias is ignored.

use crate::annotations::read_throws;
use crate::configuration::{Configuration, PromotionKind};
use crate::resolver::ResolverSession;
use crate::throws::Throws;
use std::collections::BTreeMap;
use throws_ast::TypeId;

/// The value slots implied by `ty`. Types with no callable or future shape
/// contribute nothing; generic type parameters in particular stay empty.
pub fn derive_value_throws(
    session: &mut ResolverSession<'_>,
    ty: TypeId,
) -> BTreeMap<PromotionKind, Configuration> {
    let program = session.program();
    let function_return = program.types.function_return(ty);
    let future_value = program.future_value_type(ty);
    let call_method = if function_return.is_none() {
        program.call_method_of(ty)
    } else {
        None
    };

    let is_callable = function_return.is_some() || call_method.is_some();
    let ambiguous = future_value.is_some() && is_callable;
    let alias_throws = if ambiguous {
        Throws::empty()
    } else {
        program
            .types
            .alias_of(ty)
            .map(|alias| read_throws(&program.elements.get(alias).metadata, program))
            .filter(|throws| !throws.inferred)
            .unwrap_or_else(Throws::empty)
    };

    let mut slots = BTreeMap::new();

    if let Some(return_type) = function_return {
        let value = derive_value_throws(session, return_type);
        slots.insert(
            PromotionKind::Invoke,
            Configuration { throws: alias_throws.clone(), value },
        );
    } else if let Some(call) = call_method {
        slots.insert(PromotionKind::Invoke, callable_slot(session, call, &alias_throws));
    }

    if let Some(value_type) = future_value {
        let value = derive_value_throws(session, value_type);
        slots.insert(
            PromotionKind::Await,
            Configuration { throws: alias_throws, value },
        );
    }

    slots
}

/// Invoke slot of a structural callable: the `call` member's own invoke
/// configuration, with the alias throws folded on top. An unresolved member
/// leaves just the alias throws.
fn callable_slot(
    session: &mut ResolverSession<'_>,
    call: throws_ast::ElementId,
    alias_throws: &Throws,
) -> Configuration {
    match session
        .get_element_configuration(call)
        .and_then(|conf| conf.value.get(&PromotionKind::Invoke).cloned())
    {
        Some(mut slot) => {
            if !alias_throws.is_empty() {
                slot.throws = slot.throws.union(alias_throws, session.program());
            }
            slot
        }
        None => Configuration::throws(alias_throws.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throws_ast::{Annotation, Program};

    #[test]
    fn plain_interface_types_contribute_nothing() {
        let program = Program::new();
        let core = *program.core();
        let mut session = ResolverSession::new(&program);
        assert!(derive_value_throws(&mut session, core.exception).is_empty());
        assert!(derive_value_throws(&mut session, core.object).is_empty());
    }

    #[test]
    fn function_types_get_an_invoke_slot() {
        let mut program = Program::new();
        let core = *program.core();
        let fn_ty = program.types.function(core.object);
        let mut session = ResolverSession::new(&program);
        let slots = derive_value_throws(&mut session, fn_ty);
        assert!(slots.contains_key(&PromotionKind::Invoke));
        assert!(!slots.contains_key(&PromotionKind::Await));
    }

    #[test]
    fn future_types_get_an_await_slot_over_the_value() {
        let mut program = Program::new();
        let core = *program.core();
        let fn_ty = program.types.function(core.object);
        let future_of_fn = program.types.interface(core.future_class, vec![fn_ty]);
        let mut session = ResolverSession::new(&program);
        let slots = derive_value_throws(&mut session, future_of_fn);
        let awaited = &slots[&PromotionKind::Await];
        assert!(awaited.value.contains_key(&PromotionKind::Invoke));
    }

    #[test]
    fn alias_on_a_future_lands_on_the_await_slot() {
        let mut program = Program::new();
        let core = *program.core();
        let lib = program.add_library("package:demo/demo.dart");
        let dynamic = program.types.dynamic();
        let future_ty = program.types.interface(core.future_class, vec![dynamic]);
        let alias = program.add_type_alias(lib, "Pending", future_ty);
        program.add_annotation(alias, Annotation::Throws(core.format_exception));
        let aliased = program.types.with_alias(future_ty, alias);

        let mut session = ResolverSession::new(&program);
        let slots = derive_value_throws(&mut session, aliased);
        let awaited = &slots[&PromotionKind::Await];
        assert_eq!(awaited.throws.thrown_types, vec![core.format_exception]);
    }

    #[test]
    fn future_of_callable_ambiguity_drops_alias_throws() {
        let mut program = Program::new();
        let core = *program.core();
        let lib = program.add_library("package:demo/demo.dart");

        // A future type that is also structurally callable.
        let void_ty = program.types.void_type();
        program.add_executable(
            core.future_class,
            "call",
            throws_ast::ExecutableKind::Method,
            void_ty,
        );
        let dynamic = program.types.dynamic();
        let future_ty = program.types.interface(core.future_class, vec![dynamic]);
        let alias = program.add_type_alias(lib, "Oddity", future_ty);
        program.add_annotation(alias, Annotation::Throws(core.format_exception));
        let aliased = program.types.with_alias(future_ty, alias);

        let mut session = ResolverSession::new(&program);
        let slots = derive_value_throws(&mut session, aliased);
        assert!(slots.contains_key(&PromotionKind::Invoke));
        assert!(slots.contains_key(&PromotionKind::Await));
        // Which slot the alias annotation meant is ambiguous, so neither
        // carries it.
        assert!(slots[&PromotionKind::Await].throws.thrown_types.is_empty());
        assert!(slots[&PromotionKind::Invoke].throws.thrown_types.is_empty());
    }

    #[test]
    fn typedef_alias_throws_land_on_the_slot() {
        let mut program = Program::new();
        let core = *program.core();
        let lib = program.add_library("package:demo/demo.dart");
        let fn_ty = program.types.function(core.object);
        let alias = program.add_type_alias(lib, "Callback", fn_ty);
        program.add_annotation(alias, Annotation::Throws(core.format_exception));
        let aliased = program.types.with_alias(fn_ty, alias);

        let mut session = ResolverSession::new(&program);
        let slots = derive_value_throws(&mut session, aliased);
        let invoke = &slots[&PromotionKind::Invoke];
        assert_eq!(invoke.throws.thrown_types, vec![core.format_exception]);
        assert!(!invoke.throws.inferred);
    }
}
