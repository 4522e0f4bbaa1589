//! Lattice properties of `Throws` and `Configuration`.

use throws_ast::Program;
use throws_checker::{Configuration, PromotionKind, Throws};

fn antichain_holds(throws: &Throws, program: &Program) -> bool {
    throws.thrown_types.iter().all(|&a| {
        throws
            .thrown_types
            .iter()
            .all(|&b| a == b || !program.is_assignable_to(a, b))
    })
}

fn sample_throws(program: &Program) -> Vec<Throws> {
    let core = *program.core();
    let mut safe = Throws::explicit(true);
    let mut fmt = Throws::explicit(false);
    fmt.insert(core.format_exception, program);
    let mut wide = Throws::explicit(false);
    wide.insert(core.exception, program);
    wide.insert(core.state_error, program);
    safe.insert(core.state_error, program);
    vec![
        Throws::empty(),
        safe,
        fmt,
        wide,
        Throws::exactly(core.exception),
        Throws::exactly(core.type_error),
    ]
}

#[test]
fn union_and_intersect_preserve_the_antichain() {
    let program = Program::new();
    let samples = sample_throws(&program);
    for a in &samples {
        assert!(antichain_holds(a, &program));
        for b in &samples {
            assert!(antichain_holds(&a.union(b, &program), &program));
            assert!(antichain_holds(&a.intersect(b, &program), &program));
        }
    }
}

#[test]
fn union_and_intersect_are_commutative() {
    let program = Program::new();
    let samples = sample_throws(&program);
    for a in &samples {
        for b in &samples {
            assert_eq!(a.union(b, &program), b.union(a, &program), "{a:?} {b:?}");
            let ab = a.intersect(b, &program);
            let ba = b.intersect(a, &program);
            assert_eq!(ab.thrown_types, ba.thrown_types, "{a:?} {b:?}");
            assert_eq!(ab.can_throw_undeclared, ba.can_throw_undeclared);
        }
    }
}

#[test]
fn union_is_associative_on_thrown_types() {
    let program = Program::new();
    let samples = sample_throws(&program);
    for a in &samples {
        for b in &samples {
            for c in &samples {
                let left = a.union(b, &program).union(c, &program);
                let right = a.union(&b.union(c, &program), &program);
                assert_eq!(left.thrown_types, right.thrown_types);
                assert_eq!(left.can_throw_undeclared, right.can_throw_undeclared);
            }
        }
    }
}

#[test]
fn singleton_union_and_intersect_are_identity() {
    let program = Program::new();
    let core = *program.core();
    let mut value = std::collections::BTreeMap::new();
    value.insert(PromotionKind::Invoke, Configuration::throws_exactly(core.exception));
    let conf = Configuration { throws: Throws::exactly(core.format_exception), value };
    assert_eq!(Configuration::union_all(std::slice::from_ref(&conf), &program), conf);
    assert_eq!(
        Configuration::intersect_all(std::slice::from_ref(&conf), &program),
        conf
    );
}

#[test]
fn widening_the_parameter_preserves_compatibility() {
    let program = Program::new();
    let core = *program.core();

    let source = Configuration::throws_exactly(core.format_exception);

    let mut narrow_throws = Throws::explicit(false);
    narrow_throws.insert(core.format_exception, &program);
    let narrow = Configuration::throws(narrow_throws);

    let mut wide_throws = Throws::explicit(true);
    wide_throws.insert(core.exception, &program);
    let wide = Configuration::throws(wide_throws);

    assert!(source.is_compatible(&narrow, 0, &program));
    // Anything the narrow parameter accepted, the wider one accepts too.
    assert!(source.is_compatible(&wide, 0, &program));
}

#[test]
fn compatibility_is_contravariant_in_slot_presence() {
    let program = Program::new();
    let core = *program.core();

    let mut callable_value = std::collections::BTreeMap::new();
    callable_value.insert(PromotionKind::Invoke, Configuration::empty());
    let callable = Configuration::for_value(callable_value.clone());

    let plain = Configuration::empty();
    // A location expecting a callable rejects a plain value.
    assert!(!plain.is_compatible(&callable, 0, &program));
    // A callable value fits a plain location.
    assert!(callable.is_compatible(&plain, 0, &program));

    // The slot's own throws are checked even below level 1.
    let mut throwing_value = std::collections::BTreeMap::new();
    throwing_value.insert(
        PromotionKind::Invoke,
        Configuration::throws_exactly(core.exception),
    );
    let throwing = Configuration::for_value(throwing_value);
    assert!(!throwing.is_compatible(&callable, 1, &program));
}
