//! The `Throws` summary: which types an element or expression may throw.

use serde::{Deserialize, Serialize};
use throws_ast::{Program, TypeId};

/// What a program point may throw.
///
/// `thrown_types` is kept as a sorted antichain under the subtype relation:
/// no element is a proper subtype of another, and insertion keeps the most
/// general representative. `can_throw_undeclared` additionally admits any
/// non-Exception value (Errors). `inferred` records whether the summary came
/// from body analysis rather than an explicit annotation or override entry;
/// explicit summaries win over inferred ones when sources are merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Throws {
    pub thrown_types: Vec<TypeId>,
    pub can_throw_undeclared: bool,
    pub inferred: bool,
}

impl Throws {
    /// `({}, false, true)`: nothing known, nothing permitted.
    pub fn empty() -> Self {
        Throws { thrown_types: Vec::new(), can_throw_undeclared: false, inferred: true }
    }

    /// An annotation-anchored summary. The caller inserts types through
    /// [`Throws::insert`] so the antichain invariant holds.
    pub fn explicit(can_throw_undeclared: bool) -> Self {
        Throws { thrown_types: Vec::new(), can_throw_undeclared, inferred: false }
    }

    /// A single thrown type, as produced for a `throw` expression.
    pub fn exactly(ty: TypeId) -> Self {
        Throws { thrown_types: vec![ty], can_throw_undeclared: false, inferred: true }
    }

    pub fn is_empty(&self) -> bool {
        self.thrown_types.is_empty() && !self.can_throw_undeclared
    }

    /// Antichain insertion: skipped when an existing type already covers the
    /// new one; existing types covered by the new one are dropped.
    pub fn insert(&mut self, ty: TypeId, program: &Program) {
        if self
            .thrown_types
            .iter()
            .any(|&existing| program.is_assignable_to(ty, existing))
        {
            return;
        }
        self.thrown_types
            .retain(|&existing| !program.is_assignable_to(existing, ty));
        self.thrown_types.push(ty);
        self.thrown_types.sort();
    }

    /// Does this summary permit throwing `ty`? Either a declared supertype
    /// covers it, or it is an Error and undeclared throws are allowed.
    pub fn covers(&self, ty: TypeId, program: &Program) -> bool {
        if self
            .thrown_types
            .iter()
            .any(|&declared| program.is_assignable_to(ty, declared))
        {
            return true;
        }
        self.can_throw_undeclared && !program.is_exception_subtype(ty)
    }

    /// Merge of alternatives: anything either side may throw.
    pub fn union(&self, other: &Throws, program: &Program) -> Throws {
        let mut out = Throws {
            thrown_types: self.thrown_types.clone(),
            can_throw_undeclared: self.can_throw_undeclared || other.can_throw_undeclared,
            inferred: self.inferred && other.inferred,
        };
        for &ty in &other.thrown_types {
            out.insert(ty, program);
        }
        out
    }

    /// Merge of requirements: only what every side permits. A type survives
    /// when the other side covers it, from either side, which keeps the
    /// operation commutative.
    pub fn intersect(&self, other: &Throws, program: &Program) -> Throws {
        let mut out = Throws {
            thrown_types: Vec::new(),
            can_throw_undeclared: self.can_throw_undeclared && other.can_throw_undeclared,
            inferred: self.inferred && other.inferred,
        };
        for &ty in &self.thrown_types {
            if other.covers(ty, program) {
                out.insert(ty, program);
            }
        }
        for &ty in &other.thrown_types {
            if self.covers(ty, program) {
                out.insert(ty, program);
            }
        }
        out
    }

    /// Remove the types a `catch (E)` clause handles.
    pub fn subtract(&self, caught: TypeId, program: &Program) -> Throws {
        Throws {
            thrown_types: self
                .thrown_types
                .iter()
                .copied()
                .filter(|&ty| !program.is_assignable_to(ty, caught))
                .collect(),
            can_throw_undeclared: self.can_throw_undeclared,
            inferred: self.inferred,
        }
    }

    pub fn display(&self, program: &Program) -> String {
        let mut out = String::from("{");
        for (i, &ty) in self.thrown_types.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&program.display_type(ty));
        }
        out.push('}');
        if self.can_throw_undeclared {
            out.push_str(" +undeclared");
        }
        out
    }
}
