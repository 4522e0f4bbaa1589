//! Recursive throw configurations and the lattice over them.
//!
//! A `Configuration` reads coinductively: `throws` is what evaluating the
//! expression may throw right now; `value[Invoke]` describes the value
//! obtained by calling it, `value[Await]` the value obtained by awaiting it.
//! A single configuration can carry both slots (a future of a function),
//! though typed code never produces that in one layer.

use crate::throws::Throws;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use throws_ast::{Program, TypeId};

/// How a value is promoted into a new value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PromotionKind {
    Invoke,
    Await,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub throws: Throws,
    pub value: BTreeMap<PromotionKind, Configuration>,
}

impl Configuration {
    pub fn empty() -> Self {
        Configuration { throws: Throws::empty(), value: BTreeMap::new() }
    }

    pub fn throws(throws: Throws) -> Self {
        Configuration { throws, value: BTreeMap::new() }
    }

    pub fn throws_exactly(ty: TypeId) -> Self {
        Configuration::throws(Throws::exactly(ty))
    }

    pub fn for_value(value: BTreeMap<PromotionKind, Configuration>) -> Self {
        Configuration { throws: Throws::empty(), value }
    }

    pub fn is_empty(&self) -> bool {
        self.throws.is_empty() && self.value.is_empty()
    }

    /// Merge of alternative paths (branches, multiple returns, multiple
    /// implementers). Value slots union where both define them and copy
    /// where only one does.
    pub fn union(&self, other: &Configuration, program: &Program) -> Configuration {
        let mut value = BTreeMap::new();
        for kind in [PromotionKind::Invoke, PromotionKind::Await] {
            match (self.value.get(&kind), other.value.get(&kind)) {
                (Some(a), Some(b)) => {
                    value.insert(kind, a.union(b, program));
                }
                (Some(one), None) | (None, Some(one)) => {
                    value.insert(kind, one.clone());
                }
                (None, None) => {}
            }
        }
        Configuration { throws: self.throws.union(&other.throws, program), value }
    }

    pub fn union_all(configurations: &[Configuration], program: &Program) -> Configuration {
        let mut iter = configurations.iter();
        let Some(first) = iter.next() else {
            return Configuration::empty();
        };
        iter.fold(first.clone(), |acc, c| acc.union(c, program))
    }

    /// Merge of simultaneous requirements (multiple overridden members).
    /// A value slot missing from either side is dropped.
    pub fn intersect(&self, other: &Configuration, program: &Program) -> Configuration {
        let mut value = BTreeMap::new();
        for kind in [PromotionKind::Invoke, PromotionKind::Await] {
            if let (Some(a), Some(b)) = (self.value.get(&kind), other.value.get(&kind)) {
                value.insert(kind, a.intersect(b, program));
            }
        }
        Configuration { throws: self.throws.intersect(&other.throws, program), value }
    }

    pub fn intersect_all(configurations: &[Configuration], program: &Program) -> Configuration {
        let mut iter = configurations.iter();
        let Some(first) = iter.next() else {
            return Configuration::empty();
        };
        iter.fold(first.clone(), |acc, c| acc.intersect(c, program))
    }

    /// Can a value with this configuration be placed into a location with
    /// `parameter`'s configuration?
    ///
    /// At `at_level > 0` the top-level `throws` is skipped: only the value is
    /// transferred, its evaluation already happened at the source site.
    /// Value slots are contravariant in presence: every slot the parameter
    /// promises must exist on the argument.
    pub fn is_compatible(
        &self,
        parameter: &Configuration,
        at_level: i32,
        program: &Program,
    ) -> bool {
        if at_level <= 0 {
            if self.throws.can_throw_undeclared && !parameter.throws.can_throw_undeclared {
                // A declared Object still admits everything.
                if !parameter.throws.covers(program.core().object, program) {
                    return false;
                }
            }
            for &thrown in &self.throws.thrown_types {
                if !parameter.throws.covers(thrown, program) {
                    return false;
                }
            }
        }
        for (kind, parameter_slot) in &parameter.value {
            match self.value.get(kind) {
                None => return false,
                Some(slot) => {
                    if !slot.is_compatible(parameter_slot, at_level - 1, program) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Merge configuration sources in precedence order: the first explicit
    /// (non-inferred) throws at each level wins; inferred ones union. Value
    /// slots merge pointwise.
    pub fn resolve(sources: &[Configuration], program: &Program) -> Configuration {
        let mut iter = sources.iter();
        let Some(first) = iter.next() else {
            return Configuration::empty();
        };
        iter.fold(first.clone(), |acc, c| acc.merge_preferring(c, program))
    }

    fn merge_preferring(&self, weaker: &Configuration, program: &Program) -> Configuration {
        let throws = if !self.throws.inferred {
            self.throws.clone()
        } else if !weaker.throws.inferred {
            weaker.throws.clone()
        } else {
            self.throws.union(&weaker.throws, program)
        };
        let mut value = BTreeMap::new();
        for kind in [PromotionKind::Invoke, PromotionKind::Await] {
            match (self.value.get(&kind), weaker.value.get(&kind)) {
                (Some(a), Some(b)) => {
                    value.insert(kind, a.merge_preferring(b, program));
                }
                (Some(one), None) | (None, Some(one)) => {
                    value.insert(kind, one.clone());
                }
                (None, None) => {}
            }
        }
        Configuration { throws, value }
    }

    pub fn display(&self, program: &Program) -> String {
        let mut out = self.throws.display(program);
        for (kind, inner) in &self.value {
            let label = match kind {
                PromotionKind::Invoke => "invoke",
                PromotionKind::Await => "await",
            };
            out.push_str(&format!(" {label}: ({})", inner.display(program)));
        }
        out
    }
}
