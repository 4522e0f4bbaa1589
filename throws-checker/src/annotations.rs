//! Reads `safe` / `neverThrows` / `Throws<E>` / `ThrowsError<E>` markers
//! from element metadata into a `Throws` summary.

use crate::throws::Throws;
use throws_ast::{Annotation, Program};

/// Combine the recognized annotations on one element.
///
/// `neverThrows` wins outright. `safe` alone permits undeclared Errors and
/// no Exceptions. `ThrowsError<E>` adds `E` while keeping the undeclared
/// allowance; `Throws<E>` adds `E` and withdraws it. With no recognized
/// annotation the result is `Throws::empty()` with `inferred` set, which
/// callers treat as "no declaration".
pub fn read_throws(metadata: &[Annotation], program: &Program) -> Throws {
    let mut has_safe = false;
    let mut has_throws = false;
    let mut has_throws_error = false;
    let mut types = Vec::new();

    for annotation in metadata {
        match annotation {
            Annotation::NeverThrows => return Throws::explicit(false),
            Annotation::Safe => has_safe = true,
            Annotation::Throws(ty) => {
                has_throws = true;
                types.push(*ty);
            }
            Annotation::ThrowsError(ty) => {
                has_throws_error = true;
                types.push(*ty);
            }
        }
    }

    if !has_safe && !has_throws && !has_throws_error {
        return Throws::empty();
    }

    let mut throws = Throws::explicit(!has_throws);
    for ty in types {
        throws.insert(ty, program);
    }
    throws
}

/// Mixed marker kinds on one element. Accumulation still works (the reader
/// above takes whatever is present); a separate lint surfaces the conflict.
pub fn has_conflicting_annotations(metadata: &[Annotation]) -> bool {
    let safe = metadata.iter().any(|a| matches!(a, Annotation::Safe));
    let never = metadata.iter().any(|a| matches!(a, Annotation::NeverThrows));
    let declared = metadata
        .iter()
        .any(|a| matches!(a, Annotation::Throws(_) | Annotation::ThrowsError(_)));
    (safe && never) || ((safe || never) && declared)
}
