//! Checked-exceptions configuration resolver.
//!
//! The checker verifies a throws discipline declared through four markers
//! (`safe`, `neverThrows`, `Throws<E>`, `ThrowsError<E>`): bodies may only
//! throw what their element declares, assignments may only move values into
//! locations whose configuration admits them, and overrides must stay
//! compatible with the members they replace. Where annotations are absent
//! the configuration is inferred from bodies and initializers through a
//! fixed-point resolver over the cyclic element/AST graph.

pub mod annotations;
pub mod configuration;
pub mod diagnostics;
pub mod element_config;
pub mod expr_config;
pub mod lints;
pub mod overrides;
pub mod resolver;
pub mod throw_finder;
pub mod throws;
pub mod type_config;

pub use configuration::{Configuration, PromotionKind};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticReporter, Severity};
pub use element_config::equivalent_annotation_throws;
pub use lints::run_lints;
pub use overrides::{OverrideError, OverrideTable};
pub use resolver::{CancellationToken, ResolverSession};
pub use throws::Throws;

use throws_ast::Program;

/// Check a whole program with the packaged override defaults.
pub fn check_program(program: &mut Program) -> Vec<Diagnostic> {
    let mut overrides = OverrideTable::new();
    overrides.load_packaged_defaults(program);
    check_program_with_overrides(program, overrides)
}

/// Check a whole program with a caller-assembled override table.
pub fn check_program_with_overrides(
    program: &Program,
    overrides: OverrideTable,
) -> Vec<Diagnostic> {
    let mut session = ResolverSession::with_overrides(program, overrides);
    lints::run_lints(&mut session)
}
