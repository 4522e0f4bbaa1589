//! Host program model for the checked-throws resolver.
//!
//! This crate is the interface the host parser and semantic resolver
//! produce: interned symbols, spans, a type store with the subtype oracle,
//! the element graph, and the expression/statement arena. The checker crate
//! consumes it read-only; tests and the bootstrap host build programs
//! through the `Program` builder API.

pub mod ast;
pub mod element;
pub mod program;
pub mod span;
pub mod symbol;
pub mod types;

pub use ast::{
    Argument, AstArena, CatchClause, ExprKind, LiteralValue, NodeId, NodeKind, StmtKind,
};
pub use element::{
    Annotation, ClassElement, Element, ElementId, ElementKind, ElementLocation, ElementStore,
    ExecutableElement, ExecutableKind, VariableElement, VariableKind,
};
pub use program::{CoreTypes, Program};
pub use span::{FileId, Span};
pub use symbol::{well_known, Symbol};
pub use types::{TypeId, TypeKind, TypeStore};
