//! Program elements: libraries, classes, executables, variables, typedefs.
//!
//! Elements form the semantic graph the resolver runs over. Each element has
//! a stable `ElementLocation` (library URI plus dotted path) used as the key
//! in caches and override tables.

use crate::ast::NodeId;
use crate::span::Span;
use crate::symbol::{well_known, Symbol};
use crate::types::TypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u32);

impl ElementId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        ElementId(raw)
    }
}

/// Throws-discipline markers read from element metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Annotation {
    /// May throw any Error but no undeclared Exception.
    Safe,
    /// May throw nothing at all, Errors included.
    NeverThrows,
    /// May throw the given Exception subtype; disables undeclared Errors.
    Throws(TypeId),
    /// May throw the given type in addition to undeclared Errors.
    ThrowsError(TypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutableKind {
    Function,
    Method,
    Getter,
    Setter,
    Constructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Field,
    TopLevel,
    Parameter,
    Local,
}

/// Class declaration: supertype edges and members.
#[derive(Debug, Clone, Default)]
pub struct ClassElement {
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub mixins: Vec<TypeId>,
    /// Mixin superclass constraints (`on` clauses).
    pub on_constraints: Vec<TypeId>,
    pub members: Vec<ElementId>,
    pub type_params: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct ExecutableElement {
    pub kind: ExecutableKind,
    pub is_static: bool,
    pub is_async: bool,
    pub is_synthetic: bool,
    pub return_type: TypeId,
    pub params: Vec<ElementId>,
    pub body: Option<NodeId>,
    /// Backing field of a synthetic property accessor.
    pub field: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct VariableElement {
    pub kind: VariableKind,
    pub is_late: bool,
    pub is_static: bool,
    pub declared_type: Option<TypeId>,
    pub initializer: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Library { uri: Symbol },
    Class(ClassElement),
    Executable(ExecutableElement),
    Variable(VariableElement),
    TypeAlias { aliased: TypeId },
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: Symbol,
    pub span: Span,
    pub enclosing: Option<ElementId>,
    pub metadata: Vec<Annotation>,
    pub kind: ElementKind,
}

impl Element {
    pub fn as_executable(&self) -> Option<&ExecutableElement> {
        match &self.kind {
            ElementKind::Executable(exec) => Some(exec),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableElement> {
        match &self.kind {
            ElementKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassElement> {
        match &self.kind {
            ElementKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Private names only match within their own library.
    pub fn is_private(&self) -> bool {
        self.name.as_str().starts_with('_')
    }
}

/// Stable identity of an element: library URI plus dotted path. Default
/// constructors render as `new`, positional parameters as `$n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementLocation {
    pub library: Symbol,
    pub path: Vec<Symbol>,
}

impl ElementLocation {
    pub fn new(library: Symbol, path: Vec<Symbol>) -> Self {
        ElementLocation { library, path }
    }

    /// Parse the dotted element path of an override record.
    pub fn parse(library: &str, element: &str) -> Self {
        ElementLocation {
            library: Symbol::intern(library),
            path: element.split('.').map(Symbol::intern).collect(),
        }
    }
}

impl fmt::Display for ElementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::", self.library)?;
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Arena of elements.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: Vec<Element>,
}

impl ElementStore {
    pub fn new() -> Self {
        ElementStore::default()
    }

    pub fn alloc(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> {
        (0..self.elements.len() as u32).map(ElementId)
    }

    /// Library an element is declared in.
    pub fn library_of(&self, mut id: ElementId) -> Option<ElementId> {
        loop {
            let element = self.get(id);
            if matches!(element.kind, ElementKind::Library { .. }) {
                return Some(id);
            }
            id = element.enclosing?;
        }
    }

    /// Compute an element's stable location by walking its enclosing chain.
    /// Positional parameters contribute `$n`, default constructors `new`.
    pub fn location_of(&self, id: ElementId) -> ElementLocation {
        let element = self.get(id);
        if let ElementKind::Library { uri } = element.kind {
            return ElementLocation::new(uri, Vec::new());
        }
        let enclosing = match element.enclosing {
            Some(enclosing) => enclosing,
            None => return ElementLocation::new(element.name, Vec::new()),
        };
        let mut location = self.location_of(enclosing);
        let segment = match (&element.kind, &self.get(enclosing).kind) {
            (ElementKind::Variable(var), ElementKind::Executable(owner))
                if var.kind == VariableKind::Parameter =>
            {
                let index = owner.params.iter().position(|&p| p == id).unwrap_or(0);
                Symbol::intern(&format!("${index}"))
            }
            (ElementKind::Executable(exec), _)
                if exec.kind == ExecutableKind::Constructor
                    && element.name.as_str().is_empty() =>
            {
                well_known::new_ctor()
            }
            _ => element.name,
        };
        location.path.push(segment);
        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn bare(name: &str, enclosing: Option<ElementId>, kind: ElementKind) -> Element {
        Element {
            name: Symbol::intern(name),
            span: Span::synthetic(),
            enclosing,
            metadata: Vec::new(),
            kind,
        }
    }

    #[test]
    fn location_walks_the_enclosing_chain() {
        let mut store = ElementStore::new();
        let lib = store.alloc(bare(
            "lib",
            None,
            ElementKind::Library { uri: Symbol::intern("package:demo/demo.dart") },
        ));
        let class = store.alloc(bare("Outer", Some(lib), ElementKind::Class(ClassElement::default())));
        let method = store.alloc(bare(
            "run",
            Some(class),
            ElementKind::Executable(ExecutableElement {
                kind: ExecutableKind::Method,
                is_static: false,
                is_async: false,
                is_synthetic: false,
                return_type: crate::types::TypeStore::new().dynamic(),
                params: Vec::new(),
                body: None,
                field: None,
            }),
        ));

        let location = store.location_of(method);
        assert_eq!(location.to_string(), "package:demo/demo.dart::Outer.run");
    }

    #[test]
    fn parameters_render_positionally() {
        let mut types = crate::types::TypeStore::new();
        let dynamic = types.dynamic();

        let mut store = ElementStore::new();
        let lib = store.alloc(bare(
            "lib",
            None,
            ElementKind::Library { uri: Symbol::intern("package:demo/demo.dart") },
        ));
        let func = store.alloc(bare(
            "f",
            Some(lib),
            ElementKind::Executable(ExecutableElement {
                kind: ExecutableKind::Function,
                is_static: false,
                is_async: false,
                is_synthetic: false,
                return_type: dynamic,
                params: Vec::new(),
                body: None,
                field: None,
            }),
        ));
        let param = store.alloc(bare(
            "callback",
            Some(func),
            ElementKind::Variable(VariableElement {
                kind: VariableKind::Parameter,
                is_late: false,
                is_static: false,
                declared_type: Some(dynamic),
                initializer: None,
            }),
        ));
        if let ElementKind::Executable(exec) = &mut store.get_mut(func).kind {
            exec.params.push(param);
        }

        assert_eq!(
            store.location_of(param).to_string(),
            "package:demo/demo.dart::f.$0"
        );
    }

    #[test]
    fn unnamed_constructors_render_as_new() {
        let mut types = crate::types::TypeStore::new();
        let dynamic = types.dynamic();

        let mut store = ElementStore::new();
        let lib = store.alloc(bare(
            "lib",
            None,
            ElementKind::Library { uri: Symbol::intern("package:demo/demo.dart") },
        ));
        let class = store.alloc(bare("Outer", Some(lib), ElementKind::Class(ClassElement::default())));
        let ctor = store.alloc(bare(
            "",
            Some(class),
            ElementKind::Executable(ExecutableElement {
                kind: ExecutableKind::Constructor,
                is_static: false,
                is_async: false,
                is_synthetic: true,
                return_type: dynamic,
                params: Vec::new(),
                body: None,
                field: None,
            }),
        ));

        assert_eq!(
            store.location_of(ctor).to_string(),
            "package:demo/demo.dart::Outer.new"
        );
    }

    #[test]
    fn parse_round_trips_display() {
        let location = ElementLocation::parse("dart:core", "int.parse");
        assert_eq!(location.to_string(), "dart:core::int.parse");
        assert_eq!(location.path.len(), 2);
    }
}
