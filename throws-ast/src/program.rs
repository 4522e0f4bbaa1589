//! The resolved program a checker session runs over.
//!
//! `Program` bundles the type store, the element graph and the AST arena,
//! and answers the oracle questions the checker asks about types. It also
//! carries the builder API hosts use to assemble programs, and seeds the
//! core libraries every program starts from.

use crate::ast::{AstArena, ExprKind, NodeId, NodeKind, StmtKind};
use crate::element::{
    ClassElement, Element, ElementId, ElementKind, ElementStore, ExecutableElement,
    ExecutableKind, VariableElement, VariableKind,
};
use crate::span::Span;
use crate::symbol::{well_known, Symbol};
use crate::types::{TypeId, TypeKind, TypeStore};
use crate::Annotation;
use std::collections::{HashMap, HashSet, VecDeque};

/// Pre-built handles into the seeded core libraries.
#[derive(Debug, Clone, Copy)]
pub struct CoreTypes {
    pub object_class: ElementId,
    pub function_class: ElementId,
    pub exception_class: ElementId,
    pub error_class: ElementId,
    pub future_class: ElementId,
    pub future_or_class: ElementId,
    pub object: TypeId,
    pub nullable_object: TypeId,
    pub exception: TypeId,
    pub error: TypeId,
    pub type_error: TypeId,
    pub no_such_method_error: TypeId,
    pub state_error: TypeId,
    pub format_exception: TypeId,
}

#[derive(Debug)]
pub struct Program {
    pub types: TypeStore,
    pub elements: ElementStore,
    pub ast: AstArena,
    core: CoreTypes,
    libraries: HashMap<Symbol, ElementId>,
    classes_by_name: HashMap<(Symbol, Symbol), ElementId>,
    /// Body root (or initializer root) to its owning element.
    body_owner: HashMap<NodeId, ElementId>,
    /// Function-expression node to the parameter it flows into.
    static_parameter: HashMap<NodeId, ElementId>,
}

impl Program {
    /// An empty program with `dart:core` and `dart:async` seeded.
    pub fn new() -> Self {
        let mut program = Program {
            types: TypeStore::new(),
            elements: ElementStore::new(),
            ast: AstArena::new(),
            // Placeholder indices, replaced by `seed_core` below.
            core: CoreTypes {
                object_class: ElementId::from_raw(0),
                function_class: ElementId::from_raw(0),
                exception_class: ElementId::from_raw(0),
                error_class: ElementId::from_raw(0),
                future_class: ElementId::from_raw(0),
                future_or_class: ElementId::from_raw(0),
                object: TypeId::from_raw(0),
                nullable_object: TypeId::from_raw(0),
                exception: TypeId::from_raw(0),
                error: TypeId::from_raw(0),
                type_error: TypeId::from_raw(0),
                no_such_method_error: TypeId::from_raw(0),
                state_error: TypeId::from_raw(0),
                format_exception: TypeId::from_raw(0),
            },
            libraries: HashMap::new(),
            classes_by_name: HashMap::new(),
            body_owner: HashMap::new(),
            static_parameter: HashMap::new(),
        };
        program.seed_core();
        program
    }

    fn seed_core(&mut self) {
        let core = self.add_library("dart:core");
        let object_class = self.add_class(core, "Object");
        let function_class = self.add_class(core, "Function");
        let exception_class = self.add_class(core, "Exception");
        let error_class = self.add_class(core, "Error");
        let argument_error = self.add_class(core, "ArgumentError");
        let state_error = self.add_class(core, "StateError");
        let type_error = self.add_class(core, "TypeError");
        let no_such_method_error = self.add_class(core, "NoSuchMethodError");
        let format_exception = self.add_class(core, "FormatException");
        self.add_class(core, "String");
        self.add_class(core, "bool");
        self.add_class(core, "int");
        self.add_class(core, "double");

        let error_ty = self.types.interface(error_class, Vec::new());
        self.set_superclass(argument_error, error_ty);
        self.set_superclass(state_error, error_ty);
        self.set_superclass(type_error, error_ty);
        self.set_superclass(no_such_method_error, error_ty);
        let exception_ty = self.types.interface(exception_class, Vec::new());
        self.add_interface(format_exception, exception_ty);

        let asynclib = self.add_library("dart:async");
        let future_class = self.add_class_with_params(asynclib, "Future", &["T"]);
        let future_or_class = self.add_class_with_params(asynclib, "FutureOr", &["T"]);

        let object = self.types.interface(object_class, Vec::new());
        self.core = CoreTypes {
            object_class,
            function_class,
            exception_class,
            error_class,
            future_class,
            future_or_class,
            object,
            nullable_object: self.types.nullable(object),
            exception: exception_ty,
            error: error_ty,
            type_error: self.types.interface(type_error, Vec::new()),
            no_such_method_error: self.types.interface(no_such_method_error, Vec::new()),
            state_error: self.types.interface(state_error, Vec::new()),
            format_exception: self.types.interface(format_exception, Vec::new()),
        };
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    // ----- element builders -----

    pub fn add_library(&mut self, uri: &str) -> ElementId {
        let uri = Symbol::intern(uri);
        let id = self.elements.alloc(Element {
            name: uri,
            span: Span::synthetic(),
            enclosing: None,
            metadata: Vec::new(),
            kind: ElementKind::Library { uri },
        });
        self.libraries.insert(uri, id);
        id
    }

    pub fn add_class(&mut self, library: ElementId, name: &str) -> ElementId {
        self.add_class_with_params(library, name, &[])
    }

    pub fn add_class_with_params(
        &mut self,
        library: ElementId,
        name: &str,
        type_params: &[&str],
    ) -> ElementId {
        let name = Symbol::intern(name);
        let id = self.elements.alloc(Element {
            name,
            span: Span::synthetic(),
            enclosing: Some(library),
            metadata: Vec::new(),
            kind: ElementKind::Class(ClassElement {
                type_params: type_params.iter().map(|p| Symbol::intern(p)).collect(),
                ..ClassElement::default()
            }),
        });
        if let ElementKind::Library { uri } = self.elements.get(library).kind {
            self.classes_by_name.insert((uri, name), id);
        }
        id
    }

    fn class_mut(&mut self, class: ElementId) -> &mut ClassElement {
        match &mut self.elements.get_mut(class).kind {
            ElementKind::Class(data) => data,
            _ => panic!("not a class element"),
        }
    }

    pub fn set_superclass(&mut self, class: ElementId, ty: TypeId) {
        self.class_mut(class).superclass = Some(ty);
    }

    pub fn add_interface(&mut self, class: ElementId, ty: TypeId) {
        self.class_mut(class).interfaces.push(ty);
    }

    pub fn add_mixin(&mut self, class: ElementId, ty: TypeId) {
        self.class_mut(class).mixins.push(ty);
    }

    pub fn add_on_constraint(&mut self, class: ElementId, ty: TypeId) {
        self.class_mut(class).on_constraints.push(ty);
    }

    pub fn add_executable(
        &mut self,
        enclosing: ElementId,
        name: &str,
        kind: ExecutableKind,
        return_type: TypeId,
    ) -> ElementId {
        let id = self.elements.alloc(Element {
            name: Symbol::intern(name),
            span: Span::synthetic(),
            enclosing: Some(enclosing),
            metadata: Vec::new(),
            kind: ElementKind::Executable(ExecutableElement {
                kind,
                is_static: false,
                is_async: false,
                is_synthetic: false,
                return_type,
                params: Vec::new(),
                body: None,
                field: None,
            }),
        });
        if matches!(self.elements.get(enclosing).kind, ElementKind::Class(_)) {
            self.class_mut(enclosing).members.push(id);
        }
        id
    }

    /// Synthetic accessor forwarding to a field declaration.
    pub fn add_synthetic_accessor(
        &mut self,
        class: ElementId,
        field: ElementId,
        kind: ExecutableKind,
    ) -> ElementId {
        let (name, return_type) = {
            let field_element = self.elements.get(field);
            let ty = field_element
                .as_variable()
                .and_then(|v| v.declared_type)
                .unwrap_or(self.core.object);
            (field_element.name, ty)
        };
        let id = self.add_executable(class, name.as_str(), kind, return_type);
        if let ElementKind::Executable(exec) = &mut self.elements.get_mut(id).kind {
            exec.is_synthetic = true;
            exec.field = Some(field);
        }
        id
    }

    /// Synthetic unnamed default constructor. Its element location renders
    /// the `new` segment.
    pub fn add_default_constructor(&mut self, class: ElementId) -> ElementId {
        let class_ty = self.types.interface(class, Vec::new());
        let id = self.add_executable(class, "", ExecutableKind::Constructor, class_ty);
        if let ElementKind::Executable(exec) = &mut self.elements.get_mut(id).kind {
            exec.is_synthetic = true;
        }
        id
    }

    pub fn add_parameter(
        &mut self,
        executable: ElementId,
        name: &str,
        declared_type: Option<TypeId>,
    ) -> ElementId {
        let id = self.elements.alloc(Element {
            name: Symbol::intern(name),
            span: Span::synthetic(),
            enclosing: Some(executable),
            metadata: Vec::new(),
            kind: ElementKind::Variable(VariableElement {
                kind: VariableKind::Parameter,
                is_late: false,
                is_static: false,
                declared_type,
                initializer: None,
            }),
        });
        if let ElementKind::Executable(exec) = &mut self.elements.get_mut(executable).kind {
            exec.params.push(id);
        }
        id
    }

    pub fn add_variable(
        &mut self,
        enclosing: ElementId,
        name: &str,
        kind: VariableKind,
        declared_type: Option<TypeId>,
    ) -> ElementId {
        let id = self.elements.alloc(Element {
            name: Symbol::intern(name),
            span: Span::synthetic(),
            enclosing: Some(enclosing),
            metadata: Vec::new(),
            kind: ElementKind::Variable(VariableElement {
                kind,
                is_late: false,
                is_static: false,
                declared_type,
                initializer: None,
            }),
        });
        if kind == VariableKind::Field {
            if matches!(self.elements.get(enclosing).kind, ElementKind::Class(_)) {
                self.class_mut(enclosing).members.push(id);
            }
        }
        id
    }

    pub fn add_type_alias(&mut self, library: ElementId, name: &str, aliased: TypeId) -> ElementId {
        self.elements.alloc(Element {
            name: Symbol::intern(name),
            span: Span::synthetic(),
            enclosing: Some(library),
            metadata: Vec::new(),
            kind: ElementKind::TypeAlias { aliased },
        })
    }

    pub fn add_annotation(&mut self, element: ElementId, annotation: Annotation) {
        self.elements.get_mut(element).metadata.push(annotation);
    }

    pub fn set_async(&mut self, element: ElementId) {
        if let ElementKind::Executable(exec) = &mut self.elements.get_mut(element).kind {
            exec.is_async = true;
        }
    }

    pub fn set_static(&mut self, element: ElementId) {
        match &mut self.elements.get_mut(element).kind {
            ElementKind::Executable(exec) => exec.is_static = true,
            ElementKind::Variable(var) => var.is_static = true,
            _ => {}
        }
    }

    pub fn set_late(&mut self, element: ElementId) {
        if let ElementKind::Variable(var) = &mut self.elements.get_mut(element).kind {
            var.is_late = true;
        }
    }

    pub fn set_element_span(&mut self, element: ElementId, span: Span) {
        self.elements.get_mut(element).span = span;
    }

    pub fn set_body(&mut self, executable: ElementId, body: NodeId) {
        if let ElementKind::Executable(exec) = &mut self.elements.get_mut(executable).kind {
            exec.body = Some(body);
        }
        self.body_owner.insert(body, executable);
    }

    pub fn set_initializer(&mut self, variable: ElementId, initializer: NodeId) {
        if let ElementKind::Variable(var) = &mut self.elements.get_mut(variable).kind {
            var.initializer = Some(initializer);
        }
        self.body_owner.insert(initializer, variable);
    }

    // ----- AST builders -----

    pub fn expr(&mut self, kind: ExprKind, span: Span) -> NodeId {
        self.ast.alloc(NodeKind::Expr(kind), span)
    }

    pub fn stmt(&mut self, kind: StmtKind, span: Span) -> NodeId {
        self.ast.alloc(NodeKind::Stmt(kind), span)
    }

    pub fn block(&mut self, statements: Vec<NodeId>, span: Span) -> NodeId {
        self.stmt(StmtKind::Block { statements }, span)
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        let span = self.ast.span(expr);
        self.stmt(StmtKind::Expression { expr }, span)
    }

    /// Record that a function literal flows into a parameter.
    pub fn set_static_parameter(&mut self, node: NodeId, param: ElementId) {
        self.static_parameter.insert(node, param);
    }

    pub fn static_parameter_of(&self, node: NodeId) -> Option<ElementId> {
        self.static_parameter.get(&node).copied()
    }

    /// Owner of `node` when the node itself is a body or initializer root.
    pub fn body_root_owner(&self, node: NodeId) -> Option<ElementId> {
        self.body_owner.get(&node).copied()
    }

    /// Element owning the body or initializer this node sits in.
    pub fn owner_of(&self, node: NodeId) -> Option<ElementId> {
        let mut current = node;
        loop {
            if let Some(&owner) = self.body_owner.get(&current) {
                return Some(owner);
            }
            current = self.ast.parent(current)?;
        }
    }

    pub fn body_roots(&self) -> impl Iterator<Item = (NodeId, ElementId)> + '_ {
        self.body_owner.iter().map(|(&n, &e)| (n, e))
    }

    // ----- lookups -----

    pub fn library_named(&self, uri: Symbol) -> Option<ElementId> {
        self.libraries.get(&uri).copied()
    }

    pub fn class_named(&self, library_uri: Symbol, name: Symbol) -> Option<ElementId> {
        self.classes_by_name.get(&(library_uri, name)).copied()
    }

    // ----- type oracle -----

    /// Covariant assignability in the host type system.
    pub fn is_assignable_to(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        let s = self.types.get(sub).clone();
        let p = self.types.get(sup).clone();
        if matches!(p.kind, TypeKind::Dynamic | TypeKind::Void) {
            return true;
        }
        if matches!(s.kind, TypeKind::Dynamic | TypeKind::Never) {
            return true;
        }
        if s.nullable && !p.nullable {
            return false;
        }
        match (&s.kind, &p.kind) {
            (
                TypeKind::Interface { class: sc, args: sa },
                TypeKind::Interface { class: pc, args: pa },
            ) => {
                if *pc == self.core.object_class {
                    return true;
                }
                self.interface_assignable(*sc, sa, *pc, pa)
            }
            (TypeKind::Function { return_type: sr }, TypeKind::Function { return_type: pr }) => {
                self.is_assignable_to(*sr, *pr)
            }
            (TypeKind::Function { .. }, TypeKind::Interface { class: pc, .. }) => {
                *pc == self.core.object_class || *pc == self.core.function_class
            }
            (TypeKind::TypeParameter { .. }, _) | (_, TypeKind::TypeParameter { .. }) => true,
            _ => false,
        }
    }

    fn interface_assignable(
        &self,
        sub_class: ElementId,
        sub_args: &[TypeId],
        sup_class: ElementId,
        sup_args: &[TypeId],
    ) -> bool {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        queue.push_back((sub_class, sub_args.to_vec()));
        while let Some((class, args)) = queue.pop_front() {
            if !seen.insert(class) {
                continue;
            }
            if class == sup_class {
                if args.len() == sup_args.len() {
                    return args
                        .iter()
                        .zip(sup_args)
                        .all(|(&a, &b)| self.is_assignable_to(a, b));
                }
                return true;
            }
            for edge in self.supertype_edges(class) {
                if let TypeKind::Interface { class: edge_class, args: edge_args } =
                    &self.types.get(edge).kind
                {
                    let substituted = edge_args
                        .iter()
                        .map(|&a| self.substitute_param(a, class, &args))
                        .collect();
                    queue.push_back((*edge_class, substituted));
                }
            }
        }
        false
    }

    /// Substitute a top-level type parameter through an instantiation.
    /// Nested occurrences compare permissively anyway.
    fn substitute_param(&self, ty: TypeId, class: ElementId, args: &[TypeId]) -> TypeId {
        if let TypeKind::TypeParameter { name } = &self.types.get(ty).kind {
            if let Some(class_data) = self.elements.get(class).as_class() {
                if let Some(index) = class_data.type_params.iter().position(|p| p == name) {
                    if let Some(&actual) = args.get(index) {
                        return actual;
                    }
                }
            }
        }
        ty
    }

    /// Classes named by the direct supertype edges: superclass, interfaces,
    /// mixins, and mixin superclass constraints.
    pub fn supertype_classes(&self, class: ElementId) -> Vec<ElementId> {
        self.supertype_edges(class)
            .into_iter()
            .filter_map(|edge| self.types.class_of(edge))
            .collect()
    }

    fn supertype_edges(&self, class: ElementId) -> Vec<TypeId> {
        match self.elements.get(class).as_class() {
            Some(data) => {
                let mut edges = Vec::new();
                edges.extend(data.superclass);
                edges.extend(data.interfaces.iter().copied());
                edges.extend(data.mixins.iter().copied());
                edges.extend(data.on_constraints.iter().copied());
                edges
            }
            None => Vec::new(),
        }
    }

    /// Is the type in the subtree rooted at `Exception`? Thrown values
    /// outside that subtree are Errors.
    pub fn is_exception_subtype(&self, ty: TypeId) -> bool {
        let Some(class) = self.types.class_of(ty) else {
            return false;
        };
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        queue.push_back(class);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if current == self.core.exception_class {
                return true;
            }
            for edge in self.supertype_edges(current) {
                if let Some(edge_class) = self.types.class_of(edge) {
                    queue.push_back(edge_class);
                }
            }
        }
        false
    }

    /// `dynamic` or `Object?`: a cast to these cannot fail.
    pub fn is_top_type(&self, ty: TypeId) -> bool {
        if self.types.is_dynamic(ty) {
            return true;
        }
        self.types.class_of(ty) == Some(self.core.object_class) && self.types.is_nullable(ty)
    }

    /// Value type of `Future<U>` / `FutureOr<U>`.
    pub fn future_value_type(&self, ty: TypeId) -> Option<TypeId> {
        let class = self.types.class_of(ty)?;
        if class == self.core.future_class || class == self.core.future_or_class {
            Some(self.types.interface_args(ty).first().copied().unwrap_or(ty))
        } else {
            None
        }
    }

    /// Non-static instance `call` method of a structural callable type.
    pub fn call_method_of(&self, ty: TypeId) -> Option<ElementId> {
        let class = self.types.class_of(ty)?;
        let class_data = self.elements.get(class).as_class()?;
        class_data.members.iter().copied().find(|&member| {
            let element = self.elements.get(member);
            element.name == well_known::call()
                && element
                    .as_executable()
                    .is_some_and(|exec| exec.kind == ExecutableKind::Method && !exec.is_static)
        })
    }

    pub fn display_type(&self, ty: TypeId) -> String {
        let data = self.types.get(ty);
        let mut text = match &data.kind {
            TypeKind::Dynamic => "dynamic".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Never => "Never".to_string(),
            TypeKind::Interface { class, args } => {
                let mut out = self.elements.get(*class).name.as_str().to_string();
                if !args.is_empty() {
                    out.push('<');
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.display_type(arg));
                    }
                    out.push('>');
                }
                out
            }
            TypeKind::Function { return_type } => {
                format!("{} Function()", self.display_type(*return_type))
            }
            TypeKind::TypeParameter { name } => name.as_str().to_string(),
        };
        if data.nullable && !matches!(data.kind, TypeKind::Dynamic | TypeKind::Void) {
            text.push('?');
        }
        text
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_and_error_are_disjoint_subtrees() {
        let program = Program::new();
        let core = *program.core();
        assert!(program.is_exception_subtype(core.exception));
        assert!(program.is_exception_subtype(core.format_exception));
        assert!(!program.is_exception_subtype(core.error));
        assert!(!program.is_exception_subtype(core.state_error));
        assert!(!program.is_exception_subtype(core.object));
    }

    #[test]
    fn nominal_subtyping_walks_interfaces() {
        let program = Program::new();
        let core = *program.core();
        assert!(program.is_assignable_to(core.format_exception, core.exception));
        assert!(!program.is_assignable_to(core.exception, core.format_exception));
        assert!(program.is_assignable_to(core.state_error, core.error));
        assert!(program.is_assignable_to(core.state_error, core.object));
    }

    #[test]
    fn futures_are_covariant() {
        let mut program = Program::new();
        let core = *program.core();
        let future_of_fmt = program
            .types
            .interface(core.future_class, vec![core.format_exception]);
        let future_of_exc = program.types.interface(core.future_class, vec![core.exception]);
        assert!(program.is_assignable_to(future_of_fmt, future_of_exc));
        assert!(!program.is_assignable_to(future_of_exc, future_of_fmt));
        assert_eq!(program.future_value_type(future_of_exc), Some(core.exception));
        assert_eq!(program.future_value_type(core.exception), None);
    }

    #[test]
    fn nullability_blocks_assignment_to_non_null() {
        let mut program = Program::new();
        let core = *program.core();
        let nullable_exception = program.types.nullable(core.exception);
        assert!(!program.is_assignable_to(nullable_exception, core.exception));
        assert!(program.is_assignable_to(core.exception, nullable_exception));
        assert!(program.is_top_type(core.nullable_object));
        assert!(!program.is_top_type(core.object));
    }

    #[test]
    fn structural_callable_is_found() {
        let mut program = Program::new();
        let core = *program.core();
        let lib = program.add_library("package:demo/demo.dart");
        let class = program.add_class(lib, "Greeter");
        let call = program.add_executable(class, "call", ExecutableKind::Method, core.object);
        let class_ty = program.types.interface(class, Vec::new());
        assert_eq!(program.call_method_of(class_ty), Some(call));
        assert_eq!(program.call_method_of(core.object), None);
    }

    #[test]
    fn display_renders_generics_and_nullability() {
        let mut program = Program::new();
        let core = *program.core();
        let future = program.types.interface(core.future_class, vec![core.exception]);
        assert_eq!(program.display_type(future), "Future<Exception>");
        let nullable = program.types.nullable(core.exception);
        assert_eq!(program.display_type(nullable), "Exception?");
    }
}
