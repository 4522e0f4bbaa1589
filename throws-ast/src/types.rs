//! Host type model and the subtype oracle interface.
//!
//! The checker never owns types; it sees `TypeId` handles and asks the
//! oracle questions (`is_assignable_to`, `is_exception_subtype`, display).
//! This store is the in-memory host used by the resolver's tests and by the
//! bootstrap host: nominal interface types over a class graph, structural
//! function types, futures, and type parameters.

use crate::element::ElementId;
use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque handle to a host type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }
}

/// Structure of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// The untyped top; assignable in both directions.
    Dynamic,
    Void,
    /// Bottom type.
    Never,
    /// Nominal type instantiating a class element.
    Interface { class: ElementId, args: Vec<TypeId> },
    /// Structural function type. Parameter types play no role in throws
    /// configurations, only the return type does.
    Function { return_type: TypeId },
    /// Unsubstituted generic parameter; contributes nothing and compares
    /// permissively.
    TypeParameter { name: Symbol },
}

/// A type: its structure, nullability, and the typedef it was written
/// through, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeData {
    pub kind: TypeKind,
    pub nullable: bool,
    pub alias: Option<ElementId>,
}

/// Interning store for types. Equal structures share a `TypeId`, so type
/// equality is id equality.
#[derive(Debug, Default)]
pub struct TypeStore {
    types: Vec<TypeData>,
    interned: HashMap<TypeData, TypeId>,
}

impl TypeStore {
    pub fn new() -> Self {
        TypeStore::default()
    }

    pub fn get(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.interned.get(&data) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(data.clone());
        self.interned.insert(data, id);
        id
    }

    pub fn dynamic(&mut self) -> TypeId {
        self.intern(TypeData { kind: TypeKind::Dynamic, nullable: true, alias: None })
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern(TypeData { kind: TypeKind::Void, nullable: true, alias: None })
    }

    pub fn never(&mut self) -> TypeId {
        self.intern(TypeData { kind: TypeKind::Never, nullable: false, alias: None })
    }

    pub fn interface(&mut self, class: ElementId, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeData {
            kind: TypeKind::Interface { class, args },
            nullable: false,
            alias: None,
        })
    }

    pub fn function(&mut self, return_type: TypeId) -> TypeId {
        self.intern(TypeData {
            kind: TypeKind::Function { return_type },
            nullable: false,
            alias: None,
        })
    }

    pub fn type_parameter(&mut self, name: Symbol) -> TypeId {
        self.intern(TypeData {
            kind: TypeKind::TypeParameter { name },
            nullable: false,
            alias: None,
        })
    }

    /// Nullable variant of an existing type.
    pub fn nullable(&mut self, id: TypeId) -> TypeId {
        let mut data = self.get(id).clone();
        data.nullable = true;
        self.intern(data)
    }

    /// The same type tagged with the typedef element it was written through.
    pub fn with_alias(&mut self, id: TypeId, alias: ElementId) -> TypeId {
        let mut data = self.get(id).clone();
        data.alias = Some(alias);
        self.intern(data)
    }

    pub fn alias_of(&self, id: TypeId) -> Option<ElementId> {
        self.get(id).alias
    }

    pub fn is_nullable(&self, id: TypeId) -> bool {
        self.get(id).nullable
    }

    pub fn is_dynamic(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Dynamic)
    }

    pub fn class_of(&self, id: TypeId) -> Option<ElementId> {
        match &self.get(id).kind {
            TypeKind::Interface { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn interface_args(&self, id: TypeId) -> &[TypeId] {
        match &self.get(id).kind {
            TypeKind::Interface { args, .. } => args,
            _ => &[],
        }
    }

    pub fn function_return(&self, id: TypeId) -> Option<TypeId> {
        match &self.get(id).kind {
            TypeKind::Function { return_type } => Some(*return_type),
            _ => None,
        }
    }
}
