//! The variable namespace: named storage locations and their structure.
//!
//! Variables form a forest. A root is a top-level signal or register; a
//! [`VarKind::Field`] is a named member of a struct-typed parent; a
//! [`VarKind::Slice`] is a bit window `parent[lo:hi]` (`hi` exclusive).
//! Structural connections between variables are recorded here and resolved
//! into shared storage by [`StorageLayout`](crate::alias::StorageLayout).

use tempo_common::{ContentHash, ContentHasher, Ident, Interner};

use crate::arena::Arena;
use crate::ids::VarId;

/// Widest value a single variable can hold.
pub const MAX_WIDTH: u32 = 64;

/// Declared type of a variable.
///
/// Two tags are the same type only if both the display name and the layout
/// hash match. A struct's layout hash covers its field names and field types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeTag {
    /// Display name, e.g. `Bits8` or `SomeMsg`.
    pub name: Ident,
    /// Hash of the type's structure.
    pub layout: ContentHash,
}

impl TypeTag {
    /// The plain bit-vector type of the given width.
    pub fn bits(interner: &Interner, width: u32) -> Self {
        Self {
            name: interner.get_or_intern(&format!("Bits{width}")),
            layout: ContentHash::from_bytes(format!("bits:{width}").as_bytes()),
        }
    }

    /// A struct type with the given name and ordered fields.
    pub fn structure(interner: &Interner, name: &str, fields: &[(&str, TypeTag)]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(name.as_bytes());
        for (field, ty) in fields {
            hasher.update(b"\0");
            hasher.update(field.as_bytes());
            hasher.update(b":");
            hasher.update(interner.resolve(ty.name).as_bytes());
            hasher.update(format!("{}", ty.layout).as_bytes());
        }
        Self {
            name: interner.get_or_intern(name),
            layout: hasher.finish(),
        }
    }
}

/// Structural position of a variable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VarKind {
    /// A top-level signal, wire, or register.
    Root,
    /// A named member of a struct-typed parent.
    Field {
        /// The enclosing variable.
        parent: VarId,
    },
    /// The bit window `parent[lo:hi]`.
    Slice {
        /// The sliced variable.
        parent: VarId,
        /// Lowest bit, inclusive.
        lo: u32,
        /// Highest bit, exclusive.
        hi: u32,
    },
}

/// A declared variable.
#[derive(Clone, Debug)]
pub struct Variable {
    /// This variable's ID.
    pub id: VarId,
    /// Full hierarchical path, e.g. `top.msg.a` or `top.x[0:8]`.
    pub path: Ident,
    /// Last path segment (field name, root name, or the slice suffix).
    pub name: Ident,
    /// Structural position.
    pub kind: VarKind,
    /// Declared type.
    pub ty: TypeTag,
    /// Bit width, 1..=64.
    pub width: u32,
    /// Value the variable holds before the first cycle.
    pub init: u64,
}

impl Variable {
    /// Returns the structural parent, if any.
    pub fn parent(&self) -> Option<VarId> {
        match self.kind {
            VarKind::Root => None,
            VarKind::Field { parent } | VarKind::Slice { parent, .. } => Some(parent),
        }
    }
}

/// All variables of a design plus the structural connections between them.
#[derive(Clone, Debug, Default)]
pub struct VarTable {
    vars: Arena<VarId, Variable>,
    children: Vec<Vec<VarId>>,
    connections: Vec<(VarId, VarId)>,
}

impl VarTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, assigning its ID. The `id` field of `var` is ignored.
    ///
    /// No validation happens here; widths, slice bounds, and parent
    /// references are checked when the storage layout is built.
    pub fn add(&mut self, mut var: Variable) -> VarId {
        let id = self.vars.alloc_with(|id| {
            var.id = id;
            var
        });
        if let Some(parent) = self.vars[id].parent() {
            if let Some(siblings) = self.children.get_mut(parent.index()) {
                siblings.push(id);
            }
        }
        self.children.push(Vec::new());
        id
    }

    /// Records a structural connection: `a` and `b` name the same storage.
    pub fn connect(&mut self, a: VarId, b: VarId) {
        self.connections.push((a, b));
    }

    /// Returns the variable with the given ID.
    pub fn get(&self, id: VarId) -> &Variable {
        &self.vars[id]
    }

    /// Returns the variable with the given ID, or `None` if unknown.
    pub fn try_get(&self, id: VarId) -> Option<&Variable> {
        self.vars.try_get(id)
    }

    /// Returns `true` if the ID belongs to this table.
    pub fn contains(&self, id: VarId) -> bool {
        self.vars.contains(id)
    }

    /// Direct structural children (fields and slices) of a variable.
    pub fn children(&self, id: VarId) -> &[VarId] {
        self.children
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All recorded connections, in declaration order.
    pub fn connections(&self) -> &[(VarId, VarId)] {
        &self.connections
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variables are declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over all variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.values()
    }

    /// Returns `true` if `a` is `b` or one of `b`'s structural ancestors.
    ///
    /// This is the structural relation only; storage shared through
    /// connections is accounted for by the containment index.
    pub fn is_ancestor_or_equal(&self, a: VarId, b: VarId) -> bool {
        let mut cursor = Some(b);
        while let Some(current) = cursor {
            if current == a {
                return true;
            }
            cursor = self.try_get(current).and_then(Variable::parent);
        }
        false
    }

    /// Walks from `id` up to its root, starting with `id` itself.
    pub fn ancestors_or_self(&self, id: VarId) -> impl Iterator<Item = VarId> + '_ {
        std::iter::successors(Some(id), move |&v| self.try_get(v).and_then(Variable::parent))
    }

    /// Returns the root of the tree containing `id`.
    pub fn root_of(&self, id: VarId) -> VarId {
        self.ancestors_or_self(id).last().unwrap_or(id)
    }
}
