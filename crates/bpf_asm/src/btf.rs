//! Local Reference-Type Graph
//!
//! A minimal shadow description of the kernel structures a program reads.
//! Field-access relocations are checked against this graph at assembly time
//! and the loader matches it against the running kernel's own type
//! information at load time.
//!
//! Type ids start at 1; id 0 is reserved for `void` as in the kernel's type
//! format. Names are unique per graph: the first definition of a name wins
//! lookups, later ones are still reachable by id.

use std::collections::BTreeMap;

use itertools::Itertools;

/// Index of a type in a [`TypeGraph`].
pub type TypeId = u32;

/// Named member of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: TypeId,
    /// Byte offset from the start of the containing type.
    pub offset: u32,
}

impl Member {
    pub fn new(name: &str, ty: TypeId, offset: u32) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Int { size: u32 },
    Struct { size: u32, members: Vec<Member> },
    Union { size: u32, members: Vec<Member> },
    Enum { size: u32, values: Vec<(String, i64)> },
    Pointer { target: TypeId },
    Array { elem: TypeId, len: u32 },
    Typedef { target: TypeId },
}

/// One entry of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Empty for anonymous types (pointers, arrays).
    pub name: String,
    pub kind: TypeKind,
}

/// Result of walking a member path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Accessor indices; the first is always the root index `0`.
    pub access: Vec<u32>,
    /// Byte offset of the final member from the root type.
    pub offset: u32,
    /// Size in bytes of the final member.
    pub size: u32,
}

impl FieldSpec {
    /// Accessor string in the `0:i:j` form relocation records carry.
    pub fn access_spec(&self) -> String {
        self.access.iter().join(":")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGraph {
    types: Vec<TypeDef>,
    by_name: BTreeMap<String, TypeId>,
}

impl TypeGraph {
    /// Size of a pointer on the target.
    pub const POINTER_SIZE: u32 = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type and return its id.
    pub fn add(&mut self, name: &str, kind: TypeKind) -> TypeId {
        self.types.push(TypeDef {
            name: name.to_owned(),
            kind,
        });
        let id = self.types.len() as TypeId;
        if !name.is_empty() {
            self.by_name.entry(name.to_owned()).or_insert(id);
        }
        id
    }

    pub fn add_int(&mut self, name: &str, size: u32) -> TypeId {
        self.add(name, TypeKind::Int { size })
    }

    pub fn add_struct(&mut self, name: &str, size: u32, members: impl IntoIterator<Item = Member>) -> TypeId {
        let members = members.into_iter().collect();
        self.add(name, TypeKind::Struct { size, members })
    }

    pub fn add_union(&mut self, name: &str, size: u32, members: impl IntoIterator<Item = Member>) -> TypeId {
        let members = members.into_iter().collect();
        self.add(name, TypeKind::Union { size, members })
    }

    pub fn add_enum<'a>(&mut self, name: &str, size: u32, values: impl IntoIterator<Item = (&'a str, i64)>) -> TypeId {
        let values = values
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        self.add(name, TypeKind::Enum { size, values })
    }

    pub fn add_pointer(&mut self, target: TypeId) -> TypeId {
        self.add("", TypeKind::Pointer { target })
    }

    pub fn add_array(&mut self, elem: TypeId, len: u32) -> TypeId {
        self.add("", TypeKind::Array { elem, len })
    }

    pub fn add_typedef(&mut self, name: &str, target: TypeId) -> TypeId {
        self.add(name, TypeKind::Typedef { target })
    }

    /// Look up a named type.
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.types.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All types in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
        (1..).zip(self.types.iter())
    }

    /// Follow typedefs to the underlying type.
    pub fn resolve(&self, mut id: TypeId) -> Option<TypeId> {
        // A chain longer than the graph is a cycle.
        for _ in 0..=self.types.len() {
            match self.get(id)?.kind {
                TypeKind::Typedef { target } => id = target,
                _ => return Some(id),
            }
        }
        None
    }

    /// Size in bytes of a type, if it is fully described.
    ///
    /// Arrays multiply out to their innermost element. An element chain that
    /// loops back on itself has no size.
    pub fn size_of(&self, mut id: TypeId) -> Option<u32> {
        let mut count: u32 = 1;
        for _ in 0..=self.types.len() {
            id = self.resolve(id)?;
            let size = match &self.get(id)?.kind {
                TypeKind::Int { size }
                | TypeKind::Struct { size, .. }
                | TypeKind::Union { size, .. }
                | TypeKind::Enum { size, .. } => *size,
                TypeKind::Pointer { .. } => Self::POINTER_SIZE,
                TypeKind::Array { elem, len } => {
                    count = count.checked_mul(*len)?;
                    id = *elem;
                    continue;
                }
                TypeKind::Typedef { .. } => return None,
            };
            return size.checked_mul(count);
        }
        None
    }

    /// Walk a member path starting at `root`.
    ///
    /// Struct and union components select a member by name; numeric
    /// components index an array (zero-length arrays accept any index).
    /// Returns `None` if any component does not exist.
    pub fn resolve_field(&self, root: TypeId, path: &[String]) -> Option<FieldSpec> {
        let mut access = vec![0];
        let mut offset: u32 = 0;
        let mut current = root;

        for component in path {
            current = self.resolve(current)?;
            match &self.get(current)?.kind {
                TypeKind::Struct { members, .. } | TypeKind::Union { members, .. } => {
                    let (index, member) = members.iter().find_position(|m| m.name == *component)?;
                    access.push(u32::try_from(index).ok()?);
                    offset = offset.checked_add(member.offset)?;
                    current = member.ty;
                }
                TypeKind::Array { elem, len } => {
                    let index: u32 = component.parse().ok()?;
                    if *len != 0 && index >= *len {
                        return None;
                    }
                    access.push(index);
                    offset = offset.checked_add(self.size_of(*elem)?.checked_mul(index)?)?;
                    current = *elem;
                }
                _ => return None,
            }
        }

        Some(FieldSpec {
            access,
            offset,
            size: self.size_of(current)?,
        })
    }

    /// Index and value of a named enumerator.
    pub fn enum_value(&self, id: TypeId, name: &str) -> Option<(u32, i64)> {
        let id = self.resolve(id)?;
        match &self.get(id)?.kind {
            TypeKind::Enum { values, .. } => {
                let (index, (_, value)) = values.iter().find_position(|(n, _)| n == name)?;
                Some((u32::try_from(index).ok()?, *value))
            }
            _ => None,
        }
    }
}
