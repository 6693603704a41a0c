//! Symbolic Program Representation
//!
//! A [`Program`] is an ordered, possibly nested sequence of [`Item`]s plus the
//! local reference-type graph its field accesses are checked against. Items
//! are either concrete instructions or symbolic placeholders (labels, map
//! references, helper calls, field accesses) that the assembler resolves away
//! before encoding.
//!
//! Builders can return groups of groups; [`flatten`] turns any nesting into
//! one linear stream without recursion.

use core::fmt;

use crate::btf::TypeGraph;
use crate::bytecode::{Insn, MemSize};

/// One element of the symbolic instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Concrete instruction, encoded as-is.
    Insn(Insn),

    /// Jump-class instruction whose displacement comes from a label.
    Jump {
        /// Instruction template; its displacement field is overwritten.
        insn: Insn,
        /// Target label name.
        target: String,
    },

    /// Zero-width address marker.
    Label(String),

    /// Wide load of a map file descriptor.
    MapRef {
        /// Destination register
        dst: u8,
        /// Map handle looked up in the environment
        handle: String,
    },

    /// Wide load of an address inside a map's value area.
    MapValue {
        /// Destination register
        dst: u8,
        /// Map handle looked up in the environment
        handle: String,
        /// Byte offset into the value
        offset: u32,
    },

    /// Call of a kernel helper by name.
    HelperCall(String),

    /// Placeholder instruction plus relocation record.
    FieldAccess(FieldAccess),
}

impl Item {
    /// Number of 8-byte slots this item occupies once lowered.
    pub fn slots(&self) -> usize {
        match self {
            Self::Insn(insn) | Self::Jump { insn, .. } => insn.slots(),
            Self::Label(_) => 0,
            Self::MapRef { .. } | Self::MapValue { .. } => 2,
            Self::HelperCall(_) => 1,
            Self::FieldAccess(access) => access.slots(),
        }
    }

    /// Label name if this item is a label.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl From<Insn> for Item {
    fn from(insn: Insn) -> Self {
        Self::Insn(insn)
    }
}

impl From<FieldAccess> for Item {
    fn from(access: FieldAccess) -> Self {
        Self::FieldAccess(access)
    }
}

/// Possibly nested builder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Item(Item),
    Seq(Vec<Fragment>),
}

impl Fragment {
    /// Flatten this fragment into a linear item stream.
    pub fn flatten(self) -> Vec<Item> {
        flatten([self])
    }
}

impl From<Item> for Fragment {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<Insn> for Fragment {
    fn from(insn: Insn) -> Self {
        Self::Item(Item::Insn(insn))
    }
}

impl From<Vec<Fragment>> for Fragment {
    fn from(seq: Vec<Fragment>) -> Self {
        Self::Seq(seq)
    }
}

impl From<Vec<Item>> for Fragment {
    fn from(items: Vec<Item>) -> Self {
        Self::Seq(items.into_iter().map(Self::Item).collect())
    }
}

impl From<Vec<Insn>> for Fragment {
    fn from(insns: Vec<Insn>) -> Self {
        Self::Seq(insns.into_iter().map(Self::from).collect())
    }
}

/// Flatten nested fragments into one linear stream, preserving order.
///
/// Uses an explicit stack, so nesting depth is bounded only by memory.
pub fn flatten(fragments: impl IntoIterator<Item = Fragment>) -> Vec<Item> {
    let mut items = Vec::new();
    let mut stack = vec![fragments.into_iter().collect::<Vec<_>>().into_iter()];

    while let Some(top) = stack.last_mut() {
        let next = top.next();
        match next {
            Some(Fragment::Item(item)) => items.push(item),
            Some(Fragment::Seq(seq)) => stack.push(seq.into_iter()),
            None => {
                stack.pop();
            }
        }
    }

    items
}

/// Symbolic program: fragments plus the local reference-type graph.
///
/// Built once and consumed by [`crate::assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    name: String,
    fragments: Vec<Fragment>,
    types: TypeGraph,
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragments: Vec::new(),
            types: TypeGraph::new(),
        }
    }

    /// Append one fragment.
    pub fn item(mut self, fragment: impl Into<Fragment>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Append several fragments.
    pub fn items<F: Into<Fragment>>(mut self, fragments: impl IntoIterator<Item = F>) -> Self {
        self.fragments.extend(fragments.into_iter().map(Into::into));
        self
    }

    /// Append an exit instruction.
    pub fn exit(self) -> Self {
        self.item(Insn::exit())
    }

    /// Append one fragment in place.
    pub fn push(&mut self, fragment: impl Into<Fragment>) {
        self.fragments.push(fragment.into());
    }

    /// Attach the local reference-type graph.
    pub fn with_types(mut self, types: TypeGraph) -> Self {
        self.types = types;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    #[inline]
    pub fn types(&self) -> &TypeGraph {
        &self.types
    }

    /// Consume the program.
    pub fn into_parts(self) -> (String, Vec<Fragment>, TypeGraph) {
        (self.name, self.fragments, self.types)
    }
}

/// What a field-access relocation asks the loader to patch in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelocKind {
    /// Byte offset of a member within its root type.
    FieldByteOffset,
    /// Size in bytes of a member.
    FieldByteSize,
    /// Whether a member exists on the target.
    FieldExists,
    /// Size in bytes of a type.
    TypeSize,
    /// Whether a type exists on the target.
    TypeExists,
    /// Integer value of an enumerator.
    EnumValue,
    /// Whether an enumerator exists on the target.
    EnumValueExists,
}

impl RelocKind {
    /// Kernel relocation kind number.
    pub const fn raw(self) -> u32 {
        match self {
            Self::FieldByteOffset => bpf_abi::BPF_CORE_FIELD_BYTE_OFFSET,
            Self::FieldByteSize => bpf_abi::BPF_CORE_FIELD_BYTE_SIZE,
            Self::FieldExists => bpf_abi::BPF_CORE_FIELD_EXISTS,
            Self::TypeSize => bpf_abi::BPF_CORE_TYPE_SIZE,
            Self::TypeExists => bpf_abi::BPF_CORE_TYPE_EXISTS,
            Self::EnumValue => bpf_abi::BPF_CORE_ENUMVAL_VALUE,
            Self::EnumValueExists => bpf_abi::BPF_CORE_ENUMVAL_EXISTS,
        }
    }

    /// Kinds that refer to a whole type rather than a member path.
    pub const fn is_type_based(self) -> bool {
        matches!(self, Self::TypeSize | Self::TypeExists)
    }

    /// Kinds whose path names a single enumerator.
    pub const fn is_enum_based(self) -> bool {
        matches!(self, Self::EnumValue | Self::EnumValueExists)
    }
}

impl fmt::Display for RelocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FieldByteOffset => "byte_off",
            Self::FieldByteSize => "byte_sz",
            Self::FieldExists => "field_exists",
            Self::TypeSize => "type_size",
            Self::TypeExists => "type_exists",
            Self::EnumValue => "enumval_value",
            Self::EnumValueExists => "enumval_exists",
        };
        write!(f, "{}", s)
    }
}

/// Shape of the placeholder instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessShape {
    /// `dst = value`
    Mov,
    /// `dst = *(size *)(src + offset)` with the offset patched.
    Load { size: MemSize, src: u8 },
}

/// A field or type access whose value is only known on the loading machine.
///
/// Paths are dot separated member names; a numeric component indexes into an
/// array. Type-based kinds take an empty path and enum kinds a single
/// enumerator name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    dst: u8,
    type_name: String,
    field_path: Vec<String>,
    kind: RelocKind,
    shape: AccessShape,
}

impl FieldAccess {
    fn new(kind: RelocKind, dst: u8, type_name: &str, path: &str, shape: AccessShape) -> Self {
        Self {
            dst,
            type_name: type_name.to_owned(),
            field_path: split_path(path),
            kind,
            shape,
        }
    }

    /// `dst = offsetof(type_name, path)`
    pub fn byte_offset(dst: u8, type_name: &str, path: &str) -> Self {
        Self::new(RelocKind::FieldByteOffset, dst, type_name, path, AccessShape::Mov)
    }

    /// `dst = *(size *)(src + offsetof(type_name, path))`
    pub fn load(dst: u8, src: u8, size: MemSize, type_name: &str, path: &str) -> Self {
        Self::new(
            RelocKind::FieldByteOffset,
            dst,
            type_name,
            path,
            AccessShape::Load { size, src },
        )
    }

    /// `dst = sizeof(type_name.path)`
    pub fn byte_size(dst: u8, type_name: &str, path: &str) -> Self {
        Self::new(RelocKind::FieldByteSize, dst, type_name, path, AccessShape::Mov)
    }

    pub fn field_exists(dst: u8, type_name: &str, path: &str) -> Self {
        Self::new(RelocKind::FieldExists, dst, type_name, path, AccessShape::Mov)
    }

    pub fn type_size(dst: u8, type_name: &str) -> Self {
        Self::new(RelocKind::TypeSize, dst, type_name, "", AccessShape::Mov)
    }

    pub fn type_exists(dst: u8, type_name: &str) -> Self {
        Self::new(RelocKind::TypeExists, dst, type_name, "", AccessShape::Mov)
    }

    pub fn enum_value(dst: u8, type_name: &str, enumerator: &str) -> Self {
        Self::new(RelocKind::EnumValue, dst, type_name, enumerator, AccessShape::Mov)
    }

    pub fn enum_value_exists(dst: u8, type_name: &str, enumerator: &str) -> Self {
        Self::new(RelocKind::EnumValueExists, dst, type_name, enumerator, AccessShape::Mov)
    }

    #[inline]
    pub fn dst(&self) -> u8 {
        self.dst
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn field_path(&self) -> &[String] {
        &self.field_path
    }

    #[inline]
    pub fn kind(&self) -> RelocKind {
        self.kind
    }

    #[inline]
    pub fn shape(&self) -> AccessShape {
        self.shape
    }

    /// Enum values are loaded with a wide load, everything else uses one slot.
    pub fn slots(&self) -> usize {
        match self.kind {
            RelocKind::EnumValue => 2,
            _ => 1,
        }
    }

    /// Dotted form of the path, for diagnostics.
    pub fn path_string(&self) -> String {
        self.field_path.join(".")
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}
