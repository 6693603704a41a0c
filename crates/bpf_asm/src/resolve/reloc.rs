//! Field-Access Relocations
//!
//! Programs that read kernel structures cannot know member offsets at
//! assembly time: layouts shift between kernel versions. Each
//! [`FieldAccess`] is lowered to a placeholder instruction plus a
//! [`CoreRelocation`] record; the loader patches the placeholder using the
//! running kernel's type information.
//!
//! # Placeholders
//!
//! ```text
//! kind              placeholder
//! ──────────────────────────────────────────────
//! byte offset       mov dst, 0   or   ldx dst, [src+0]
//! byte size         mov dst, <local member size>
//! field exists      mov dst, 1
//! type size         mov dst, <local type size>
//! type exists       mov dst, 1
//! enum value        lddw dst, <local enumerator value>
//! enum exists       mov dst, 1
//! ```
//!
//! Every name is checked against the program's local type graph, so a typo
//! is caught here rather than on the target machine.

use core::fmt;

use bpf_abi::BpfCoreRelo;
use log::trace;

use crate::btf::{TypeGraph, TypeId};
use crate::bytecode::{AluOp, BpfInsn, Insn};
use crate::error::{AsmError, AsmResult, InsnError, SymbolKind};
use crate::program::{AccessShape, FieldAccess, RelocKind};

/// One relocation record, in slot order within a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreRelocation {
    /// Slot of the placeholder instruction.
    pub insn_slot: usize,
    pub type_name: String,
    /// Id of the root type in the local type graph.
    pub type_id: TypeId,
    pub field_path: Vec<String>,
    /// Accessor string, e.g. `0:1:3` or an enumerator index.
    pub access_spec: String,
    pub kind: RelocKind,
}

impl CoreRelocation {
    /// Byte offset of the placeholder in the instruction buffer.
    #[inline]
    pub fn insn_byte_offset(&self) -> usize {
        self.insn_slot * BpfInsn::SIZE
    }

    /// Kernel record for this relocation.
    ///
    /// `access_str_off` is where the loader placed [`Self::access_spec`] in
    /// its string section. `None` if the byte offset does not fit the
    /// record's 32-bit field.
    pub fn to_raw(&self, access_str_off: u32) -> Option<BpfCoreRelo> {
        Some(BpfCoreRelo {
            insn_off: u32::try_from(self.insn_byte_offset()).ok()?,
            type_id: self.type_id,
            access_str_off,
            kind: self.kind.raw(),
        })
    }
}

impl fmt::Display for CoreRelocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insn {}: <{}> {}", self.insn_slot, self.kind, self.type_name)?;
        if !self.field_path.is_empty() {
            write!(f, ".{}", self.field_path.join("."))?;
        }
        write!(f, " ({})", self.access_spec)
    }
}

/// Lowers field accesses and collects their relocation records.
pub struct RelocGenerator<'a> {
    types: &'a TypeGraph,
    relocations: Vec<CoreRelocation>,
}

impl<'a> RelocGenerator<'a> {
    pub fn new(types: &'a TypeGraph) -> Self {
        Self {
            types,
            relocations: Vec::new(),
        }
    }

    /// Emit the placeholder for `access` at `slot` and record its relocation.
    ///
    /// Calls must come in increasing slot order.
    pub fn lower(&mut self, access: &FieldAccess, slot: usize) -> AsmResult<Insn> {
        let type_id = self
            .types
            .find(access.type_name())
            .ok_or_else(|| AsmError::unresolved(SymbolKind::ReferenceType, access.type_name(), slot))?;
        let unknown_field = || {
            AsmError::unresolved(
                SymbolKind::ReferenceField,
                format!("{}.{}", access.type_name(), access.path_string()),
                slot,
            )
        };

        let dst = access.dst();
        let kind = access.kind();
        let (insn, access_spec) = match kind {
            RelocKind::TypeSize => {
                let size = self.types.size_of(type_id).ok_or_else(|| {
                    AsmError::unresolved(SymbolKind::ReferenceType, access.type_name(), slot)
                })?;
                (mov(dst, i64::from(size), slot)?, String::from("0"))
            }
            RelocKind::TypeExists => (mov(dst, 1, slot)?, String::from("0")),
            RelocKind::EnumValue | RelocKind::EnumValueExists => {
                let [enumerator] = access.field_path() else {
                    return Err(unknown_field());
                };
                let (index, value) = self
                    .types
                    .enum_value(type_id, enumerator)
                    .ok_or_else(unknown_field)?;
                let insn = if kind == RelocKind::EnumValue {
                    Insn::ld_imm64(dst, value)
                } else {
                    mov(dst, 1, slot)?
                };
                (insn, index.to_string())
            }
            RelocKind::FieldByteOffset | RelocKind::FieldByteSize | RelocKind::FieldExists => {
                if access.field_path().is_empty() {
                    return Err(unknown_field());
                }
                let spec = self
                    .types
                    .resolve_field(type_id, access.field_path())
                    .ok_or_else(unknown_field)?;
                let insn = match (kind, access.shape()) {
                    (RelocKind::FieldByteOffset, AccessShape::Load { size, src }) => {
                        Insn::ldx(size, dst, src, 0)
                    }
                    (RelocKind::FieldByteOffset, AccessShape::Mov) => mov(dst, 0, slot)?,
                    (RelocKind::FieldByteSize, _) => mov(dst, i64::from(spec.size), slot)?,
                    _ => mov(dst, 1, slot)?,
                };
                (insn, spec.access_spec())
            }
        };

        debug_assert!(
            self.relocations
                .last()
                .is_none_or(|last| last.insn_slot < slot)
        );
        trace!(
            "slot {}: <{}> {} ({})",
            slot,
            kind,
            access.type_name(),
            access_spec
        );

        self.relocations.push(CoreRelocation {
            insn_slot: slot,
            type_name: access.type_name().to_owned(),
            type_id,
            field_path: access.field_path().to_vec(),
            access_spec,
            kind,
        });
        Ok(insn)
    }

    /// Records collected so far, in slot order.
    #[inline]
    pub fn relocations(&self) -> &[CoreRelocation] {
        &self.relocations
    }

    pub fn finish(self) -> Vec<CoreRelocation> {
        self.relocations
    }
}

fn mov(dst: u8, value: i64, slot: usize) -> AsmResult<Insn> {
    let imm = i32::try_from(value).map_err(|_| AsmError::Structural {
        slot,
        source: InsnError::ImmediateOutOfRange(value),
    })?;
    Ok(Insn::alu(AluOp::Mov, true, dst, imm))
}
