//! Label Layout and Jump Resolution
//!
//! Two passes over the flattened stream. The first assigns a slot to every
//! item (wide loads take two, labels none) and records where each label
//! points. The second rewrites jump templates: the displacement is counted
//! from the instruction after the jump, so a jump at slot `s` to slot `t`
//! stores `t - (s + 1)`.
//!
//! Conditional jumps and `ja` carry the displacement in the 16-bit offset
//! field; `gotol` and local calls carry it in the 32-bit immediate. A
//! displacement that does not fit is an error. Jumps are never widened
//! behind the caller's back.

use std::collections::BTreeMap;

use log::trace;

use crate::bytecode::Insn;
use crate::error::{AsmError, AsmResult, InsnError, SymbolKind};
use crate::program::Item;

/// Slot assignment for a flattened item stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    starts: Vec<usize>,
    labels: BTreeMap<String, usize>,
    total: usize,
}

impl Layout {
    /// Assign slots to `items`.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::DuplicateLabel`] for the second definition of a
    /// label.
    pub fn build(items: &[Item]) -> AsmResult<Self> {
        let mut starts = Vec::with_capacity(items.len());
        let mut labels = BTreeMap::new();
        let mut slot = 0;

        for item in items {
            starts.push(slot);
            if let Item::Label(name) = item {
                if labels.insert(name.clone(), slot).is_some() {
                    return Err(AsmError::DuplicateLabel {
                        name: name.clone(),
                        slot,
                    });
                }
            }
            slot += item.slots();
        }

        Ok(Self {
            starts,
            labels,
            total: slot,
        })
    }

    /// First slot of each item, parallel to the item stream.
    #[inline]
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Slot a label points at.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    #[inline]
    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    /// Total number of physical slots.
    #[inline]
    pub fn total_slots(&self) -> usize {
        self.total
    }

    pub fn into_labels(self) -> BTreeMap<String, usize> {
        self.labels
    }
}

/// Signed slot distance from the instruction after `from` to `to`.
#[inline]
pub fn displacement(from: usize, to: usize) -> i64 {
    to as i64 - (from as i64 + 1)
}

/// Fill in the displacement of the jump template `insn` at `slot`.
pub fn resolve_jump(mut insn: Insn, target: &str, slot: usize, layout: &Layout) -> AsmResult<Insn> {
    let is_branch = insn.jmp_op().is_some_and(|op| op.is_branch());
    if !is_branch && !insn.is_pseudo_call() {
        return Err(AsmError::Structural {
            slot,
            source: InsnError::NotAJump(insn.opcode),
        });
    }

    let target_slot = layout
        .label(target)
        .ok_or_else(|| AsmError::unresolved(SymbolKind::Label, target, slot))?;
    let offset = displacement(slot, target_slot);
    let out_of_range = || AsmError::JumpOffsetOutOfRange {
        label: target.to_owned(),
        slot,
        offset,
    };

    if insn.is_long_jump() || insn.is_pseudo_call() {
        let imm = i32::try_from(offset).map_err(|_| out_of_range())?;
        insn.imm = i64::from(imm);
    } else {
        insn.offset = i16::try_from(offset).map_err(|_| out_of_range())?;
    }

    trace!("slot {}: `{}` -> slot {} ({:+})", slot, target, target_slot, offset);
    Ok(insn)
}
