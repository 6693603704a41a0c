//! Assembler
//!
//! Runs the passes in dependency order and emits the final artifact:
//!
//! ```text
//! Program ─▶ flatten ─▶ layout ─▶ size check ─▶ jumps ─▶ maps, helpers ─▶ field relocations ─▶ validate ─▶ encode
//! ```
//!
//! Each lowering pass walks the whole stream before the next one starts, so
//! an unresolved label is reported ahead of an unbound map anywhere in the
//! program.
//!
//! Assembly fails on the first problem and never returns a partial program.
//! The same inputs always produce the same bytes.

use core::fmt;
use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, trace};

use crate::btf::TypeGraph;
use crate::bytecode::{BpfInsn, Insn};
use crate::config::AssemblerConfig;
use crate::env::Environment;
use crate::error::{AsmError, AsmResult};
use crate::program::{Item, Program, flatten};
use crate::resolve::{CoreRelocation, Layout, RelocGenerator, labels, symbols};

/// Assembled program, ready to hand to a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledProgram {
    name: String,
    bytes: Vec<u8>,
    insns: Vec<Insn>,
    relocations: Vec<CoreRelocation>,
    instruction_count: usize,
    type_graph: TypeGraph,
    labels: BTreeMap<String, usize>,
}

impl AssembledProgram {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded instruction buffer.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Relocation records in increasing slot order.
    #[inline]
    pub fn relocations(&self) -> &[CoreRelocation] {
        &self.relocations
    }

    /// Number of 8-byte slots (a wide load counts twice).
    #[inline]
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Local type graph the relocations refer to.
    #[inline]
    pub fn type_graph(&self) -> &TypeGraph {
        &self.type_graph
    }

    /// Slot of every label.
    #[inline]
    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Lowered instructions, one entry per logical instruction.
    #[inline]
    pub fn instructions(&self) -> &[Insn] {
        &self.insns
    }

    /// Textual listing with slot numbers and labels.
    pub fn disassemble(&self) -> String {
        self.to_string()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Display for AssembledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_slot: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (name, slot) in &self.labels {
            by_slot.entry(*slot).or_default().push(name);
        }

        let mut slot = 0;
        for insn in &self.insns {
            for name in by_slot.remove(&slot).into_iter().flatten() {
                writeln!(f, "{}:", name)?;
            }
            writeln!(f, "{:>5}: {}", slot, insn)?;
            slot += insn.slots();
        }
        for name in by_slot.into_values().flatten() {
            writeln!(f, "{}:", name)?;
        }
        Ok(())
    }
}

/// Assembler with a fixed configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble `program` against `env`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found:
    /// - [`AsmError::DuplicateLabel`] while laying out slots
    /// - [`AsmError::SizeLimitExceeded`] before anything is lowered
    /// - [`AsmError::UnresolvedSymbol`], [`AsmError::JumpOffsetOutOfRange`]
    ///   or [`AsmError::Structural`] while lowering: jumps first, then maps
    ///   and helpers, then field accesses
    /// - [`AsmError::Structural`] from validation
    /// - [`AsmError::MissingExit`] if configured
    pub fn assemble(&self, program: Program, env: &Environment) -> AsmResult<AssembledProgram> {
        let (name, fragments, type_graph) = program.into_parts();
        let items = flatten(fragments);

        let layout = Layout::build(&items)?;
        let count = layout.total_slots();
        debug!(
            "assembling `{}`: {} items, {} slots, {} labels",
            name,
            items.len(),
            count,
            layout.labels().len()
        );

        if count > self.config.max_instructions {
            return Err(AsmError::SizeLimitExceeded {
                count,
                limit: self.config.max_instructions,
            });
        }

        // One slot per item; labels stay empty.
        let mut lowered: Vec<Option<Insn>> = items
            .iter()
            .map(|item| match item {
                Item::Insn(insn) => Some(*insn),
                _ => None,
            })
            .collect();

        lower_pass(&items, &layout, &mut lowered, |item, slot| match item {
            Item::Jump { insn, target } => Some(labels::resolve_jump(*insn, target, slot, &layout)),
            _ => None,
        })?;

        lower_pass(&items, &layout, &mut lowered, |item, slot| match item {
            Item::MapRef { dst, handle } => Some(symbols::bind_map(*dst, handle, slot, env)),
            Item::MapValue {
                dst,
                handle,
                offset,
            } => Some(symbols::bind_map_value(*dst, handle, *offset, slot, env)),
            Item::HelperCall(helper) => Some(symbols::bind_helper(helper, slot, env)),
            _ => None,
        })?;

        let mut relocs = RelocGenerator::new(&type_graph);
        lower_pass(&items, &layout, &mut lowered, |item, slot| match item {
            Item::FieldAccess(access) => Some(relocs.lower(access, slot)),
            _ => None,
        })?;

        let mut insns = Vec::with_capacity(items.len());
        let mut last_slot = None;
        for (insn, &slot) in lowered.into_iter().zip(layout.starts()) {
            let Some(insn) = insn else {
                continue;
            };
            insn.validate()
                .map_err(|source| AsmError::Structural { slot, source })?;
            trace!("{:>5}: {}", slot, insn);

            insns.push(insn);
            last_slot = Some(slot);
        }

        if self.config.require_exit && !insns.last().is_some_and(Insn::is_terminator) {
            return Err(AsmError::MissingExit {
                slot: last_slot.unwrap_or(0),
            });
        }

        let relocations = relocs.finish();
        debug_assert!(
            relocations
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.insn_slot < b.insn_slot)
        );

        let mut bytes = Vec::with_capacity(count * BpfInsn::SIZE);
        for insn in &insns {
            let (first, next) = insn.to_slots();
            bytes.extend_from_slice(&first.to_bytes());
            if let Some(next) = next {
                bytes.extend_from_slice(&next.to_bytes());
            }
        }
        debug_assert_eq!(bytes.len(), count * BpfInsn::SIZE);

        debug!(
            "assembled `{}`: {} bytes, {} relocations",
            name,
            bytes.len(),
            relocations.len()
        );

        Ok(AssembledProgram {
            name,
            bytes,
            insns,
            relocations,
            instruction_count: count,
            type_graph,
            labels: layout.into_labels(),
        })
    }
}

/// Run one lowering pass in stream order, filling the items `lower` handles.
fn lower_pass(
    items: &[Item],
    layout: &Layout,
    lowered: &mut [Option<Insn>],
    mut lower: impl FnMut(&Item, usize) -> Option<AsmResult<Insn>>,
) -> AsmResult<()> {
    for ((item, &slot), out) in items.iter().zip(layout.starts()).zip(lowered) {
        if let Some(insn) = lower(item, slot) {
            *out = Some(insn?);
        }
    }
    Ok(())
}

/// Assemble with the default configuration and the given size ceiling.
pub fn assemble(
    program: Program,
    env: &Environment,
    max_instructions: usize,
) -> AsmResult<AssembledProgram> {
    let config = AssemblerConfig::default().with_max_instructions(max_instructions);
    Assembler::new(config).assemble(program, env)
}
