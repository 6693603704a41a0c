//! Loader Interface
//!
//! The assembler stops at an [`AssembledProgram`]. Creating maps, issuing the
//! `BPF_PROG_LOAD` syscall and patching relocations against the running
//! kernel belong to a loader. This module defines the seams such a loader
//! plugs into:
//!
//! - [`MapRegistry`]: whoever owns the maps supplies `handle -> fd`
//! - [`ProgramLoader`]: takes a [`LoadRequest`] and returns a program fd
//!
//! [`LoadRequest::to_attr`] fills the fixed part of the kernel's attribute
//! block. Buffer pointers stay zero; the loader sets them once the buffers
//! are pinned.

use std::collections::BTreeMap;

use bpf_abi::{BpfCoreRelo, BpfProgLoadAttr, BpfProgType, LogLevel, ProgLoadFlags};
use thiserror::Error;

use crate::assembler::AssembledProgram;
use crate::bytecode::BpfInsn;

/// Kernel file descriptor.
pub type RawFd = i32;

/// Source of map handle bindings.
pub trait MapRegistry {
    /// Current `handle -> fd` bindings.
    fn maps(&self) -> Vec<(String, RawFd)>;
}

impl MapRegistry for BTreeMap<String, RawFd> {
    fn maps(&self) -> Vec<(String, RawFd)> {
        self.iter().map(|(handle, fd)| (handle.clone(), *fd)).collect()
    }
}

/// Everything a loader needs to submit one program.
#[derive(Debug, Clone)]
pub struct LoadRequest<'a> {
    program: &'a AssembledProgram,
    license: String,
    prog_type: BpfProgType,
    flags: ProgLoadFlags,
    log_level: LogLevel,
    log_size: u32,
}

impl<'a> LoadRequest<'a> {
    /// Request with a GPL license, no flags and no verifier log.
    pub fn new(program: &'a AssembledProgram, prog_type: BpfProgType) -> Self {
        Self {
            program,
            license: String::from("GPL"),
            prog_type,
            flags: ProgLoadFlags::empty(),
            log_level: LogLevel::empty(),
            log_size: 0,
        }
    }

    pub fn license(mut self, license: &str) -> Self {
        self.license = license.to_owned();
        self
    }

    pub fn flags(mut self, flags: ProgLoadFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Ask for a verifier log of up to `size` bytes.
    pub fn log(mut self, level: LogLevel, size: u32) -> Self {
        self.log_level = level;
        self.log_size = size;
        self
    }

    #[inline]
    pub fn program(&self) -> &'a AssembledProgram {
        self.program
    }

    #[inline]
    pub fn license_str(&self) -> &str {
        &self.license
    }

    #[inline]
    pub fn prog_type(&self) -> BpfProgType {
        self.prog_type
    }

    #[inline]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    #[inline]
    pub fn log_size(&self) -> u32 {
        self.log_size
    }

    /// Fixed fields of the `BPF_PROG_LOAD` attribute block.
    pub fn to_attr(&self) -> BpfProgLoadAttr {
        let mut attr = BpfProgLoadAttr {
            prog_type: self.prog_type.as_raw(),
            insn_cnt: saturate(self.program.instruction_count()),
            log_level: self.log_level.bits(),
            log_size: self.log_size,
            prog_flags: self.flags.bits(),
            core_relo_cnt: saturate(self.program.relocations().len()),
            core_relo_rec_size: saturate(size_of::<BpfCoreRelo>()),
            ..Default::default()
        };
        attr.set_name(self.program.name());
        attr
    }

    /// Kernel relocation records.
    ///
    /// `intern` stores an access string in the loader's string section and
    /// returns its offset. `None` if a placeholder lies beyond the 4 GiB the
    /// record format can address.
    pub fn raw_relocations(&self, mut intern: impl FnMut(&str) -> u32) -> Option<Vec<BpfCoreRelo>> {
        self.program
            .relocations()
            .iter()
            .map(|reloc| reloc.to_raw(intern(&reloc.access_spec)))
            .collect()
    }

    /// Size in bytes of the instruction buffer.
    pub fn insns_len(&self) -> usize {
        self.program.instruction_count() * BpfInsn::SIZE
    }
}

fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Kernel file descriptor of a loaded program.
pub type ProgramFd = RawFd;

/// Submits assembled programs to the kernel.
pub trait ProgramLoader {
    type Error: core::error::Error;

    fn load(&mut self, request: &LoadRequest<'_>) -> Result<ProgramFd, Self::Error>;
}

/// The kernel refused a program.
///
/// `log` is the verifier output exactly as the kernel wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("program rejected by the kernel (errno {errno})")]
pub struct LoadRejected {
    pub errno: i32,
    pub log: String,
}
