//! Assembly Errors
//!
//! Every error is local and deterministic: assembling the same input again
//! reproduces it. Errors carry the instruction slot and, for symbol problems,
//! the symbol name so the offending item can be located in the source program.

use core::fmt;

use thiserror::Error;

use crate::bytecode::registers::InvalidRegister;

/// Problems with a single instruction, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsnError {
    #[error("invalid register r{0}")]
    InvalidRegister(u8),

    #[error("r10 is read-only and cannot be written")]
    FramePointerWrite,

    #[error("offset {0} does not fit in 16 bits")]
    OffsetOutOfRange(i64),

    #[error("immediate {0} does not fit in 32 bits")]
    ImmediateOutOfRange(i64),

    #[error("opcode {0:#04x} does not take a jump target")]
    NotAJump(u8),

    #[error("instruction stream truncated at byte {0}")]
    Truncated(usize),

    #[error("second slot of the wide load at byte {0} is malformed")]
    MalformedWideLoad(usize),
}

impl From<InvalidRegister> for InsnError {
    fn from(err: InvalidRegister) -> Self {
        Self::InvalidRegister(err.0)
    }
}

/// Namespace of a symbol that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Label,
    MapHandle,
    Helper,
    ReferenceType,
    ReferenceField,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Label => "label",
            Self::MapHandle => "map",
            Self::Helper => "helper",
            Self::ReferenceType => "reference type",
            Self::ReferenceField => "reference field",
        };
        write!(f, "{}", s)
    }
}

/// Errors returned by [`crate::assemble`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Bad register, offset or immediate.
    #[error("instruction {slot}: {source}")]
    Structural {
        slot: usize,
        #[source]
        source: InsnError,
    },

    #[error("label `{name}` defined twice (again at instruction {slot})")]
    DuplicateLabel { name: String, slot: usize },

    /// Label, map handle, helper or reference type/field that has no binding.
    #[error("unresolved {kind} `{name}` at instruction {slot}")]
    UnresolvedSymbol {
        kind: SymbolKind,
        name: String,
        slot: usize,
    },

    #[error("jump to `{label}` at instruction {slot} needs displacement {offset}, which does not fit")]
    JumpOffsetOutOfRange {
        label: String,
        slot: usize,
        offset: i64,
    },

    #[error("program needs {count} instructions, limit is {limit}")]
    SizeLimitExceeded { count: usize, limit: usize },

    #[error("program does not end in exit or an unconditional jump (instruction {slot})")]
    MissingExit { slot: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AsmError {
    /// Instruction slot the error points at, if it has one.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::Structural { slot, .. }
            | Self::DuplicateLabel { slot, .. }
            | Self::UnresolvedSymbol { slot, .. }
            | Self::JumpOffsetOutOfRange { slot, .. }
            | Self::MissingExit { slot } => Some(*slot),
            Self::SizeLimitExceeded { .. } | Self::Config(_) => None,
        }
    }

    pub(crate) fn unresolved(kind: SymbolKind, name: impl Into<String>, slot: usize) -> Self {
        Self::UnresolvedSymbol {
            kind,
            name: name.into(),
            slot,
        }
    }
}

/// Result type for assembly operations.
pub type AsmResult<T> = Result<T, AsmError>;
