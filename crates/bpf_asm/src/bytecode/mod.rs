//! eBPF Bytecode Core
//!
//! Instruction set definitions and the binary encoding of the kernel eBPF VM.
//!
//! # Architecture
//!
//! - 11 registers (R0-R10), R10 read-only
//! - 64-bit operations with 32-bit variants
//! - 8-byte instruction format
//! - Wide instructions for 64-bit immediates

pub mod insn;
pub mod opcode;
pub mod registers;

pub use insn::{BpfInsn, Insn};
pub use opcode::{AluOp, AtomicOp, JmpOp, MemMode, MemSize, OpcodeClass, SourceType};
pub use registers::{InvalidRegister, Register};
