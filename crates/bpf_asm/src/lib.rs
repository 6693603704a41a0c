//! Symbolic eBPF Assembler
//!
//! This crate turns symbolic instruction sequences for the kernel eBPF VM into
//! the byte buffer and relocation table a loader submits to the verifier.
//! Programs name their jump targets, maps, helpers and kernel structure fields
//! symbolically; the assembler lays out slots, binds every name and emits
//! placeholder instructions plus relocation records for field accesses whose
//! offsets are only known on the target kernel.
//!
//! # Guarantees
//!
//! Assembly checks structure only: register ids, offset and immediate ranges,
//! resolvable symbols and the instruction ceiling. Whether a program is safe
//! to run is decided by the kernel verifier.
//!
//! | Check | Error |
//! |-------|-------|
//! | register outside r0-r10, write to r10 | `Structural` |
//! | label defined twice | `DuplicateLabel` |
//! | label, map, helper, type or field unknown | `UnresolvedSymbol` |
//! | jump displacement does not fit | `JumpOffsetOutOfRange` |
//! | too many slots | `SizeLimitExceeded` |
//!
//! # Modules
//!
//! - [`bytecode`] - Instruction set, registers and binary encoding
//! - [`asm`] - Builder functions for instructions and symbolic items
//! - [`program`] - Symbolic programs and nested fragments
//! - [`btf`] - Local reference-type graph for field relocations
//! - [`env`] - Map and helper bindings
//! - [`resolve`] - Label, symbol and relocation passes
//! - [`assembler`] - The pipeline and its output
//! - [`loader`] - Interface to the program loader
//!
//! # Quick Start
//!
//! ```ignore
//! use bpf_asm::asm::*;
//! use bpf_asm::bytecode::MemSize;
//! use bpf_asm::bytecode::Register::*;
//! use bpf_asm::{Environment, Program, assemble};
//!
//! // Count calls in an array map and return 0
//! let program = Program::new("count")
//!     .item(st_imm(MemSize::Word, R10, -4, 0))
//!     .item(map_lookup("counters", -4))
//!     .item(jeq_imm(R0, 0, "out"))
//!     .item(mov64_imm(R1, 1))
//!     .item(atomic_add64(R0, 0, R1))
//!     .item(label("out"))
//!     .item(return_imm(0));
//!
//! let env = Environment::new().with_map("counters", 7);
//! let out = assemble(program, &env, 4096)?;
//! println!("{}", out.disassemble());
//! ```

pub mod asm;
pub mod assembler;
pub mod btf;
pub mod bytecode;
pub mod config;
pub mod env;
pub mod error;
pub mod loader;
pub mod program;
pub mod resolve;

pub use assembler::{AssembledProgram, Assembler, assemble};
pub use btf::{Member, TypeGraph, TypeId};
pub use bytecode::{BpfInsn, Insn, Register};
pub use config::AssemblerConfig;
pub use env::{Environment, HelperTable};
pub use error::{AsmError, AsmResult, InsnError, SymbolKind};
pub use loader::{LoadRejected, LoadRequest, MapRegistry, ProgramLoader, RawFd};
pub use program::{AccessShape, FieldAccess, Fragment, Item, Program, RelocKind};
pub use resolve::CoreRelocation;
