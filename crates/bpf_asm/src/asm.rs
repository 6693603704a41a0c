//! Instruction Builders
//!
//! Plain functions that build instructions and symbolic items, so programs
//! read close to assembly:
//!
//! ```ignore
//! use bpf_asm::asm::*;
//! use bpf_asm::{Fragment, Register::*};
//!
//! let body = seq([
//!     Fragment::from(mov64_imm(R0, 0)),
//!     jeq_imm(R1, 0, "out").into(),
//!     call("ktime_get_ns").into(),
//!     label("out").into(),
//!     exit().into(),
//! ]);
//! ```
//!
//! Jumps take a label name and return [`Item::Jump`]; the assembler fills in
//! the displacement.

use crate::bytecode::{AluOp, AtomicOp, Insn, JmpOp, MemSize, Register};
use crate::program::{FieldAccess, Fragment, Item};

// ---- ALU ----

#[inline]
pub fn alu64_imm(op: AluOp, dst: Register, imm: i32) -> Insn {
    Insn::alu(op, true, dst.as_raw(), imm)
}

#[inline]
pub fn alu64_reg(op: AluOp, dst: Register, src: Register) -> Insn {
    Insn::alu_reg(op, true, dst.as_raw(), src.as_raw())
}

#[inline]
pub fn alu32_imm(op: AluOp, dst: Register, imm: i32) -> Insn {
    Insn::alu(op, false, dst.as_raw(), imm)
}

#[inline]
pub fn alu32_reg(op: AluOp, dst: Register, src: Register) -> Insn {
    Insn::alu_reg(op, false, dst.as_raw(), src.as_raw())
}

/// `dst = imm`
#[inline]
pub fn mov64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::Mov, dst, imm)
}

/// `dst = src`
#[inline]
pub fn mov64_reg(dst: Register, src: Register) -> Insn {
    alu64_reg(AluOp::Mov, dst, src)
}

/// `dst = (u32) imm`
#[inline]
pub fn mov32_imm(dst: Register, imm: i32) -> Insn {
    alu32_imm(AluOp::Mov, dst, imm)
}

#[inline]
pub fn mov32_reg(dst: Register, src: Register) -> Insn {
    alu32_reg(AluOp::Mov, dst, src)
}

#[inline]
pub fn add64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::Add, dst, imm)
}

#[inline]
pub fn add64_reg(dst: Register, src: Register) -> Insn {
    alu64_reg(AluOp::Add, dst, src)
}

#[inline]
pub fn sub64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::Sub, dst, imm)
}

#[inline]
pub fn and64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::And, dst, imm)
}

#[inline]
pub fn lsh64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::Lsh, dst, imm)
}

#[inline]
pub fn rsh64_imm(dst: Register, imm: i32) -> Insn {
    alu64_imm(AluOp::Rsh, dst, imm)
}

#[inline]
pub fn neg64(dst: Register) -> Insn {
    Insn::alu(AluOp::Neg, true, dst.as_raw(), 0)
}

/// Convert the low `bits` of `dst` to big endian.
#[inline]
pub fn be(dst: Register, bits: i32) -> Insn {
    Insn::endian(dst.as_raw(), bits, true)
}

/// Convert the low `bits` of `dst` to little endian.
#[inline]
pub fn le(dst: Register, bits: i32) -> Insn {
    Insn::endian(dst.as_raw(), bits, false)
}

// ---- Memory ----

/// `dst = imm` for a full 64-bit literal (two slots).
#[inline]
pub fn ld_imm64(dst: Register, imm: i64) -> Insn {
    Insn::ld_imm64(dst.as_raw(), imm)
}

/// `dst = *(size *)(src + off)`
#[inline]
pub fn ldx(size: MemSize, dst: Register, src: Register, off: i16) -> Insn {
    Insn::ldx(size, dst.as_raw(), src.as_raw(), off)
}

/// `*(size *)(dst + off) = src`
#[inline]
pub fn stx(size: MemSize, dst: Register, off: i16, src: Register) -> Insn {
    Insn::stx(size, dst.as_raw(), src.as_raw(), off)
}

/// `*(size *)(dst + off) = imm`
#[inline]
pub fn st_imm(size: MemSize, dst: Register, off: i16, imm: i32) -> Insn {
    Insn::st(size, dst.as_raw(), off, imm)
}

/// `lock *(size *)(dst + off) op= src`
#[inline]
pub fn atomic(op: AtomicOp, size: MemSize, dst: Register, off: i16, src: Register) -> Insn {
    Insn::atomic(op, size, dst.as_raw(), src.as_raw(), off, false)
}

/// Like [`atomic`], with the old value returned in `src`.
#[inline]
pub fn atomic_fetch(op: AtomicOp, size: MemSize, dst: Register, off: i16, src: Register) -> Insn {
    Insn::atomic(op, size, dst.as_raw(), src.as_raw(), off, true)
}

/// `lock *(u64 *)(dst + off) += src`
#[inline]
pub fn atomic_add64(dst: Register, off: i16, src: Register) -> Insn {
    atomic(AtomicOp::Add, MemSize::DWord, dst, off, src)
}

/// Compare `*(size *)(dst + off)` with r0 and swap in `src` on match.
#[inline]
pub fn cmpxchg(size: MemSize, dst: Register, off: i16, src: Register) -> Insn {
    atomic_fetch(AtomicOp::Cmpxchg, size, dst, off, src)
}

// ---- Control flow ----

fn jump(insn: Insn, target: &str) -> Item {
    Item::Jump {
        insn,
        target: target.to_owned(),
    }
}

/// `goto target`
pub fn ja(target: &str) -> Item {
    jump(Insn::ja(0), target)
}

/// `goto target` with a 32-bit displacement.
pub fn gotol(target: &str) -> Item {
    jump(Insn::gotol(0), target)
}

/// `if dst <op> imm goto target`
pub fn jmp_imm(op: JmpOp, dst: Register, imm: i32, target: &str) -> Item {
    jump(Insn::jmp(op, true, dst.as_raw(), imm, 0), target)
}

/// `if dst <op> src goto target`
pub fn jmp_reg(op: JmpOp, dst: Register, src: Register, target: &str) -> Item {
    jump(Insn::jmp_reg(op, true, dst.as_raw(), src.as_raw(), 0), target)
}

/// 32-bit compare form of [`jmp_imm`].
pub fn jmp32_imm(op: JmpOp, dst: Register, imm: i32, target: &str) -> Item {
    jump(Insn::jmp(op, false, dst.as_raw(), imm, 0), target)
}

/// 32-bit compare form of [`jmp_reg`].
pub fn jmp32_reg(op: JmpOp, dst: Register, src: Register, target: &str) -> Item {
    jump(Insn::jmp_reg(op, false, dst.as_raw(), src.as_raw(), 0), target)
}

pub fn jeq_imm(dst: Register, imm: i32, target: &str) -> Item {
    jmp_imm(JmpOp::Jeq, dst, imm, target)
}

pub fn jne_imm(dst: Register, imm: i32, target: &str) -> Item {
    jmp_imm(JmpOp::Jne, dst, imm, target)
}

pub fn jeq_reg(dst: Register, src: Register, target: &str) -> Item {
    jmp_reg(JmpOp::Jeq, dst, src, target)
}

/// Call a local subprogram starting at `target`.
pub fn call_local(target: &str) -> Item {
    jump(Insn::call_local(0), target)
}

/// Call a kernel helper by name.
pub fn call(helper: &str) -> Item {
    Item::HelperCall(helper.to_owned())
}

/// Call a kernel helper by id.
#[inline]
pub fn call_id(helper_id: i32) -> Insn {
    Insn::call(helper_id)
}

#[inline]
pub fn exit() -> Insn {
    Insn::exit()
}

pub fn label(name: &str) -> Item {
    Item::Label(name.to_owned())
}

// ---- Maps ----

/// `dst = map` for the map bound to `handle`.
pub fn map_ref(dst: Register, handle: &str) -> Item {
    Item::MapRef {
        dst: dst.as_raw(),
        handle: handle.to_owned(),
    }
}

/// `dst = &value[offset]` of the array map bound to `handle`.
pub fn map_value(dst: Register, handle: &str, offset: u32) -> Item {
    Item::MapValue {
        dst: dst.as_raw(),
        handle: handle.to_owned(),
        offset,
    }
}

// ---- Field accesses ----

/// `dst = offsetof(ty, path)`
pub fn field_offset(dst: Register, ty: &str, path: &str) -> Item {
    FieldAccess::byte_offset(dst.as_raw(), ty, path).into()
}

/// `dst = ((ty *) src)->path`
pub fn field_load(size: MemSize, dst: Register, src: Register, ty: &str, path: &str) -> Item {
    FieldAccess::load(dst.as_raw(), src.as_raw(), size, ty, path).into()
}

/// `dst = sizeof(((ty *) 0)->path)`
pub fn field_size(dst: Register, ty: &str, path: &str) -> Item {
    FieldAccess::byte_size(dst.as_raw(), ty, path).into()
}

pub fn field_exists(dst: Register, ty: &str, path: &str) -> Item {
    FieldAccess::field_exists(dst.as_raw(), ty, path).into()
}

/// `dst = sizeof(ty)`
pub fn type_size(dst: Register, ty: &str) -> Item {
    FieldAccess::type_size(dst.as_raw(), ty).into()
}

pub fn type_exists(dst: Register, ty: &str) -> Item {
    FieldAccess::type_exists(dst.as_raw(), ty).into()
}

pub fn enum_value(dst: Register, ty: &str, enumerator: &str) -> Item {
    FieldAccess::enum_value(dst.as_raw(), ty, enumerator).into()
}

pub fn enum_value_exists(dst: Register, ty: &str, enumerator: &str) -> Item {
    FieldAccess::enum_value_exists(dst.as_raw(), ty, enumerator).into()
}

// ---- Grouping ----

/// Group fragments into one.
pub fn seq<F: Into<Fragment>>(parts: impl IntoIterator<Item = F>) -> Fragment {
    Fragment::Seq(parts.into_iter().map(Into::into).collect())
}

/// `r0 = value; exit`
pub fn return_imm(value: i32) -> Fragment {
    seq([mov64_imm(Register::R0, value), exit()])
}

/// Look up the key stored at `r10 + key_offset` in the map bound to `handle`.
///
/// Leaves the value pointer (or null) in r0.
pub fn map_lookup(handle: &str, key_offset: i16) -> Fragment {
    seq([
        Fragment::from(mov64_reg(Register::R2, Register::FP)),
        add64_imm(Register::R2, i32::from(key_offset)).into(),
        map_ref(Register::R1, handle).into(),
        call("map_lookup_elem").into(),
    ])
}
