//! Instruction Encoding
//!
//! Every slot is eight bytes:
//!
//! ```text
//! byte   0        1         2..4         4..8
//!      opcode   src|dst   offset i16   imm i32
//! ```
//!
//! The register byte holds dst in its low nibble and src in its high nibble.
//!
//! Offset and immediate are little-endian. Wide instructions (for 64-bit
//! immediates) use two consecutive instruction slots, with the upper 32 bits in
//! the second slot's immediate field and every other field of that slot zero.
//!
//! [`BpfInsn`] is one raw slot. [`Insn`] is the logical instruction the
//! assembler works with: it carries a 64-bit immediate and knows whether it
//! needs one slot or two.

use core::fmt;

use bpf_abi::{BPF_LD_IMM64, BPF_PSEUDO_CALL, BPF_PSEUDO_MAP_FD, BPF_PSEUDO_MAP_VALUE};
use zerocopy::byteorder::little_endian::{I16, I32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::opcode::{AluOp, AtomicOp, JmpOp, MemMode, MemSize, OpcodeClass, SourceType};
use super::registers::Register;
use crate::error::InsnError;

const CALL: u8 = 0x85;
const EXIT: u8 = 0x95;

/// One raw 8-byte slot.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BpfInsn {
    pub opcode: u8,
    /// `src << 4 | dst`
    pub regs: u8,
    pub offset: i16,
    pub imm: i32,
}

/// Byte-exact wire image of a slot.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct WireSlot {
    opcode: u8,
    regs: u8,
    offset: I16,
    imm: I32,
}

impl BpfInsn {
    pub const SIZE: usize = size_of::<Self>();

    /// Register numbers are truncated to four bits.
    #[inline]
    pub const fn new(opcode: u8, dst: u8, src: u8, offset: i16, imm: i32) -> Self {
        Self {
            opcode,
            regs: ((src & 0x0f) << 4) | (dst & 0x0f),
            offset,
            imm,
        }
    }

    #[inline]
    pub const fn dst_reg(&self) -> u8 {
        self.regs & 0x0f
    }

    #[inline]
    pub const fn src_reg(&self) -> u8 {
        (self.regs >> 4) & 0x0f
    }

    /// Wire image of this slot.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let wire = WireSlot {
            opcode: self.opcode,
            regs: self.regs,
            offset: I16::new(self.offset),
            imm: I32::new(self.imm),
        };
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }

    /// Parse the first slot of `data`, or `None` if fewer than 8 bytes remain.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let (wire, _) = WireSlot::read_from_prefix(data).ok()?;
        Some(Self {
            opcode: wire.opcode,
            regs: wire.regs,
            offset: wire.offset.get(),
            imm: wire.imm.get(),
        })
    }
}

impl fmt::Debug for BpfInsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BpfInsn({:#04x} r{} r{} {:+} {:#x})",
            self.opcode,
            self.dst_reg(),
            self.src_reg(),
            self.offset,
            self.imm
        )
    }
}

/// Logical instruction: one slot, or two for the wide load.
///
/// Register fields are kept raw so that out-of-range values can be reported
/// by [`Insn::validate`] instead of being unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Insn {
    pub opcode: u8,
    pub dst: u8,
    pub src: u8,
    pub offset: i16,
    /// Must fit `i32` unless [`Insn::is_wide`].
    pub imm: i64,
}

impl Insn {
    #[inline]
    pub const fn new(opcode: u8, dst: u8, src: u8, offset: i16, imm: i64) -> Self {
        Self {
            opcode,
            dst,
            src,
            offset,
            imm,
        }
    }

    /// Build an instruction from unchecked wide values.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` does not fit 16 bits or if the
    /// instruction fails [`Insn::validate`].
    pub fn checked(opcode: u8, dst: u8, src: u8, offset: i64, imm: i64) -> Result<Self, InsnError> {
        let offset = i16::try_from(offset).map_err(|_| InsnError::OffsetOutOfRange(offset))?;
        let insn = Self::new(opcode, dst, src, offset, imm);
        insn.validate()?;
        Ok(insn)
    }

    // ---- ALU ----

    #[inline]
    pub const fn alu(op: AluOp, is_64bit: bool, dst: u8, imm: i32) -> Self {
        Self::new(op.opcode(is_64bit, SourceType::Imm), dst, 0, 0, imm as i64)
    }

    #[inline]
    pub const fn alu_reg(op: AluOp, is_64bit: bool, dst: u8, src: u8) -> Self {
        Self::new(op.opcode(is_64bit, SourceType::Reg), dst, src, 0, 0)
    }

    /// Byte swap of the low `bits` bits of `dst` to big (`to_be`) or little
    /// endian.
    #[inline]
    pub const fn endian(dst: u8, bits: i32, to_be: bool) -> Self {
        let source = if to_be {
            SourceType::Reg
        } else {
            SourceType::Imm
        };
        Self::new(AluOp::End.opcode(false, source), dst, 0, 0, bits as i64)
    }

    // ---- Jumps and calls ----

    #[inline]
    pub const fn jmp(op: JmpOp, is_64bit: bool, dst: u8, imm: i32, offset: i16) -> Self {
        Self::new(op.opcode(is_64bit, SourceType::Imm), dst, 0, offset, imm as i64)
    }

    #[inline]
    pub const fn jmp_reg(op: JmpOp, is_64bit: bool, dst: u8, src: u8, offset: i16) -> Self {
        Self::new(op.opcode(is_64bit, SourceType::Reg), dst, src, offset, 0)
    }

    /// Unconditional jump with a 16-bit displacement.
    #[inline]
    pub const fn ja(offset: i16) -> Self {
        Self::jmp(JmpOp::Ja, true, 0, 0, offset)
    }

    /// Unconditional jump with a 32-bit displacement in the immediate.
    #[inline]
    pub const fn gotol(imm: i32) -> Self {
        Self::jmp(JmpOp::Ja, false, 0, imm, 0)
    }

    /// Helper call by numeric id.
    #[inline]
    pub const fn call(helper_id: i32) -> Self {
        Self::new(CALL, 0, 0, 0, helper_id as i64)
    }

    /// Call of a local subprogram, `imm` slots after the next instruction.
    #[inline]
    pub const fn call_local(imm: i32) -> Self {
        Self::new(CALL, 0, BPF_PSEUDO_CALL, 0, imm as i64)
    }

    #[inline]
    pub const fn exit() -> Self {
        Self::new(EXIT, 0, 0, 0, 0)
    }

    // ---- Loads and stores ----

    /// Wide load of a 64-bit literal.
    #[inline]
    pub const fn ld_imm64(dst: u8, imm: i64) -> Self {
        Self::new(BPF_LD_IMM64, dst, 0, 0, imm)
    }

    /// Wide load whose immediate is a map file descriptor.
    #[inline]
    pub const fn ld_map_fd(dst: u8, fd: i32) -> Self {
        Self::new(BPF_LD_IMM64, dst, BPF_PSEUDO_MAP_FD, 0, fd as u32 as i64)
    }

    /// Wide load of the address `value_offset` bytes into a map's value area.
    #[inline]
    pub const fn ld_map_value(dst: u8, fd: i32, value_offset: u32) -> Self {
        let imm = ((value_offset as i64) << 32) | (fd as u32 as i64);
        Self::new(BPF_LD_IMM64, dst, BPF_PSEUDO_MAP_VALUE, 0, imm)
    }

    /// `dst = *(size *)(src + offset)`
    #[inline]
    pub const fn ldx(size: MemSize, dst: u8, src: u8, offset: i16) -> Self {
        Self::new(MemMode::Mem.opcode(OpcodeClass::Ldx, size), dst, src, offset, 0)
    }

    /// `*(size *)(dst + offset) = src`
    #[inline]
    pub const fn stx(size: MemSize, dst: u8, src: u8, offset: i16) -> Self {
        Self::new(MemMode::Mem.opcode(OpcodeClass::Stx, size), dst, src, offset, 0)
    }

    /// `*(size *)(dst + offset) = imm`
    #[inline]
    pub const fn st(size: MemSize, dst: u8, offset: i16, imm: i32) -> Self {
        Self::new(MemMode::Mem.opcode(OpcodeClass::St, size), dst, 0, offset, imm as i64)
    }

    /// Atomic read-modify-write of `*(size *)(dst + offset)` with `src`.
    #[inline]
    pub const fn atomic(op: AtomicOp, size: MemSize, dst: u8, src: u8, offset: i16, fetch: bool) -> Self {
        Self::new(
            MemMode::Atomic.opcode(OpcodeClass::Stx, size),
            dst,
            src,
            offset,
            op.imm(fetch) as i64,
        )
    }

    // ---- Queries ----

    #[inline]
    pub const fn class(&self) -> OpcodeClass {
        OpcodeClass::from_opcode(self.opcode)
    }

    #[inline]
    pub const fn source_type(&self) -> SourceType {
        SourceType::from_opcode(self.opcode)
    }

    /// Check if this is a wide instruction (uses next slot for 64-bit immediate).
    #[inline]
    pub const fn is_wide(&self) -> bool {
        self.opcode == BPF_LD_IMM64
    }

    /// Number of 8-byte slots this instruction occupies.
    #[inline]
    pub const fn slots(&self) -> usize {
        if self.is_wide() { 2 } else { 1 }
    }

    #[inline]
    pub const fn is_exit(&self) -> bool {
        self.opcode == EXIT
    }

    #[inline]
    pub const fn is_call(&self) -> bool {
        self.opcode == CALL
    }

    /// Check if this is a call of a local subprogram.
    #[inline]
    pub const fn is_pseudo_call(&self) -> bool {
        self.is_call() && self.src == BPF_PSEUDO_CALL
    }

    /// Check if this is the 32-bit displacement form of `ja`.
    #[inline]
    pub const fn is_long_jump(&self) -> bool {
        matches!(self.class(), OpcodeClass::Jmp32) && matches!(self.jmp_op(), Some(JmpOp::Ja))
    }

    #[inline]
    pub const fn alu_op(&self) -> Option<AluOp> {
        if self.class().is_alu() {
            AluOp::from_opcode(self.opcode)
        } else {
            None
        }
    }

    #[inline]
    pub const fn jmp_op(&self) -> Option<JmpOp> {
        if self.class().is_jump() {
            JmpOp::from_opcode(self.opcode)
        } else {
            None
        }
    }

    #[inline]
    pub const fn mem_size(&self) -> Option<MemSize> {
        if self.class().is_memory() {
            Some(MemSize::from_opcode(self.opcode))
        } else {
            None
        }
    }

    #[inline]
    pub const fn mem_mode(&self) -> Option<MemMode> {
        if self.class().is_memory() {
            MemMode::from_opcode(self.opcode)
        } else {
            None
        }
    }

    /// Check if the instruction ends a straight-line path (exit or `ja`).
    #[inline]
    pub const fn is_terminator(&self) -> bool {
        self.is_exit() || matches!(self.jmp_op(), Some(JmpOp::Ja))
    }

    /// Check if this instruction writes its destination register.
    #[inline]
    pub const fn writes_dst(&self) -> bool {
        matches!(
            self.class(),
            OpcodeClass::Alu32 | OpcodeClass::Alu64 | OpcodeClass::Ldx
        ) || self.is_wide()
    }

    #[inline]
    pub fn dst_register(&self) -> Option<Register> {
        Register::from_raw(self.dst)
    }

    #[inline]
    pub fn src_register(&self) -> Option<Register> {
        Register::from_raw(self.src)
    }

    /// Structural checks: register range, frame pointer writes and
    /// immediate width.
    pub fn validate(&self) -> Result<(), InsnError> {
        let dst = Register::try_from(self.dst)?;
        Register::try_from(self.src)?;

        if self.writes_dst() && !dst.is_writable() {
            return Err(InsnError::FramePointerWrite);
        }

        if !self.is_wide() && i32::try_from(self.imm).is_err() {
            return Err(InsnError::ImmediateOutOfRange(self.imm));
        }

        Ok(())
    }

    /// Split into wire slots without validation.
    pub fn to_slots(&self) -> (BpfInsn, Option<BpfInsn>) {
        let first = BpfInsn::new(self.opcode, self.dst, self.src, self.offset, self.imm as i32);
        if self.is_wide() {
            let next = BpfInsn::new(0, 0, 0, 0, (self.imm >> 32) as i32);
            (first, Some(next))
        } else {
            (first, None)
        }
    }

    /// Validate and append the wire form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), InsnError> {
        self.validate()?;

        let (first, next) = self.to_slots();
        out.extend_from_slice(&first.to_bytes());
        if let Some(next) = next {
            out.extend_from_slice(&next.to_bytes());
        }
        Ok(())
    }

    /// Validate and return the 8 or 16 byte wire form.
    pub fn encode(&self) -> Result<Vec<u8>, InsnError> {
        let mut out = Vec::with_capacity(self.slots() * BpfInsn::SIZE);
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// Returns the instruction and the number of bytes it occupied. Register
    /// fields are not validated, so any byte stream of the right shape
    /// decodes.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), InsnError> {
        Self::decode_at(bytes, 0)
    }

    /// Decode a whole instruction buffer.
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>, InsnError> {
        let mut insns = Vec::with_capacity(bytes.len() / BpfInsn::SIZE);
        let mut pos = 0;
        while pos < bytes.len() {
            let (insn, len) = Self::decode_at(bytes, pos)?;
            insns.push(insn);
            pos += len;
        }
        Ok(insns)
    }

    fn decode_at(bytes: &[u8], pos: usize) -> Result<(Self, usize), InsnError> {
        let first = BpfInsn::from_bytes(&bytes[pos..]).ok_or(InsnError::Truncated(pos))?;
        let mut insn = Self::new(
            first.opcode,
            first.dst_reg(),
            first.src_reg(),
            first.offset,
            i64::from(first.imm),
        );

        if !insn.is_wide() {
            return Ok((insn, BpfInsn::SIZE));
        }

        let next_pos = pos + BpfInsn::SIZE;
        let next = BpfInsn::from_bytes(&bytes[next_pos..]).ok_or(InsnError::Truncated(next_pos))?;
        if next.opcode != 0 || next.regs != 0 || next.offset != 0 {
            return Err(InsnError::MalformedWideLoad(next_pos));
        }

        insn.imm = (i64::from(next.imm) << 32) | i64::from(first.imm as u32);
        Ok((insn, 2 * BpfInsn::SIZE))
    }

    fn fmt_alu(&self, f: &mut fmt::Formatter<'_>, op: AluOp) -> fmt::Result {
        let width = if matches!(self.class(), OpcodeClass::Alu64) {
            ""
        } else {
            "32"
        };

        match op {
            AluOp::End => {
                let order = match self.source_type() {
                    SourceType::Reg => "be",
                    SourceType::Imm => "le",
                };
                write!(f, "{}{} r{}", order, self.imm, self.dst)
            }
            AluOp::Neg => write!(f, "neg{} r{}", width, self.dst),
            _ => match self.source_type() {
                SourceType::Imm => write!(f, "{}{} r{}, {}", op, width, self.dst, self.imm),
                SourceType::Reg => write!(f, "{}{} r{}, r{}", op, width, self.dst, self.src),
            },
        }
    }

    fn fmt_jmp(&self, f: &mut fmt::Formatter<'_>, op: JmpOp) -> fmt::Result {
        let width = if matches!(self.class(), OpcodeClass::Jmp) {
            ""
        } else {
            "32"
        };

        match op {
            JmpOp::Exit => write!(f, "exit"),
            JmpOp::Call if self.is_pseudo_call() => write!(f, "call pc{:+}", self.imm),
            JmpOp::Call => write!(f, "call {}", self.imm),
            JmpOp::Ja if self.is_long_jump() => write!(f, "gotol {:+}", self.imm),
            JmpOp::Ja => write!(f, "ja {:+}", self.offset),
            _ => match self.source_type() {
                SourceType::Imm => write!(
                    f,
                    "{}{} r{}, {}, {:+}",
                    op, width, self.dst, self.imm, self.offset
                ),
                SourceType::Reg => write!(
                    f,
                    "{}{} r{}, r{}, {:+}",
                    op, width, self.dst, self.src, self.offset
                ),
            },
        }
    }

    fn fmt_raw(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "op={:#04x} dst=r{} src=r{} off={} imm={}",
            self.opcode, self.dst, self.src, self.offset, self.imm
        )
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wide() {
            return match self.src {
                BPF_PSEUDO_MAP_FD => write!(f, "lddw r{}, map_fd {}", self.dst, self.imm as i32),
                BPF_PSEUDO_MAP_VALUE => write!(
                    f,
                    "lddw r{}, map_value {}+{}",
                    self.dst,
                    self.imm as i32,
                    self.imm >> 32
                ),
                _ => write!(f, "lddw r{}, {:#x}", self.dst, self.imm),
            };
        }

        if let Some(op) = self.alu_op() {
            return self.fmt_alu(f, op);
        }
        if let Some(op) = self.jmp_op() {
            return self.fmt_jmp(f, op);
        }

        let size = MemSize::from_opcode(self.opcode).suffix();
        match (self.class(), self.mem_mode()) {
            (OpcodeClass::Ldx, Some(MemMode::Mem)) => {
                write!(f, "ldx{} r{}, [r{}{:+}]", size, self.dst, self.src, self.offset)
            }
            (OpcodeClass::Stx, Some(MemMode::Mem)) => {
                write!(f, "stx{} [r{}{:+}], r{}", size, self.dst, self.offset, self.src)
            }
            (OpcodeClass::Stx, Some(MemMode::Atomic)) => match AtomicOp::from_imm(self.imm) {
                Some(op) => {
                    let fetch = if self.imm & i64::from(bpf_abi::BPF_FETCH) != 0 && !op.fetches_value() {
                        "_fetch"
                    } else {
                        ""
                    };
                    write!(
                        f,
                        "atomic{} {}{} [r{}{:+}], r{}",
                        size, op, fetch, self.dst, self.offset, self.src
                    )
                }
                None => self.fmt_raw(f),
            },
            (OpcodeClass::St, Some(MemMode::Mem)) => {
                write!(f, "st{} [r{}{:+}], {}", size, self.dst, self.offset, self.imm)
            }
            _ => self.fmt_raw(f),
        }
    }
}
