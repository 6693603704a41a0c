//! Opcode Fields
//!
//! The opcode byte packs up to three fields. Which ones depend on the class
//! in the low three bits:
//!
//! ```text
//!   7      4   3   2    0
//! ┌─────────┬─────┬──────┐
//! │   op    │ src │class │   ALU / JMP
//! ├─────┬───┴─────┼──────┤
//! │mode │  size   │class │   LD / LDX / ST / STX
//! └─────┴─────────┴──────┘
//! ```
//!
//! Atomic instructions reuse the STX layout and put their operation in the
//! low byte of the immediate.

use core::fmt;

/// Declares a field enum whose discriminants are the raw field bits, with a
/// masked decoder and mnemonic table.
macro_rules! op_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident [$decode:ident, $mask:literal] {
            $( $(#[$vmeta:meta])* $variant:ident = $bits:literal => $mnemonic:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $bits, )+
        }

        impl $name {
            #[inline]
            pub const fn $decode(bits: u8) -> Option<Self> {
                match bits & $mask {
                    $( $bits => Some(Self::$variant), )+
                    _ => None,
                }
            }

            #[inline]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Self::$variant => $mnemonic, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}

/// Instruction class, the low three bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpcodeClass {
    Ld = 0x00,
    Ldx = 0x01,
    St = 0x02,
    Stx = 0x03,
    Alu32 = 0x04,
    Jmp = 0x05,
    Jmp32 = 0x06,
    Alu64 = 0x07,
}

impl OpcodeClass {
    const BY_BITS: [Self; 8] = [
        Self::Ld,
        Self::Ldx,
        Self::St,
        Self::Stx,
        Self::Alu32,
        Self::Jmp,
        Self::Jmp32,
        Self::Alu64,
    ];

    /// Every byte has a class, so this never fails.
    #[inline]
    pub const fn from_opcode(opcode: u8) -> Self {
        Self::BY_BITS[(opcode & 0x07) as usize]
    }

    #[inline]
    pub const fn is_load(self) -> bool {
        matches!(self, Self::Ld | Self::Ldx)
    }

    #[inline]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::St | Self::Stx)
    }

    #[inline]
    pub const fn is_memory(self) -> bool {
        (self as u8) < Self::Alu32 as u8
    }

    #[inline]
    pub const fn is_alu(self) -> bool {
        matches!(self, Self::Alu32 | Self::Alu64)
    }

    #[inline]
    pub const fn is_jump(self) -> bool {
        matches!(self, Self::Jmp | Self::Jmp32)
    }
}

/// Second operand of ALU and JMP instructions, bit 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SourceType {
    /// The 32-bit immediate.
    Imm = 0x00,
    /// The source register.
    Reg = 0x08,
}

impl SourceType {
    #[inline]
    pub const fn from_opcode(opcode: u8) -> Self {
        if opcode & Self::Reg as u8 == 0 {
            Self::Imm
        } else {
            Self::Reg
        }
    }
}

op_enum! {
    /// ALU operation, the high nibble of an ALU-class opcode.
    ///
    /// `End` is the byte swap; its source bit selects big endian.
    pub enum AluOp [from_opcode, 0xf0] {
        Add = 0x00 => "add",
        Sub = 0x10 => "sub",
        Mul = 0x20 => "mul",
        Div = 0x30 => "div",
        Or = 0x40 => "or",
        And = 0x50 => "and",
        Lsh = 0x60 => "lsh",
        Rsh = 0x70 => "rsh",
        Neg = 0x80 => "neg",
        Mod = 0x90 => "mod",
        Xor = 0xa0 => "xor",
        Mov = 0xb0 => "mov",
        /// Sign-propagating right shift.
        Arsh = 0xc0 => "arsh",
        End = 0xd0 => "end",
    }
}

impl AluOp {
    #[inline]
    pub const fn opcode(self, is_64bit: bool, source: SourceType) -> u8 {
        let class = if is_64bit {
            OpcodeClass::Alu64
        } else {
            OpcodeClass::Alu32
        };
        self as u8 | source as u8 | class as u8
    }
}

op_enum! {
    /// Jump operation, the high nibble of a JMP-class opcode.
    ///
    /// Comparisons without an `s` are unsigned.
    pub enum JmpOp [from_opcode, 0xf0] {
        Ja = 0x00 => "ja",
        Jeq = 0x10 => "jeq",
        Jgt = 0x20 => "jgt",
        Jge = 0x30 => "jge",
        /// Taken when `dst & src` is non-zero.
        Jset = 0x40 => "jset",
        Jne = 0x50 => "jne",
        Jsgt = 0x60 => "jsgt",
        Jsge = 0x70 => "jsge",
        Call = 0x80 => "call",
        Exit = 0x90 => "exit",
        Jlt = 0xa0 => "jlt",
        Jle = 0xb0 => "jle",
        Jslt = 0xc0 => "jslt",
        Jsle = 0xd0 => "jsle",
    }
}

impl JmpOp {
    #[inline]
    pub const fn opcode(self, is_64bit: bool, source: SourceType) -> u8 {
        let class = if is_64bit {
            OpcodeClass::Jmp
        } else {
            OpcodeClass::Jmp32
        };
        self as u8 | source as u8 | class as u8
    }

    /// Whether the instruction carries a displacement to a target.
    #[inline]
    pub const fn is_branch(self) -> bool {
        !matches!(self, Self::Call | Self::Exit)
    }
}

/// Access width, bits 3-4 of a memory-class opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemSize {
    Word = 0x00,
    Half = 0x08,
    Byte = 0x10,
    DWord = 0x18,
}

impl MemSize {
    const BY_BITS: [Self; 4] = [Self::Word, Self::Half, Self::Byte, Self::DWord];

    #[inline]
    pub const fn from_opcode(opcode: u8) -> Self {
        Self::BY_BITS[((opcode >> 3) & 0x03) as usize]
    }

    #[inline]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::DWord => 8,
        }
    }

    /// Width suffix in the listing (`ldxw`, `stxdw`).
    #[inline]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Byte => "b",
            Self::Half => "h",
            Self::Word => "w",
            Self::DWord => "dw",
        }
    }
}

op_enum! {
    /// Addressing mode, the top three bits of a memory-class opcode.
    pub enum MemMode [from_opcode, 0xe0] {
        /// Only used by the wide load.
        Imm = 0x00 => "imm",
        /// Legacy packet access.
        Abs = 0x20 => "abs",
        /// Legacy packet access.
        Ind = 0x40 => "ind",
        Mem = 0x60 => "mem",
        Atomic = 0xc0 => "atomic",
    }
}

impl MemMode {
    #[inline]
    pub const fn opcode(self, class: OpcodeClass, size: MemSize) -> u8 {
        self as u8 | size as u8 | class as u8
    }
}

op_enum! {
    /// Read-modify-write operation, stored in the immediate of an atomic.
    pub enum AtomicOp [from_low_byte, 0xf0] {
        Add = 0x00 => "add",
        Or = 0x40 => "or",
        And = 0x50 => "and",
        Xor = 0xa0 => "xor",
        Xchg = 0xe0 => "xchg",
        Cmpxchg = 0xf0 => "cmpxchg",
    }
}

impl AtomicOp {
    #[inline]
    pub const fn from_imm(imm: i64) -> Option<Self> {
        Self::from_low_byte(imm as u8)
    }

    /// Immediate for this operation. Exchanges always fetch.
    #[inline]
    pub const fn imm(self, fetch: bool) -> i32 {
        if fetch || self.fetches_value() {
            self as i32 | bpf_abi::BPF_FETCH
        } else {
            self as i32
        }
    }

    #[inline]
    pub const fn fetches_value(self) -> bool {
        matches!(self, Self::Xchg | Self::Cmpxchg)
    }
}
