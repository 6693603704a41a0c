//! Registers
//!
//! | Register | Role at a call boundary |
//! |----------|-------------------------|
//! | r0       | return value            |
//! | r1-r5    | arguments, clobbered    |
//! | r6-r9    | preserved               |
//! | r10      | frame pointer, read-only |
//!
//! The wire format has four bits per register, so 11..=15 fit in an encoded
//! instruction but name nothing.

use core::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
}

impl Register {
    pub const ALL: [Self; 11] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub const FP: Self = Self::R10;

    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_frame_pointer(self) -> bool {
        matches!(self, Self::R10)
    }

    /// r10 is the only register an instruction may not write.
    #[inline]
    pub const fn is_writable(self) -> bool {
        !self.is_frame_pointer()
    }

    /// Helper and subprogram argument registers, r1-r5.
    #[inline]
    pub const fn is_argument(self) -> bool {
        matches!(self as u8, 1..=5)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.as_raw())
    }
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        reg.as_raw()
    }
}

impl TryFrom<u8> for Register {
    type Error = InvalidRegister;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_raw(value).ok_or(InvalidRegister(value))
    }
}

/// Register number outside r0-r10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no register r{0}")]
pub struct InvalidRegister(pub u8);
