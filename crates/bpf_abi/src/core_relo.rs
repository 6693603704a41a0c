pub const BPF_CORE_FIELD_BYTE_OFFSET: u32 = 0;
pub const BPF_CORE_FIELD_BYTE_SIZE: u32 = 1;
pub const BPF_CORE_FIELD_EXISTS: u32 = 2;
pub const BPF_CORE_FIELD_SIGNED: u32 = 3;
pub const BPF_CORE_FIELD_LSHIFT_U64: u32 = 4;
pub const BPF_CORE_FIELD_RSHIFT_U64: u32 = 5;
pub const BPF_CORE_TYPE_ID_LOCAL: u32 = 6;
pub const BPF_CORE_TYPE_ID_TARGET: u32 = 7;
pub const BPF_CORE_TYPE_EXISTS: u32 = 8;
pub const BPF_CORE_TYPE_SIZE: u32 = 9;
pub const BPF_CORE_ENUMVAL_EXISTS: u32 = 10;
pub const BPF_CORE_ENUMVAL_VALUE: u32 = 11;

/// Wire record of one field-access relocation, as read by the kernel.
///
/// `insn_off` is a byte offset into the instruction buffer and
/// `access_str_off` points into the string section of the accompanying
/// type description.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BpfCoreRelo {
    pub insn_off: u32,
    pub type_id: u32,
    pub access_str_off: u32,
    pub kind: u32,
}
