use bitflags::bitflags;

pub const BPF_PROG_LOAD: u32 = 5;
pub const BPF_BTF_LOAD: u32 = 18;

/// Instruction ceiling for unprivileged loaders.
pub const BPF_MAXINSNS: usize = 4096;
/// Instruction ceiling the verifier enforces for privileged loaders.
pub const BPF_COMPLEXITY_LIMIT_INSNS: usize = 1_000_000;

/// Opcode of the two-slot 64-bit immediate load (`LD | IMM | DW`).
pub const BPF_LD_IMM64: u8 = 0x18;

// Values of the src_reg field of a wide load that turn the immediate into a
// map reference instead of a literal.
pub const BPF_PSEUDO_MAP_FD: u8 = 1;
pub const BPF_PSEUDO_MAP_VALUE: u8 = 2;

// Value of the src_reg field of a CALL that makes it a bpf-to-bpf call with a
// relative immediate.
pub const BPF_PSEUDO_CALL: u8 = 1;

// Flag in the immediate of an atomic instruction that writes the old value back
// into src_reg.
pub const BPF_FETCH: i32 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum BpfProgType {
    #[default]
    Unspec = 0,
    SocketFilter = 1,
    Kprobe = 2,
    SchedCls = 3,
    SchedAct = 4,
    Tracepoint = 5,
    Xdp = 6,
    PerfEvent = 7,
    CgroupSkb = 8,
    CgroupSock = 9,
    LwtIn = 10,
    LwtOut = 11,
    LwtXmit = 12,
    SockOps = 13,
    SkSkb = 14,
    CgroupDevice = 15,
    SkMsg = 16,
    RawTracepoint = 17,
    Tracing = 26,
    Lsm = 29,
}

impl BpfProgType {
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProgLoadFlags: u32 {
        const STRICT_ALIGNMENT = 1 << 0;
        const ANY_ALIGNMENT    = 1 << 1;
        const TEST_RND_HI32    = 1 << 2;
        const TEST_STATE_FREQ  = 1 << 3;
        const SLEEPABLE        = 1 << 4;
        const XDP_HAS_FRAGS    = 1 << 5;
    }
}

bitflags! {
    /// Verbosity of the verifier log returned on load.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LogLevel: u32 {
        const LEVEL1 = 1;
        const LEVEL2 = 2;
        const STATS  = 4;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BpfProgLoadAttr {
    // Note: this mirrors the prog_load variant of the kernel's bpf_attr union.
    // Pointer fields are left zero until the loader pins the buffers.
    pub prog_type: u32,
    pub insn_cnt: u32,
    pub insns: u64,   // pointer to instructions
    pub license: u64, // pointer to NUL terminated license string
    pub log_level: u32,
    pub log_size: u32,
    pub log_buf: u64, // pointer to log buffer
    pub kern_version: u32,
    pub prog_flags: u32,
    pub prog_name: [u8; 16],
    pub prog_ifindex: u32,
    pub expected_attach_type: u32,
    pub prog_btf_fd: u32,
    pub func_info_rec_size: u32,
    pub func_info: u64,
    pub func_info_cnt: u32,
    pub line_info_rec_size: u32,
    pub line_info: u64,
    pub line_info_cnt: u32,
    pub attach_btf_id: u32,
    pub attach_prog_fd: u32,
    pub core_relo_cnt: u32,
    pub fd_array: u64,
    pub core_relos: u64, // pointer to BpfCoreRelo records
    pub core_relo_rec_size: u32,
    pub log_true_size: u32,
}

impl BpfProgLoadAttr {
    /// Copy `name` into the fixed-size name field, truncating to 15 bytes so
    /// the field stays NUL terminated.
    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(self.prog_name.len() - 1);
        self.prog_name = [0; 16];
        self.prog_name[..len].copy_from_slice(&bytes[..len]);
    }
}
