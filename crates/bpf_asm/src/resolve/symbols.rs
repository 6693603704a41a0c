//! Map and Helper Binding
//!
//! Replaces map references with wide loads carrying the map's file
//! descriptor and helper calls with `call <id>`. The kernel tells a map
//! reference apart from a literal by the sentinel in the source register
//! field of the wide load.

use log::trace;

use crate::bytecode::Insn;
use crate::env::Environment;
use crate::error::{AsmError, AsmResult, InsnError, SymbolKind};

/// `dst = map_fd(handle)`
pub fn bind_map(dst: u8, handle: &str, slot: usize, env: &Environment) -> AsmResult<Insn> {
    let fd = env
        .map_fd(handle)
        .ok_or_else(|| AsmError::unresolved(SymbolKind::MapHandle, handle, slot))?;
    trace!("slot {}: map `{}` -> fd {}", slot, handle, fd);
    Ok(Insn::ld_map_fd(dst, fd))
}

/// `dst = &map_value(handle)[offset]`
pub fn bind_map_value(
    dst: u8,
    handle: &str,
    offset: u32,
    slot: usize,
    env: &Environment,
) -> AsmResult<Insn> {
    let fd = env
        .map_fd(handle)
        .ok_or_else(|| AsmError::unresolved(SymbolKind::MapHandle, handle, slot))?;
    trace!("slot {}: map value `{}`+{} -> fd {}", slot, handle, offset, fd);
    Ok(Insn::ld_map_value(dst, fd, offset))
}

/// `call <helper id>`
pub fn bind_helper(name: &str, slot: usize, env: &Environment) -> AsmResult<Insn> {
    let id = env
        .helper_id(name)
        .ok_or_else(|| AsmError::unresolved(SymbolKind::Helper, name, slot))?;
    let imm = i32::try_from(id).map_err(|_| AsmError::Structural {
        slot,
        source: InsnError::ImmediateOutOfRange(i64::from(id)),
    })?;
    trace!("slot {}: helper `{}` -> {}", slot, name, id);
    Ok(Insn::call(imm))
}
