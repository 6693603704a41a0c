//! Assembler configuration.

use serde::Deserialize;

use crate::error::{AsmError, AsmResult};

/// Limits and strictness applied by [`crate::Assembler`].
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// max_instructions = 4096
/// require_exit = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblerConfig {
    /// Ceiling on physical instruction slots.
    pub max_instructions: usize,
    /// Reject programs whose last instruction is not `exit` or `ja`.
    pub require_exit: bool,
}

impl AssemblerConfig {
    /// Limit for unprivileged loaders.
    pub const fn unprivileged() -> Self {
        Self {
            max_instructions: bpf_abi::BPF_MAXINSNS,
            require_exit: false,
        }
    }

    pub const fn with_max_instructions(mut self, max_instructions: usize) -> Self {
        self.max_instructions = max_instructions;
        self
    }

    pub const fn with_require_exit(mut self, require_exit: bool) -> Self {
        self.require_exit = require_exit;
        self
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(text: &str) -> AsmResult<Self> {
        toml::from_str(text).map_err(|err| AsmError::Config(err.to_string()))
    }
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_instructions: bpf_abi::BPF_COMPLEXITY_LIMIT_INSNS,
            require_exit: false,
        }
    }
}
