//! Symbol Environment
//!
//! The assembler binds symbolic map handles and helper names against an
//! [`Environment`] passed in by the caller. Map descriptors are a runtime
//! fact owned by whoever created the maps; helper ids are fixed by the
//! kernel ABI. Keeping both outside the program lets one symbolic program be
//! assembled against different map instances.
//!
//! # TOML Format
//!
//! ```toml
//! kernel_helpers = true   # start from the built-in kernel table (default)
//!
//! [maps]
//! counters = 7
//! events = 9
//!
//! [helpers]
//! my_kfunc_helper = 212
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{AsmError, AsmResult};
use crate::loader::{MapRegistry, RawFd};

/// Helper name to numeric id table.
///
/// Names are stored without the `bpf_` prefix; lookups accept either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperTable {
    ids: BTreeMap<String, u32>,
}

impl HelperTable {
    /// Table with no helpers.
    pub fn empty() -> Self {
        Self {
            ids: BTreeMap::new(),
        }
    }

    /// Helpers of the kernel ABI this crate targets.
    pub fn kernel() -> Self {
        bpf_abi::BPF_HELPERS.iter().copied().collect()
    }

    /// Add or replace a helper.
    pub fn insert(&mut self, name: &str, id: u32) {
        self.ids.insert(normalize(name).to_owned(), id);
    }

    pub fn with(mut self, name: &str, id: u32) -> Self {
        self.insert(name, id);
        self
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(normalize(name)).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl Default for HelperTable {
    fn default() -> Self {
        Self::kernel()
    }
}

impl<'a> FromIterator<(&'a str, u32)> for HelperTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        let mut table = Self::empty();
        for (name, id) in iter {
            table.insert(name, id);
        }
        table
    }
}

fn normalize(name: &str) -> &str {
    name.strip_prefix("bpf_").unwrap_or(name)
}

/// Bindings for map handles and helper names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    maps: BTreeMap<String, RawFd>,
    helpers: HelperTable,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvironmentFile {
    #[serde(default = "default_kernel_helpers")]
    kernel_helpers: bool,
    #[serde(default)]
    maps: BTreeMap<String, RawFd>,
    #[serde(default)]
    helpers: BTreeMap<String, u32>,
}

fn default_kernel_helpers() -> bool {
    true
}

impl Environment {
    /// Empty map bindings with the kernel helper table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a map handle to a file descriptor.
    pub fn with_map(mut self, handle: &str, fd: RawFd) -> Self {
        self.insert_map(handle, fd);
        self
    }

    pub fn insert_map(&mut self, handle: &str, fd: RawFd) {
        self.maps.insert(handle.to_owned(), fd);
    }

    /// Replace the helper table.
    pub fn with_helpers(mut self, helpers: HelperTable) -> Self {
        self.helpers = helpers;
        self
    }

    /// Add one helper on top of the current table.
    pub fn with_helper(mut self, name: &str, id: u32) -> Self {
        self.helpers.insert(name, id);
        self
    }

    pub fn map_fd(&self, handle: &str) -> Option<RawFd> {
        self.maps.get(handle).copied()
    }

    pub fn helper_id(&self, name: &str) -> Option<u32> {
        self.helpers.get(name)
    }

    pub fn maps(&self) -> impl Iterator<Item = (&str, RawFd)> {
        self.maps.iter().map(|(handle, fd)| (handle.as_str(), *fd))
    }

    #[inline]
    pub fn helpers(&self) -> &HelperTable {
        &self.helpers
    }

    /// Snapshot the maps a registry currently knows about.
    pub fn from_registry(registry: &impl MapRegistry) -> Self {
        let mut env = Self::new();
        for (handle, fd) in registry.maps() {
            env.insert_map(&handle, fd);
        }
        env
    }

    /// Parse an environment from TOML.
    pub fn from_toml_str(text: &str) -> AsmResult<Self> {
        let file: EnvironmentFile =
            toml::from_str(text).map_err(|err| AsmError::Config(err.to_string()))?;

        let mut helpers = if file.kernel_helpers {
            HelperTable::kernel()
        } else {
            HelperTable::empty()
        };
        for (name, id) in &file.helpers {
            helpers.insert(name, *id);
        }

        Ok(Self {
            maps: file.maps,
            helpers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_helpers_resolve_with_or_without_prefix() {
        let helpers = HelperTable::kernel();
        assert_eq!(helpers.get("map_lookup_elem"), Some(1));
        assert_eq!(helpers.get("bpf_map_lookup_elem"), Some(1));
        assert_eq!(helpers.get("ringbuf_output"), Some(130));
        assert_eq!(helpers.get("not_a_helper"), None);
    }

    #[test]
    fn environment_bindings() {
        let env = Environment::new()
            .with_map("counter_map", 7)
            .with_helper("custom", 999);
        assert_eq!(env.map_fd("counter_map"), Some(7));
        assert_eq!(env.map_fd("other"), None);
        assert_eq!(env.helper_id("custom"), Some(999));
        assert_eq!(env.helper_id("ktime_get_ns"), Some(5));
    }

    #[test]
    fn toml_environment() {
        let env = Environment::from_toml_str(
            r#"
            [maps]
            counters = 7
            events = 9

            [helpers]
            ktime_get_ns = 500
            my_helper = 212
            "#,
        )
        .unwrap();

        assert_eq!(env.map_fd("counters"), Some(7));
        assert_eq!(env.map_fd("events"), Some(9));
        assert_eq!(env.helper_id("ktime_get_ns"), Some(500));
        assert_eq!(env.helper_id("my_helper"), Some(212));
        assert_eq!(env.helper_id("map_lookup_elem"), Some(1));
    }

    #[test]
    fn toml_without_kernel_helpers() {
        let env = Environment::from_toml_str("kernel_helpers = false\n[helpers]\nonly = 3\n").unwrap();
        assert_eq!(env.helpers().len(), 1);
        assert_eq!(env.helper_id("map_lookup_elem"), None);
    }

    #[test]
    fn toml_errors_are_config_errors() {
        let err = Environment::from_toml_str("[maps]\ncounters = \"seven\"\n").unwrap_err();
        assert!(matches!(err, AsmError::Config(_)));

        let err = Environment::from_toml_str("[mapz]\n").unwrap_err();
        assert!(matches!(err, AsmError::Config(_)));
    }
}
