//! Symbol Resolution
//!
//! The passes that turn symbolic items into concrete instructions:
//!
//! - [`labels`]: slot layout and jump displacements
//! - [`symbols`]: map descriptors and helper ids
//! - [`reloc`]: field-access placeholders and relocation records
//!
//! Each pass is a pure function of its inputs. Label layout must run first
//! since every other pass reports errors by slot.

pub mod labels;
pub mod reloc;
pub mod symbols;

pub use labels::{Layout, resolve_jump};
pub use reloc::{CoreRelocation, RelocGenerator};
pub use symbols::{bind_helper, bind_map, bind_map_value};
