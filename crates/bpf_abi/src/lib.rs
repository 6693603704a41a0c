#![no_std]

mod bpf;
mod core_relo;
mod helpers;

pub use bpf::*;
pub use core_relo::*;
pub use helpers::*;
