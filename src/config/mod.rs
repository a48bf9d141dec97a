//! Configuration system
//!
//! - `schemas`: section structs declared with `config_struct!`
//! - `utils`: loading, overrides, validation and global access

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::*;
