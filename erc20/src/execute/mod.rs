//! Execute handlers for the erc20 conversion module.
//!
//! - `registry` - pair registration, enablement and parameter updates
//! - `convert` - the conversion engine and its user-facing handlers

mod convert;
mod registry;

pub use convert::*;
pub use registry::*;
