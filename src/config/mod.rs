//! Configuration module for hpclaunch
//!
//! Provides the CLI arguments and the MPI settings overlay read from
//! site and user configuration files.

mod overlay;
mod settings;

pub use overlay::*;
pub use settings::*;
