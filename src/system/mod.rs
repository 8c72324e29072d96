//! Batch system and resource detection module
//!
//! Reads the job environment to identify the resource manager, resolve
//! process and node counts, and produce host lists and host files.

mod resources;
pub mod batch;
pub mod command;
pub mod env;
pub mod hosts;

pub use batch::{BatchJobInfo, ResourceManagerKind};
pub use command::{assemble_args, enquote_arg, separate_args, CommandRunner, SystemRunner};
pub use env::Environment;
pub use resources::*;
