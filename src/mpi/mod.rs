//! MPI launch configuration module
//!
//! Selects a launch strategy from the MPI type label and resolves the
//! launcher, its flags, MPMD support and daemon handling for a job.

mod environment;
mod resolver;
pub mod families;
pub mod launcher;
pub mod mpich;
pub mod variant;

pub use environment::{MpiEnvironmentConfig, MpmdMode};
pub use launcher::HostOs;
pub use mpich::ProcessManager;
pub use resolver::{MpiEnvironmentResolver, MpiRequest};
pub use variant::MpiVariant;
