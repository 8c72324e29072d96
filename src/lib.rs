//! # hpclaunch - MPI launch resolution for HPC batch jobs
//!
//! hpclaunch works out how a parallel job should be started: which batch
//! system it runs under, how many processes and nodes it was given, and the
//! launcher invocation required by the MPI library in use.
//!
//! ## Features
//!
//! - **Batch System Detection**: LSF, PBS, LoadLeveler, SGE and SLURM
//! - **Resource Resolution**: Process and node counts, host lists, host files
//! - **MPI Launchers**: MPICH family (Hydra, MPD, SMPD, gforker), Open MPI,
//!   Blue Gene/P and /Q, Platform MPI, MS-MPI, MPIBULL2
//! - **Configuration Overlay**: Site and user settings override detection
//!
//! ## Quick Start
//!
//! ```no_run
//! use hpclaunch::exec::{ExecEnvironment, ExecOptions};
//! use hpclaunch::system::{Environment, SystemRunner};
//!
//! let options = ExecOptions {
//!     mpi_label: "OpenMPI".to_string(),
//!     ..Default::default()
//! };
//! let exec = ExecEnvironment::resolve(&options, &Environment::capture(), &SystemRunner::new()).unwrap();
//!
//! let plan = exec.plan();
//! println!("{}", plan.launch_command("./solver", &["-in", "case.xml"]));
//! ```
//!
//! ## Resources Only
//!
//! ```no_run
//! use hpclaunch::system::{BatchJobInfo, Environment, ResourceResolver};
//!
//! let env = Environment::capture();
//! let resources = ResourceResolver::new()
//!     .with_default_n_procs(Some(1))
//!     .resolve(BatchJobInfo::detect(&env), &env);
//! resources.print_summary();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod exec;
pub mod mpi;
pub mod system;

// Re-export commonly used types
pub use config::ConfigOverlay;
pub use error::{LaunchError, Result};
pub use exec::{ExecEnvironment, ExecOptions, LaunchPlan};
pub use mpi::{MpiEnvironmentConfig, MpiEnvironmentResolver, MpiVariant, MpmdMode};
pub use system::{BatchJobInfo, ResourceAllocation, ResourceManagerKind, ResourceResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
