//! MPI environment resolution
//!
//! Resolution runs three passes over one [`MpiEnvironmentConfig`]:
//!
//! 1. the overlay is applied, so a configured launcher is visible to the
//!    family strategy and short-circuits its search;
//! 2. the strategy for the MPI type label fills in launcher details;
//! 3. the overlay is applied again, so configured values override
//!    anything the strategy detected.

use super::environment::MpiEnvironmentConfig;
use super::families;
use super::launcher::{HostOs, LaunchContext};
use super::mpich;
use super::variant::MpiVariant;
use crate::config::ConfigOverlay;
use crate::error::Result;
use crate::system::{CommandRunner, Environment, ResourceAllocation};
use std::path::PathBuf;

/// MPI library to resolve a launch configuration for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MpiRequest {
    /// MPI type label, empty when unknown
    pub label: String,
    /// Directory containing the MPI launchers
    pub bindir: Option<PathBuf>,
    /// Directory for generated host files
    pub wdir: Option<PathBuf>,
}

impl MpiRequest {
    /// Create a request for a type label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set the MPI bindir
    pub fn with_bindir(mut self, bindir: Option<PathBuf>) -> Self {
        self.bindir = bindir;
        self
    }

    /// Set the directory for generated files
    pub fn with_wdir(mut self, wdir: Option<PathBuf>) -> Self {
        self.wdir = wdir;
        self
    }

    /// Directories searched for launchers
    ///
    /// A non-empty bindir is searched alone; otherwise `PATH` is used.
    pub fn search_dirs(&self, env: &Environment) -> Vec<PathBuf> {
        match self.bindir.as_ref().filter(|b| !b.as_os_str().is_empty()) {
            Some(bindir) => vec![bindir.clone()],
            None => env.search_path(),
        }
    }
}

type Strategy = fn(&mut MpiEnvironmentConfig, &mut ResourceAllocation, &LaunchContext<'_>) -> Result<()>;

fn strategy(variant: MpiVariant) -> Strategy {
    match variant {
        MpiVariant::Mpich => mpich::init_mpich,
        MpiVariant::MsMpi => families::init_msmpi,
        MpiVariant::OpenMpi => families::init_openmpi,
        MpiVariant::BlueGeneP => families::init_bgp,
        MpiVariant::BlueGeneQ => families::init_bgq,
        MpiVariant::PlatformMpi => families::init_platform_mpi,
        MpiVariant::MpiBull2 => families::init_mpibull2,
        MpiVariant::Generic => families::init_generic,
    }
}

/// Resolves MPI launch configurations
pub struct MpiEnvironmentResolver<'a> {
    runner: &'a dyn CommandRunner,
    os: HostOs,
}

impl<'a> MpiEnvironmentResolver<'a> {
    /// Create a resolver for the running system
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            os: HostOs::current(),
        }
    }

    /// Resolve as if running on another operating system family
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    /// Resolve the launch configuration for an allocation
    ///
    /// The allocation is mutable because strategies may generate its host
    /// file.
    pub fn resolve(
        &self,
        alloc: &mut ResourceAllocation,
        request: &MpiRequest,
        overlay: &ConfigOverlay,
        env: &Environment,
    ) -> Result<MpiEnvironmentConfig> {
        let mut config = MpiEnvironmentConfig::new(request.label.as_str());
        overlay.apply(&mut config)?;

        let search_dirs = request.search_dirs(env);
        let bindir = request
            .bindir
            .as_deref()
            .filter(|b| !b.as_os_str().is_empty());
        let ctx = LaunchContext {
            label: &request.label,
            search_dirs: &search_dirs,
            bindir,
            wdir: request.wdir.as_deref(),
            env,
            runner: self.runner,
            os: self.os,
        };

        tracing::info!("Resolving MPI environment for {}", config.variant);
        strategy(config.variant)(&mut config, alloc, &ctx)?;

        overlay.apply(&mut config)?;

        tracing::info!(
            "MPI launcher: {}",
            config.mpiexec.as_deref().unwrap_or("none")
        );
        Ok(config)
    }
}
