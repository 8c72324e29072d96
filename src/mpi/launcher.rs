//! Launcher discovery
//!
//! Strategies look launchers up in the search directories (the MPI bindir
//! when configured, `PATH` otherwise). A launcher found in the bindir is
//! recorded by absolute path; one found through `PATH` is recorded by name
//! so the job resolves it the same way at run time.

use crate::system::{CommandRunner, Environment};
use std::path::{Path, PathBuf};

/// Operating system family, for launcher conventions that depend on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    /// Linux, macOS and other Unix systems
    Unix,
    /// Microsoft Windows
    Windows,
    /// IBM AIX
    Aix,
}

impl HostOs {
    /// Family of the running system
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => HostOs::Windows,
            "aix" => HostOs::Aix,
            _ => HostOs::Unix,
        }
    }
}

/// Inputs shared by all launch strategies
pub struct LaunchContext<'a> {
    /// MPI type label as configured
    pub label: &'a str,
    /// Directories searched for launchers and helpers
    pub search_dirs: &'a [PathBuf],
    /// MPI bindir, when configured
    pub bindir: Option<&'a Path>,
    /// Directory for generated files
    pub wdir: Option<&'a Path>,
    /// Environment snapshot
    pub env: &'a Environment,
    /// Runs helper programs
    pub runner: &'a dyn CommandRunner,
    /// Host operating system
    pub os: HostOs,
}

impl LaunchContext<'_> {
    /// Check whether a directory is the configured bindir
    pub fn is_bindir(&self, dir: &Path) -> bool {
        self.bindir.is_some_and(|b| b == dir)
    }

    /// Name to record for an executable found in `dir`
    pub fn recorded_name(&self, dir: &Path, name: &str) -> String {
        if self.is_bindir(dir) {
            dir.join(name).to_string_lossy().into_owned()
        } else {
            name.to_string()
        }
    }
}

/// A launcher located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundLauncher {
    /// Absolute path of the executable
    pub path: PathBuf,
    /// Directory it was found in
    pub dir: PathBuf,
    /// Name or path to record in the configuration
    pub recorded: String,
}

/// Probe candidate names across the search directories
///
/// Directories are scanned in order, and within each directory the
/// candidates in priority order. The first existing file accepted by
/// `accept` wins.
pub fn probe_launchers<F>(ctx: &LaunchContext<'_>, candidates: &[&str], mut accept: F) -> Option<FoundLauncher>
where
    F: FnMut(&Path) -> bool,
{
    for dir in ctx.search_dirs {
        for name in candidates {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            if !accept(&path) {
                tracing::debug!("Skipping launcher {}", path.display());
                continue;
            }
            return Some(FoundLauncher {
                recorded: ctx.recorded_name(dir, name),
                dir: dir.clone(),
                path,
            });
        }
    }
    None
}

/// Absolute path of a configured launcher
///
/// Only the first word is looked up, so a configured value may carry
/// options of its own.
pub fn resolve_pinned(ctx: &LaunchContext<'_>, launcher: &str) -> Option<PathBuf> {
    let program = launcher.split_whitespace().next()?;
    crate::system::command::find_in_dirs(program, ctx.search_dirs)
}

/// File name of a recorded launcher, without directory or options
pub fn launcher_basename(launcher: &str) -> &str {
    let program = launcher.split_whitespace().next().unwrap_or("");
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}
