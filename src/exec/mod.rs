//! Execution environment
//!
//! Combines batch detection, resource resolution and MPI resolution into
//! the [`LaunchPlan`] handed to whatever actually starts the job.

use crate::config::ConfigOverlay;
use crate::error::{LaunchError, Result};
use crate::mpi::{MpiEnvironmentConfig, MpiEnvironmentResolver, MpiRequest};
use crate::system::{
    assemble_args, enquote_arg, BatchJobInfo, CommandRunner, Environment, ResourceAllocation,
    ResourceResolver,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inputs for an execution environment
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// MPI type label
    pub mpi_label: String,
    /// MPI bindir
    pub bindir: Option<PathBuf>,
    /// Working directory (default: current directory)
    pub wdir: Option<PathBuf>,
    /// Explicit process count
    pub n_procs: Option<usize>,
    /// Process count when nothing else provides one
    pub n_procs_default: Option<usize>,
    /// Caller-supplied host list
    pub hosts_list: Option<Vec<String>>,
    /// MPI settings overrides
    pub overlay: ConfigOverlay,
}

/// Resolved execution environment
#[derive(Debug, Clone)]
pub struct ExecEnvironment {
    /// User running the job
    pub user: Option<String>,
    /// Working directory
    pub wdir: PathBuf,
    /// Resources allocated to the job
    pub resources: ResourceAllocation,
    /// MPI launch configuration
    pub mpi: MpiEnvironmentConfig,
}

impl ExecEnvironment {
    /// Resolve resources and MPI settings for the current job
    pub fn resolve(options: &ExecOptions, env: &Environment, runner: &dyn CommandRunner) -> Result<Self> {
        let user_var = if cfg!(windows) { "USERNAME" } else { "USER" };
        let user = env.var(user_var).map(str::to_string);

        let wdir = match &options.wdir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| LaunchError::io(".", e))?,
        };

        let mut resolver = ResourceResolver::new()
            .with_n_procs(options.n_procs)
            .with_default_n_procs(options.n_procs_default);
        if let Some(hosts) = &options.hosts_list {
            resolver = resolver.with_hosts_list(hosts.clone());
        }
        let mut resources = resolver.resolve(BatchJobInfo::detect(env), env);

        let request = MpiRequest::new(options.mpi_label.as_str())
            .with_bindir(options.bindir.clone())
            .with_wdir(Some(wdir.clone()));
        let mpi = MpiEnvironmentResolver::new(runner).resolve(
            &mut resources,
            &request,
            &options.overlay,
            env,
        )?;

        Ok(Self {
            user,
            wdir,
            resources,
            mpi,
        })
    }

    /// Build the launch plan
    pub fn plan(&self) -> LaunchPlan {
        let warnings = self
            .resources
            .warnings
            .iter()
            .chain(&self.mpi.warnings)
            .cloned()
            .collect();
        LaunchPlan {
            user: self.user.clone(),
            wdir: self.wdir.clone(),
            command_prefix: compose_prefix(&self.mpi, self.resources.n_procs),
            batch: self.resources.batch.clone(),
            resources: self.resources.clone(),
            mpi: self.mpi.clone(),
            warnings,
        }
    }
}

/// Everything needed to start the job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    /// User running the job
    pub user: Option<String>,
    /// Working directory
    pub wdir: PathBuf,
    /// Launcher with its options, host file and counts
    pub command_prefix: String,
    /// Batch job the plan was resolved under
    pub batch: BatchJobInfo,
    /// Resolved resources
    pub resources: ResourceAllocation,
    /// Resolved MPI settings
    pub mpi: MpiEnvironmentConfig,
    /// Warnings from resource and MPI resolution
    pub warnings: Vec<String>,
}

impl LaunchPlan {
    /// Launcher, options, host file and process counts
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Full command line running `program` with `args`
    pub fn launch_command<S: AsRef<str>>(&self, program: &str, args: &[S]) -> String {
        let mut cmd = self.command_prefix.clone();
        for flag in [&self.mpi.mpiexec_separator, &self.mpi.mpiexec_exe]
            .into_iter()
            .flatten()
        {
            push_word(&mut cmd, flag);
        }
        push_word(&mut cmd, &enquote_arg(program));
        if !args.is_empty() {
            if let Some(flag) = &self.mpi.mpiexec_args {
                push_word(&mut cmd, flag);
            }
            push_word(&mut cmd, &assemble_args(args));
        }
        cmd
    }

    /// Print the plan to console
    pub fn print_summary(&self) {
        println!("=== Launch Plan ===\n");
        if let Some(user) = &self.user {
            println!("  User: {}", user);
        }
        println!("  Working directory: {}", self.wdir.display());
        println!("  Command prefix: {}", self.command_prefix);
        if let Some(boot) = &self.mpi.mpiboot {
            println!("  Boot: {}", boot);
        }
        if let Some(halt) = &self.mpi.mpihalt {
            println!("  Halt: {}", halt);
        }
        println!();
        self.resources.print_summary();
        println!();
        self.mpi.print_summary();
    }
}

/// Concatenate the launcher pieces
///
/// Flag texts carry their own spacing; a space is only inserted where a
/// piece would otherwise run into the previous one.
fn compose_prefix(mpi: &MpiEnvironmentConfig, n_procs: Option<usize>) -> String {
    let mut cmd = mpi.mpiexec.clone().unwrap_or_default();
    for piece in [&mpi.mpiexec_opts, &mpi.mpiexec_hostsfile].into_iter().flatten() {
        push_word(&mut cmd, piece);
    }
    if let (Some(flag), Some(n)) = (&mpi.mpiexec_n, n_procs) {
        push_word(&mut cmd, flag);
        if !(flag.ends_with(char::is_whitespace) || flag.ends_with('=')) {
            cmd.push(' ');
        }
        cmd.push_str(&n.to_string());
    }
    if let Some(ppn) = &mpi.mpiexec_n_per_node {
        push_word(&mut cmd, ppn);
    }
    cmd
}

fn push_word(cmd: &mut String, word: &str) {
    let needs_space = !cmd.is_empty()
        && !cmd.ends_with(char::is_whitespace)
        && !word.starts_with(char::is_whitespace);
    if needs_space {
        cmd.push(' ');
    }
    cmd.push_str(word);
}
