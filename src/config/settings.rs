//! Command-line settings for hpclaunch
//!
//! Defines the CLI arguments and the request they translate into.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hpclaunch - MPI launch resolution for batch jobs
#[derive(Parser, Debug, Clone)]
#[command(name = "hpclaunch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve how to launch an MPI job under the current batch system")]
#[command(long_about = r#"
hpclaunch inspects the batch system environment (LSF, PBS, LoadLeveler,
SGE, SLURM), works out the processes and hosts allocated to the job, and
resolves the launcher invocation for the configured MPI library.

Examples:
  hpclaunch batch                              # Batch job information
  hpclaunch -n 16 resources                    # Resources for 16 processes
  hpclaunch --mpi-type OpenMPI plan            # Launch plan for Open MPI
  hpclaunch --config site.toml --format json plan
"#)]
pub struct CliArgs {
    /// MPI settings file (TOML with an [mpi] table); later files win
    #[arg(long = "config", value_name = "FILE", env = "HPCLAUNCH_CONFIG", value_delimiter = ',')]
    pub config_files: Vec<PathBuf>,

    /// MPI type label (MPICH, MPICH2, Intel_MPI, OpenMPI, BullxMPI, MSMPI, BGP_MPI, BGQ_MPI, Platform_MPI, MPIBULL2)
    #[arg(long, value_name = "LABEL", env = "HPCLAUNCH_MPI_TYPE", default_value = "")]
    pub mpi_type: String,

    /// Directory containing the MPI launchers (default: search PATH)
    #[arg(long, value_name = "DIR")]
    pub bindir: Option<PathBuf>,

    /// Working directory for generated files (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub wdir: Option<PathBuf>,

    /// Number of processes, overriding the resource manager
    #[arg(short = 'n', long = "n-procs", value_name = "NUM")]
    pub n_procs: Option<usize>,

    /// Number of processes when nothing else provides one
    #[arg(long, value_name = "NUM")]
    pub default_procs: Option<usize>,

    /// Comma-separated host list, used when the batch system provides none
    #[arg(long, value_name = "HOSTS", value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show batch job information
    #[command(name = "batch")]
    Batch,

    /// Show resolved processes, nodes and hosts
    #[command(name = "resources")]
    Resources {
        /// Also list hosts
        #[arg(short = 'l', long)]
        list_hosts: bool,
    },

    /// Show the complete launch plan
    #[command(name = "plan")]
    Plan,

    /// Write the host file and print its path
    #[command(name = "hostsfile")]
    HostsFile,

    /// Run the MPI library information commands
    #[command(name = "info")]
    Info,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

impl CliArgs {
    /// Caller-supplied host list, if any
    pub fn hosts_list(&self) -> Option<Vec<String>> {
        let hosts: Vec<String> = self
            .hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        (!hosts.is_empty()).then_some(hosts)
    }
}
