//! Execution resource resolution
//!
//! Computes process and node counts, and where hosts come from, for the
//! batch job detected by [`BatchJobInfo::detect`]. Each resource manager
//! exposes this differently: direct counters, compact host grammars, flat
//! host lists or a host file of its own.

use super::batch::{BatchJobInfo, ResourceManagerKind};
use super::command::CommandRunner;
use super::env::Environment;
use super::hosts;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the host file generated from a host list
pub const HOSTS_FILE_NAME: &str = "hostsfile";

/// Where a host list can be obtained for the detected manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum HostSource {
    #[default]
    None,
    /// `SLURM_NODELIST`, with per-node task counts when available
    SlurmNodeList {
        nodelist: String,
        tasks_per_node: Option<String>,
    },
    /// No compact list exported; ask SLURM itself
    SlurmRemote,
    /// `LSB_MCPU_HOSTS` pairs
    LsfPairs(Vec<(String, usize)>),
    /// `LSB_HOSTS`
    LsfHosts(Vec<String>),
    /// `LOADL_PROCESSOR_LIST`
    LoadLeveler(Vec<String>),
}

/// Resources available to a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    /// Batch job the resources belong to
    pub batch: BatchJobInfo,
    /// Manager the counts were read from (may differ from the batch kind)
    pub manager: ResourceManagerKind,
    /// Number of processes
    pub n_procs: Option<usize>,
    /// Number of nodes
    pub n_nodes: Option<usize>,
    /// Host file, native or generated
    pub hosts_file: Option<PathBuf>,
    /// Host list supplied by the caller
    pub hosts_list: Option<Vec<String>>,
    /// Non-fatal issues found during resolution
    pub warnings: Vec<String>,
    #[serde(skip)]
    host_source: HostSource,
}

impl ResourceAllocation {
    fn new(batch: BatchJobInfo) -> Self {
        Self {
            batch,
            ..Default::default()
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Processes per node, or 1 when either count is unknown
    pub fn n_procs_per_node(&self) -> usize {
        match (self.n_procs, self.n_nodes) {
            (Some(procs), Some(nodes)) if nodes > 0 => (procs / nodes).max(1),
            _ => 1,
        }
    }

    /// Set process and node counts from a host list
    pub fn n_procs_from_hosts_list<S: AsRef<str>>(&mut self, hosts: &[S]) {
        let (n_procs, n_nodes) = hosts::n_procs_from_hosts_list(hosts);
        self.n_procs = Some(n_procs);
        self.n_nodes = Some(n_nodes);
    }

    /// Set the process count from the lines of a host file
    pub fn n_procs_from_hosts_file(&mut self, path: &Path) -> Result<()> {
        self.n_procs = Some(hosts::count_hosts_file_entries(path)?);
        Ok(())
    }

    /// Host list for this allocation, if one can be determined
    ///
    /// Without `SLURM_NODELIST`, SLURM jobs fall back to `srun hostname -s`
    /// and the result is sorted.
    pub fn get_hosts_list(&self, runner: &dyn CommandRunner) -> Option<Vec<String>> {
        if let Some(list) = &self.hosts_list {
            return Some(list.clone());
        }

        match &self.host_source {
            HostSource::None => None,
            HostSource::SlurmNodeList {
                nodelist,
                tasks_per_node,
            } => Some(hosts::expand_slurm_hosts(nodelist, tasks_per_node.as_deref())),
            HostSource::SlurmRemote => {
                let output = runner.stdout("srun", &["hostname", "-s"])?;
                let mut list: Vec<String> =
                    output.split_whitespace().map(str::to_string).collect();
                list.sort();
                (!list.is_empty()).then_some(list)
            }
            HostSource::LsfPairs(pairs) => Some(
                pairs
                    .iter()
                    .flat_map(|(host, count)| std::iter::repeat(host.clone()).take(*count))
                    .collect(),
            ),
            HostSource::LsfHosts(list) | HostSource::LoadLeveler(list) => Some(list.clone()),
        }
    }

    /// Host file for this allocation
    ///
    /// Returns the manager's own file when there is one. Otherwise a file
    /// named `hostsfile` is written once in `wdir` (or the current
    /// directory) from the host list, and its path is cached for the
    /// lifetime of the allocation. Concurrent jobs sharing `wdir` would
    /// race on that file; callers give each job its own directory.
    pub fn get_hosts_file(
        &mut self,
        wdir: Option<&Path>,
        runner: &dyn CommandRunner,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.hosts_file {
            return Ok(Some(path.clone()));
        }

        let hosts = match self.get_hosts_list(runner) {
            Some(list) if !list.is_empty() => list,
            _ => return Ok(None),
        };

        let path = match wdir {
            Some(dir) => dir.join(HOSTS_FILE_NAME),
            None => PathBuf::from(HOSTS_FILE_NAME),
        };
        hosts::write_hosts_file(&path, &hosts, self.n_procs)?;
        tracing::debug!("Wrote {} hosts to {}", hosts.len(), path.display());

        self.hosts_file = Some(path.clone());
        Ok(Some(path))
    }

    /// Print an allocation summary to console
    pub fn print_summary(&self) {
        println!("=== Resources ===\n");
        println!("  Batch system: {}", self.batch.kind);
        println!("  Resource manager: {}", self.manager);
        match self.n_procs {
            Some(n) => println!("  Processes: {}", n),
            None => println!("  Processes: unknown"),
        }
        match self.n_nodes {
            Some(n) => println!("  Nodes: {}", n),
            None => println!("  Nodes: unknown"),
        }
        println!("  Processes per node: {}", self.n_procs_per_node());
        if let Some(path) = &self.hosts_file {
            println!("  Hosts file: {}", path.display());
        }
        for warning in &self.warnings {
            println!("  Warning: {}", warning);
        }
    }
}

/// Resolves execution resources for a batch job
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    n_procs: Option<usize>,
    n_procs_default: Option<usize>,
    hosts_list: Option<Vec<String>>,
}

impl ResourceResolver {
    /// Create a resolver relying on the resource manager alone
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an explicit process count, overriding the detected one
    pub fn with_n_procs(mut self, n_procs: Option<usize>) -> Self {
        self.n_procs = n_procs;
        self
    }

    /// Process count used when nothing else provides one
    pub fn with_default_n_procs(mut self, n_procs: Option<usize>) -> Self {
        self.n_procs_default = n_procs;
        self
    }

    /// Supply the host list directly
    pub fn with_hosts_list(mut self, hosts: Vec<String>) -> Self {
        self.hosts_list = Some(hosts);
        self
    }

    /// Resolve resources for a batch job
    pub fn resolve(&self, batch: BatchJobInfo, env: &Environment) -> ResourceAllocation {
        let kind = batch.kind;
        let mut alloc = ResourceAllocation::new(batch);
        alloc.hosts_list = self.hosts_list.clone();

        // SLURM counters are honored under any batch system, since srun
        // may be used inside an allocation obtained elsewhere.
        detect_slurm(env, &mut alloc);

        if !alloc.manager.is_some() {
            match kind {
                ResourceManagerKind::Lsf => detect_lsf(env, &mut alloc),
                ResourceManagerKind::LoadLeveler => detect_loadleveler(env, &mut alloc),
                ResourceManagerKind::Pbs => detect_pbs(env, &mut alloc),
                ResourceManagerKind::Sge => detect_sge(env, &mut alloc),
                ResourceManagerKind::Slurm | ResourceManagerKind::None => {}
            }
        }

        if let Some(path) = &alloc.hosts_file {
            if !path.is_file() {
                tracing::debug!("Ignoring missing host file {}", path.display());
                alloc.hosts_file = None;
            }
        }

        let mut from_hosts_list = false;
        if alloc.n_procs.is_none() {
            if let Some(path) = alloc.hosts_file.clone() {
                if let Err(e) = alloc.n_procs_from_hosts_file(&path) {
                    tracing::warn!("Could not count hosts in {}: {}", path.display(), e);
                }
            } else if let Some(list) = alloc.hosts_list.clone() {
                alloc.n_procs_from_hosts_list(&list);
                from_hosts_list = true;
            }
        }

        // Only a count the resource manager provided can disagree with the request
        if let Some(requested) = self.n_procs {
            if let Some(detected) = alloc.n_procs.filter(|_| alloc.manager.is_some() && !from_hosts_list) {
                if detected != requested {
                    let message = format!(
                        "Will use {} processes while resource manager ({}) allows for {}.",
                        requested, alloc.manager, detected
                    );
                    alloc.warn(message);
                }
            }
            alloc.n_procs = Some(requested);
        }

        if alloc.n_procs.is_none() {
            alloc.n_procs = self.n_procs_default;
        }

        tracing::debug!(
            "Resources: manager={}, n_procs={:?}, n_nodes={:?}",
            alloc.manager,
            alloc.n_procs,
            alloc.n_nodes
        );

        alloc
    }
}

fn detect_slurm(env: &Environment, alloc: &mut ResourceAllocation) {
    if let Some(n_procs) = env.count("SLURM_NPROCS") {
        alloc.manager = ResourceManagerKind::Slurm;
        alloc.n_procs = Some(n_procs);
        alloc.n_nodes = env.count("SLURM_NNODES");
    } else if let Some(n_nodes) = env.count("SLURM_NNODES") {
        alloc.manager = ResourceManagerKind::Slurm;
        alloc.n_nodes = Some(n_nodes);
        alloc.n_procs = match env.var("SLURM_TASKS_PER_NODE") {
            Some(spec) => hosts::total_tasks(spec).or_else(|| {
                tracing::warn!("Invalid SLURM_TASKS_PER_NODE={:?}", spec);
                None
            }),
            None => Some(n_nodes),
        };
    } else {
        return;
    }

    let tasks_per_node = env.var("SLURM_TASKS_PER_NODE").map(str::to_string);
    alloc.host_source = match env.var("SLURM_NODELIST") {
        Some(nodelist) => HostSource::SlurmNodeList {
            nodelist: nodelist.to_string(),
            tasks_per_node,
        },
        None => HostSource::SlurmRemote,
    };
}

fn detect_lsf(env: &Environment, alloc: &mut ResourceAllocation) {
    alloc.manager = ResourceManagerKind::Lsf;

    if let Some(spec) = env.var("LSB_MCPU_HOSTS") {
        let parsed = hosts::parse_lsf_mcpu_hosts(spec).and_then(|pairs| {
            let total = pairs
                .iter()
                .try_fold(0usize, |total, (_, count)| total.checked_add(*count))
                .filter(|total| *total <= hosts::MAX_EXPANDED_HOSTS)?;
            Some((pairs, total))
        });
        match parsed {
            Some((pairs, total)) => {
                alloc.n_nodes = Some(pairs.len());
                alloc.n_procs = Some(total);
                alloc.host_source = HostSource::LsfPairs(pairs);
                return;
            }
            None => tracing::warn!("Invalid LSB_MCPU_HOSTS={:?}", spec),
        }
    }

    if let Some(spec) = env.var("LSB_HOSTS") {
        let list: Vec<String> = spec.split_whitespace().map(str::to_string).collect();
        alloc.n_procs_from_hosts_list(&list);
        alloc.host_source = HostSource::LsfHosts(list);
    }
}

fn detect_loadleveler(env: &Environment, alloc: &mut ResourceAllocation) {
    let processor_list: Option<Vec<String>> = env
        .var("LOADL_PROCESSOR_LIST")
        .map(|s| s.split_whitespace().map(str::to_string).collect());

    if let Some(n_procs) = env
        .count("LOADL_TOTAL_TASKS")
        .or_else(|| env.count("LOADL_BG_SIZE"))
    {
        alloc.manager = ResourceManagerKind::LoadLeveler;
        alloc.n_procs = Some(n_procs);
    } else if let Some(list) = &processor_list {
        alloc.manager = ResourceManagerKind::LoadLeveler;
        alloc.n_procs_from_hosts_list(list);
    }

    if let Some(list) = processor_list {
        alloc.host_source = HostSource::LoadLeveler(list);
    }

    if let Some(path) = env.path("LOADL_HOSTFILE") {
        alloc.manager = ResourceManagerKind::LoadLeveler;
        alloc.hosts_file = Some(path);
    }
}

fn detect_pbs(env: &Environment, alloc: &mut ResourceAllocation) {
    if let Some(path) = env.path("PBS_NODEFILE") {
        alloc.manager = ResourceManagerKind::Pbs;
        alloc.hosts_file = Some(path);
    }
}

fn detect_sge(env: &Environment, alloc: &mut ResourceAllocation) {
    alloc.n_procs = env.count("NSLOTS");
    alloc.n_nodes = env.count("NHOSTS");

    alloc.hosts_file = match env.path("TMPDIR") {
        Some(tmpdir) => Some(tmpdir.join("machines")).filter(|p| p.is_file()),
        None => env.path("PE_HOSTFILE"),
    };

    if alloc.n_procs.is_some() || alloc.n_nodes.is_some() || alloc.hosts_file.is_some() {
        alloc.manager = ResourceManagerKind::Sge;
    }
}
