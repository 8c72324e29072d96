//! Batch system detection
//!
//! Identifies the resource manager a job was submitted through and
//! collects the job metadata it exports. A process may run nested under
//! two schedulers (SLURM inside LSF, for instance), so detection follows a
//! fixed priority and the first manager whose signature variable is
//! present wins.

use super::command::CommandRunner;
use super::env::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Resource manager / batch scheduler type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceManagerKind {
    /// No resource manager detected
    #[default]
    None,
    /// IBM Spectrum LSF
    Lsf,
    /// PBS Pro / Torque
    Pbs,
    /// IBM LoadLeveler
    LoadLeveler,
    /// Sun/Oracle Grid Engine
    Sge,
    /// Slurm Workload Manager
    Slurm,
}

impl ResourceManagerKind {
    /// Detection order with the signature variable of each manager
    pub const DETECTION_ORDER: [(ResourceManagerKind, &'static str); 5] = [
        (ResourceManagerKind::Lsf, "LSB_JOBID"),
        (ResourceManagerKind::Pbs, "PBS_JOBID"),
        (ResourceManagerKind::LoadLeveler, "LOADL_JOB_NAME"),
        (ResourceManagerKind::Sge, "SGE_TASK_ID"),
        (ResourceManagerKind::Slurm, "SLURM_JOBID"),
    ];

    /// Detect the batch system from the environment
    pub fn detect(env: &Environment) -> Self {
        Self::DETECTION_ORDER
            .iter()
            .find(|(_, var)| env.is_set(var))
            .map(|(kind, _)| *kind)
            .unwrap_or(ResourceManagerKind::None)
    }

    /// Get the manager name
    pub fn name(&self) -> &'static str {
        match self {
            ResourceManagerKind::None => "None",
            ResourceManagerKind::Lsf => "LSF",
            ResourceManagerKind::Pbs => "PBS",
            ResourceManagerKind::LoadLeveler => "LoadLeveler",
            ResourceManagerKind::Sge => "SGE",
            ResourceManagerKind::Slurm => "SLURM",
        }
    }

    /// Check if a manager was detected
    pub fn is_some(&self) -> bool {
        *self != ResourceManagerKind::None
    }
}

impl fmt::Display for ResourceManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Batch job information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJobInfo {
    /// Detected batch system
    pub kind: ResourceManagerKind,
    /// Directory the job was submitted from
    pub submit_dir: Option<PathBuf>,
    /// Job script
    pub job_file: Option<PathBuf>,
    /// Job name
    pub job_name: Option<String>,
    /// Job ID
    pub job_id: Option<String>,
    /// Queue, class or partition
    pub queue: Option<String>,
}

impl BatchJobInfo {
    /// Collect batch job information from the environment
    pub fn detect(env: &Environment) -> Self {
        match ResourceManagerKind::detect(env) {
            ResourceManagerKind::Lsf => Self::collect_lsf(env),
            ResourceManagerKind::Pbs => Self::collect_pbs(env),
            ResourceManagerKind::LoadLeveler => Self::collect_loadleveler(env),
            ResourceManagerKind::Sge => Self::collect_sge(env),
            ResourceManagerKind::Slurm => Self::collect_slurm(env),
            ResourceManagerKind::None => Self::default(),
        }
    }

    fn collect_lsf(env: &Environment) -> Self {
        Self {
            kind: ResourceManagerKind::Lsf,
            submit_dir: env.path("LS_SUBCWDIR"),
            job_file: env.path("LSB_JOBFILENAME"),
            job_name: owned(env, "LSB_JOBNAME"),
            job_id: owned(env, "LSB_BATCH_JID"),
            queue: owned(env, "LSB_QUEUE"),
        }
    }

    fn collect_pbs(env: &Environment) -> Self {
        Self {
            kind: ResourceManagerKind::Pbs,
            submit_dir: env.path("PBS_O_WORKDIR"),
            job_file: None,
            job_name: owned(env, "PBS_JOBNAME"),
            job_id: owned(env, "PBS_JOBID"),
            queue: owned(env, "PBS_QUEUE"),
        }
    }

    fn collect_loadleveler(env: &Environment) -> Self {
        Self {
            kind: ResourceManagerKind::LoadLeveler,
            submit_dir: env.path("LOADL_STEP_INITDIR"),
            job_file: env.path("LOADL_STEP_COMMAND"),
            job_name: owned(env, "LOADL_JOB_NAME"),
            job_id: owned(env, "LOADL_STEP_ID"),
            queue: owned(env, "LOADL_STEP_CLASS"),
        }
    }

    fn collect_sge(env: &Environment) -> Self {
        Self {
            kind: ResourceManagerKind::Sge,
            submit_dir: env.path("SGE_O_WORKDIR"),
            job_file: None,
            job_name: owned(env, "JOB_NAME"),
            job_id: owned(env, "JOB_ID"),
            queue: owned(env, "QUEUE"),
        }
    }

    fn collect_slurm(env: &Environment) -> Self {
        Self {
            kind: ResourceManagerKind::Slurm,
            submit_dir: env.path("SLURM_SUBMIT_DIR"),
            job_file: None,
            job_name: owned(env, "SLURM_JOB_NAME"),
            job_id: owned(env, "SLURM_JOBID"),
            queue: owned(env, "SLURM_PARTITION"),
        }
    }

    /// Check if running inside a batch job
    pub fn is_job(&self) -> bool {
        self.kind.is_some()
    }

    /// Remaining wall time reported by the scheduler
    ///
    /// Only PBS exposes this: `qstat -r <job>` is queried and the 9th
    /// column of the job's line is returned verbatim.
    pub fn remaining_time(&self, runner: &dyn CommandRunner) -> Option<String> {
        if self.kind != ResourceManagerKind::Pbs {
            return None;
        }
        let job_id = self.job_id.as_deref()?;
        let output = runner.stdout("qstat", &["-r", job_id])?;
        parse_qstat_remaining(&output, job_id)
    }
}

fn owned(env: &Environment, key: &str) -> Option<String> {
    env.var(key).map(str::to_string)
}

fn parse_qstat_remaining(output: &str, job_id: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains(job_id))
        .and_then(|line| line.split_whitespace().nth(8))
        .map(str::to_string)
}
