//! Launch strategies for the non-MPICH families

use super::environment::{MpiEnvironmentConfig, MpmdMode};
use super::launcher::{launcher_basename, probe_launchers, resolve_pinned, HostOs, LaunchContext};
use super::mpich;
use crate::error::{LaunchError, Result};
use crate::system::command::find_in_dirs;
use crate::system::{ResourceAllocation, ResourceManagerKind};
use std::path::PathBuf;

/// Open MPI launchers probed in order when none is configured
pub const OPENMPI_CANDIDATES: [&str; 4] = ["mpiexec.openmpi", "mpirun.openmpi", "mpiexec", "mpirun"];

/// `ompi_info` component name for each manager Open MPI can integrate with
fn openmpi_component(manager: ResourceManagerKind) -> Option<&'static str> {
    match manager {
        ResourceManagerKind::Slurm => Some(" slurm "),
        ResourceManagerKind::Lsf => Some(" lsf "),
        ResourceManagerKind::LoadLeveler => Some(" loadleveler "),
        ResourceManagerKind::Pbs => Some(" tm "),
        ResourceManagerKind::Sge => Some(" gridengine "),
        ResourceManagerKind::None => None,
    }
}

/// Open MPI and Bullx MPI
pub fn init_openmpi(
    config: &mut MpiEnvironmentConfig,
    alloc: &mut ResourceAllocation,
    ctx: &LaunchContext<'_>,
) -> Result<()> {
    let launcher_path: Option<PathBuf> = match config.mpiexec.clone() {
        Some(pinned) => resolve_pinned(ctx, &pinned),
        None => probe_launchers(ctx, &OPENMPI_CANDIDATES, |_| true).map(|found| {
            config.mpiexec = Some(found.recorded);
            found.path
        }),
    };
    let launcher = config.mpiexec.get_or_insert_with(|| "mpiexec".to_string()).clone();
    let basename = launcher_basename(&launcher);

    config.mpiexec_n = Some(" -n ".to_string());
    let ppn = alloc.n_procs_per_node();
    if ppn != 1 {
        config.mpiexec_n_per_node = Some(format!(" --npernode {}", ppn));
    }
    if basename.starts_with("mpiexec") {
        config.mpmd = MpmdMode::MPIEXEC | MpmdMode::SCRIPT;
    } else if basename.starts_with("mpirun") {
        config.mpmd = MpmdMode::SCRIPT;
    }

    let ompi_info = launcher_path
        .as_deref()
        .and_then(|p| p.parent())
        .map(|dir| dir.join("ompi_info"))
        .filter(|p| p.is_file());

    let integrated = match (ompi_info, openmpi_component(alloc.manager)) {
        (Some(info), Some(component)) => ctx
            .runner
            .stdout(&info.to_string_lossy(), &[])
            .is_some_and(|output| output.contains(component)),
        _ => false,
    };

    if integrated {
        tracing::debug!("Open MPI integrates with {}", alloc.manager);
        mpich::warn_ignored_hosts_list(config, alloc, "Open MPI", alloc.manager);
    } else if let Some(path) = alloc.get_hosts_file(ctx.wdir, ctx.runner)? {
        config.mpiexec_hostsfile = Some(format!(" --machinefile {}", path.display()));
    }

    config.info_cmds = vec!["ompi_info -a".to_string()];
    Ok(())
}

/// Blue Gene/P
pub fn init_bgp(
    config: &mut MpiEnvironmentConfig,
    _alloc: &mut ResourceAllocation,
    _ctx: &LaunchContext<'_>,
) -> Result<()> {
    config.mpiexec = Some("mpiexec".to_string());
    config.mpiexec_n = None;
    config.mpmd = MpmdMode::CONFIGFILE;
    Ok(())
}

/// Blue Gene/Q, through `runjob` or SLURM's `srun`
pub fn init_bgq(
    config: &mut MpiEnvironmentConfig,
    alloc: &mut ResourceAllocation,
    _ctx: &LaunchContext<'_>,
) -> Result<()> {
    config.mpmd = MpmdMode::CONFIGFILE;
    let ppn = alloc.n_procs_per_node();

    if alloc.manager == ResourceManagerKind::Slurm {
        config.mpiexec = Some("srun".to_string());
        config.mpiexec_n = Some(" --ntasks=".to_string());
        if ppn != 1 {
            config.mpiexec_n_per_node = Some(format!(" --ntasks-per-node={}", ppn));
        }
    } else {
        config.mpiexec = Some("runjob".to_string());
        config.mpiexec_n = Some(" --np ".to_string());
        if ppn != 1 {
            config.mpiexec_n_per_node = Some(format!(" --ranks-per-node {}", ppn));
        }
        config.mpiexec_separator = Some(":".to_string());
    }
    Ok(())
}

/// Platform MPI (formerly HP MPI)
pub fn init_platform_mpi(
    config: &mut MpiEnvironmentConfig,
    alloc: &mut ResourceAllocation,
    ctx: &LaunchContext<'_>,
) -> Result<()> {
    // mpiexec exists too but takes fewer options
    let launcher = ctx
        .search_dirs
        .iter()
        .find(|dir| dir.join("mpirun").is_file())
        .map(|dir| ctx.recorded_name(dir, "mpirun"))
        .unwrap_or_else(|| "mpirun".to_string());
    config.mpiexec = Some(launcher);

    // Appfiles would work too, with -np instead of -n
    config.mpmd = MpmdMode::SCRIPT;
    config.mpiexec_n = Some(" -np ".to_string());

    match alloc.manager {
        ResourceManagerKind::Slurm => {
            config.append_opts(" -srun");
            config.mpiexec_n = None;
        }
        ResourceManagerKind::Lsf => config.append_opts(" -lsb_hosts"),
        _ => {}
    }
    Ok(())
}

/// Microsoft MPI, found through `PATH` whatever the bindir
pub fn init_msmpi(
    config: &mut MpiEnvironmentConfig,
    _alloc: &mut ResourceAllocation,
    _ctx: &LaunchContext<'_>,
) -> Result<()> {
    config.mpiexec = Some("mpiexec.exe".to_string());
    config.mpmd = MpmdMode::MPIEXEC | MpmdMode::CONFIGFILE;
    config.mpiexec_n = Some(" -n ".to_string());
    Ok(())
}

/// Bull MPIBULL2, launched through SLURM only
pub fn init_mpibull2(
    config: &mut MpiEnvironmentConfig,
    alloc: &mut ResourceAllocation,
    ctx: &LaunchContext<'_>,
) -> Result<()> {
    match alloc.manager {
        ResourceManagerKind::None | ResourceManagerKind::Slurm => {}
        other => return Err(LaunchError::unsupported_manager("MPIBULL2", other.name())),
    }

    mpich::init_mpich(config, alloc, ctx)?;

    // mpdboot may be installed, but srun needs no daemons
    if alloc.manager == ResourceManagerKind::Slurm {
        config.mpiexec = Some("srun".to_string());
        config.mpmd = MpmdMode::SCRIPT;
        config.mpiexec_n = None;
        config.mpiboot = None;
        config.mpihalt = None;
    }

    config.info_cmds = vec!["mpibull2-version".to_string()];
    Ok(())
}

/// Anything else: defaults, with `poe` on AIX
pub fn init_generic(
    config: &mut MpiEnvironmentConfig,
    _alloc: &mut ResourceAllocation,
    ctx: &LaunchContext<'_>,
) -> Result<()> {
    if ctx.os == HostOs::Aix && find_in_dirs("poe", ctx.search_dirs).is_some() {
        config.mpiexec = Some("poe".to_string());
        config.mpiexec_n = None;
    }
    config.mpmd = MpmdMode::SCRIPT;
    Ok(())
}
