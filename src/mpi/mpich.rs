//! MPICH family launch strategy
//!
//! MPICH2 and MPICH-3 may be built with any of five process managers:
//!
//! - Hydra, the default since MPICH2 1.3, integrates with every supported
//!   resource manager and takes a host file otherwise.
//! - MPD runs a ring of daemons. The ring may be shared between jobs, so it
//!   is only booted when not already running and only halted when no other
//!   job still uses it.
//! - SMPD runs independent daemons; a host file goes to the boot command.
//! - gforker starts every process on the local machine.
//! - remshell starts processes over ssh from a `machines` file.

use super::environment::{MpiEnvironmentConfig, MpmdMode};
use super::launcher::{launcher_basename, probe_launchers, resolve_pinned, HostOs, LaunchContext};
use crate::error::Result;
use crate::system::{ResourceAllocation, ResourceManagerKind};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Launchers probed in order when none is configured
pub const LAUNCHER_CANDIDATES: [&str; 10] = [
    "mpiexec.mpich",
    "mpiexec.mpich2",
    "mpiexec",
    "mpiexec.hydra",
    "mpiexec.smpd",
    "mpiexec.gforker",
    "mpiexec.remshell",
    "mpirun.mpich2",
    "mpirun.mpich",
    "mpirun",
];

/// Host file handed to `mpdboot` under PBS
const MPD_NODES_FILE: &str = "./mpd.nodes";

/// MPICH process manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessManager {
    Hydra,
    Mpd,
    Smpd,
    Gforker,
    Remshell,
}

impl ProcessManager {
    const ALL: [ProcessManager; 5] = [
        ProcessManager::Hydra,
        ProcessManager::Smpd,
        ProcessManager::Mpd,
        ProcessManager::Gforker,
        ProcessManager::Remshell,
    ];

    /// Get the process manager name
    pub fn name(&self) -> &'static str {
        match self {
            ProcessManager::Hydra => "hydra",
            ProcessManager::Mpd => "mpd",
            ProcessManager::Smpd => "smpd",
            ProcessManager::Gforker => "gforker",
            ProcessManager::Remshell => "remshell",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pm| pm.name() == name)
    }

    fn from_prefix(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pm| s.starts_with(pm.name()))
    }
}

impl fmt::Display for ProcessManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Determine the process manager a launcher was built with
///
/// Returns `None` when no heuristic is conclusive.
pub fn detect_process_manager(ctx: &LaunchContext<'_>, launcher: &Path) -> Option<ProcessManager> {
    if ctx.os == HostOs::Windows {
        return Some(ProcessManager::Smpd);
    }

    let file_name = launcher.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if let Some((_, suffix)) = file_name.rsplit_once('.') {
        if let Some(pm) = ProcessManager::from_name(suffix) {
            return Some(pm);
        }
    }

    if launcher.is_absolute() {
        if let Some(pm) = pm_from_version_helper(ctx, launcher) {
            return Some(pm);
        }
        if is_mpd_python_link(launcher) {
            return Some(ProcessManager::Mpd);
        }
    }

    let help = ctx.runner.combined(&launcher.to_string_lossy(), &["-help"])?;
    if help.contains("Hydra") {
        Some(ProcessManager::Hydra)
    } else if help.contains(" smpd ") {
        Some(ProcessManager::Smpd)
    } else if help.contains("-usize") {
        // remshell shares this option
        Some(ProcessManager::Gforker)
    } else {
        None
    }
}

/// Ask `mpichversion` or `mpich2version` next to the launcher
fn pm_from_version_helper(ctx: &LaunchContext<'_>, launcher: &Path) -> Option<ProcessManager> {
    let dir = launcher.parent()?;
    let helper = ["mpichversion", "mpich2version"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())?;
    let helper = helper.to_string_lossy();

    // The first process manager given at configure time is the default
    if let Some(configure) = ctx.runner.combined(&helper, &["-configure"]) {
        if let Some((_, rest)) = configure.split_once("-with-pm=") {
            if let Some(pm) = ProcessManager::from_prefix(rest) {
                return Some(pm);
            }
        }
    }

    // Otherwise the default changed from MPD to Hydra with MPICH2 1.3
    let version = ctx.runner.combined(&helper, &["-version"])?;
    let (major, minor) = parse_version(&version)?;
    if major == 1 && minor < 3 {
        Some(ProcessManager::Mpd)
    } else {
        Some(ProcessManager::Hydra)
    }
}

/// Parse the `major.minor` numbers of `MPICH2 Version:\t1.2.1p1`
fn parse_version(output: &str) -> Option<(u32, u32)> {
    let version = output.trim_end().split('\t').nth(1)?.trim();
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts
        .next()?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some((major, minor.parse().ok()?))
}

fn is_mpd_python_link(launcher: &Path) -> bool {
    let is_link = fs::symlink_metadata(launcher)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    is_link
        && fs::canonicalize(launcher)
            .ok()
            .and_then(|p| p.file_name().map(|n| n == "mpiexec.py"))
            .unwrap_or(false)
}

/// Set up the MPICH family launcher
pub fn init_mpich(
    config: &mut MpiEnvironmentConfig,
    alloc: &mut ResourceAllocation,
    ctx: &LaunchContext<'_>,
) -> Result<()> {
    let (pm, launcher_path) = locate_launcher(config, ctx);

    let launcher = config.mpiexec.get_or_insert_with(|| "mpiexec".to_string()).clone();
    let basename = launcher_basename(&launcher);
    let launcher_dir = launcher_path.as_deref().and_then(Path::parent);

    tracing::debug!(
        "MPICH launcher {} with process manager {}",
        launcher,
        pm.map(|p| p.name()).unwrap_or("unknown")
    );

    if basename.starts_with("mpiexec") {
        config.mpmd = MpmdMode::MPIEXEC | MpmdMode::CONFIGFILE | MpmdMode::SCRIPT;
        config.mpiexec_n = Some(" -n ".to_string());
    } else if basename.starts_with("mpirun") {
        config.mpmd = MpmdMode::SCRIPT;
        config.mpiexec_n = Some(" -np ".to_string());
    }

    let mut mpd_tools = None;
    match pm {
        Some(ProcessManager::Smpd) => {
            let smpd = helper_path(ctx, launcher_dir, "smpd");
            let (boot, halt) = if ctx.os == HostOs::Windows {
                ("-start", "-stop")
            } else {
                ("-s", "-shutdown")
            };
            config.mpiboot = Some(format!("{} {}", smpd, boot));
            config.mpihalt = Some(format!("{} {}", smpd, halt));
        }
        Some(ProcessManager::Mpd) if !basename.starts_with("mpirun") && mpd_setup_needed(ctx) => {
            // mpirun wraps boot, run and exit by itself
            if let Some(dir) = launcher_dir.filter(|d| d.join("mpdboot").is_file()) {
                let tool = |name: &str| ctx.recorded_name(dir, name);
                config.mpiboot = Some(tool("mpdboot"));
                config.mpihalt = Some(tool("mpdallexit"));
                mpd_tools = Some((tool("mpdtrace"), tool("mpdlistjobs")));
            }
        }
        _ => {}
    }

    let manager = alloc.manager;
    match pm {
        Some(ProcessManager::Hydra) => {
            if manager.is_some() {
                warn_ignored_hosts_list(config, alloc, "Hydra", manager);
            } else if let Some(path) = alloc.get_hosts_file(ctx.wdir, ctx.runner)? {
                config.mpiexec_hostsfile = Some(format!(" -f {}", path.display()));
            }
            let ppn = alloc.n_procs_per_node();
            if ppn != 1 {
                config.mpiexec_n_per_node = Some(format!(" -ppn {}", ppn));
            }
        }
        Some(ProcessManager::Smpd) => {
            if let Some(path) = alloc.get_hosts_file(ctx.wdir, ctx.runner)? {
                append_boot_file(config, &path.to_string_lossy());
            }
        }
        Some(ProcessManager::Mpd) => {
            if manager == ResourceManagerKind::Pbs {
                if config.mpiboot.is_some() {
                    config.gen_hostsfile = Some(format!(
                        "sort $PBS_NODEFILE | uniq -c | awk '{{ printf(\"%s:%s\", $2, $1); }}' > {}",
                        MPD_NODES_FILE
                    ));
                    config.del_hostsfile = Some(format!("rm -f {}", MPD_NODES_FILE));
                    append_boot_file(config, MPD_NODES_FILE);
                }
            } else if config.mpiboot.is_some() {
                if let Some(path) = alloc.get_hosts_file(ctx.wdir, ctx.runner)? {
                    append_boot_file(config, &path.to_string_lossy());
                }
            }
        }
        Some(ProcessManager::Gforker) => {
            let has_hosts =
                alloc.get_hosts_list(ctx.runner).is_some() || alloc.hosts_file.is_some();
            if has_hosts {
                config.warn("Hosts list will be ignored by MPICH gforker process manager.".to_string());
            }
        }
        Some(ProcessManager::Remshell) | None => {}
    }

    // An existing ring is reused, and left running while other jobs use it
    if let Some((mpdtrace, mpdlistjobs)) = mpd_tools {
        if let Some(boot) = config.mpiboot.as_mut() {
            *boot = format!(
                "{} > /dev/null 2>&1\nif test $? != 0 ; then {} ; fi",
                mpdtrace, boot
            );
        }
        if let Some(halt) = config.mpihalt.as_mut() {
            *halt = format!(
                "listjobs=`{} | wc -l`\nif test $listjobs = 0 ; then {} ; fi",
                mpdlistjobs, halt
            );
        }
    }

    match ctx.label {
        "MPICH" => config.info_cmds = vec!["mpichversion".to_string()],
        "MPICH2" => config.info_cmds = vec!["mpich2version".to_string()],
        _ => {}
    }

    Ok(())
}

/// Locate the launcher and its process manager
///
/// A configured launcher is kept as given. Otherwise candidates are probed,
/// skipping MPD launchers since that manager is deprecated.
fn locate_launcher(
    config: &mut MpiEnvironmentConfig,
    ctx: &LaunchContext<'_>,
) -> (Option<ProcessManager>, Option<PathBuf>) {
    if let Some(pinned) = config.mpiexec.clone() {
        let path = resolve_pinned(ctx, &pinned);
        let probe = path
            .clone()
            .unwrap_or_else(|| PathBuf::from(launcher_basename(&pinned)));
        let pm = detect_process_manager(ctx, &probe).or_else(|| {
            config.warn(
                "Unable to determine MPICH process manager: assume \"Hydra\".".to_string(),
            );
            Some(ProcessManager::Hydra)
        });
        return (pm, path);
    }

    let mut pm = None;
    let found = probe_launchers(ctx, &LAUNCHER_CANDIDATES, |path| {
        pm = detect_process_manager(ctx, path);
        pm != Some(ProcessManager::Mpd)
    });

    match found {
        Some(found) => {
            config.mpiexec = Some(found.recorded);
            let pm = pm.or_else(|| {
                config.warn(
                    "Unable to determine MPICH process manager: assume \"Hydra\".".to_string(),
                );
                Some(ProcessManager::Hydra)
            });
            (pm, Some(found.path))
        }
        None => (None, None),
    }
}

/// Helper executable next to the launcher, absolute only in the bindir
fn helper_path(ctx: &LaunchContext<'_>, launcher_dir: Option<&Path>, name: &str) -> String {
    match launcher_dir {
        Some(dir) if dir.join(name).is_file() => ctx.recorded_name(dir, name),
        _ => name.to_string(),
    }
}

fn mpd_setup_needed(ctx: &LaunchContext<'_>) -> bool {
    match ctx.env.var("MPD_USE_ROOT_MPD") {
        Some(v) => v.trim().parse::<i64>().map(|n| n == 0).unwrap_or(true),
        None => true,
    }
}

fn append_boot_file(config: &mut MpiEnvironmentConfig, path: &str) {
    if let Some(boot) = config.mpiboot.as_mut() {
        boot.push_str(" --file=");
        boot.push_str(path);
    }
}

/// Warn when a caller host list is dropped in favor of native integration
pub(crate) fn warn_ignored_hosts_list(
    config: &mut MpiEnvironmentConfig,
    alloc: &ResourceAllocation,
    launcher: &str,
    manager: ResourceManagerKind,
) {
    if alloc.hosts_list.is_some() {
        config.warn(format!(
            "Hosts list will be ignored: {} uses the {} allocation directly.",
            launcher, manager
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::command::testing::FakeRunner;
    use crate::system::{BatchJobInfo, Environment, ResourceResolver};
    use std::path::PathBuf;

    struct Fixture {
        bindir: tempfile::TempDir,
        wdir: tempfile::TempDir,
        env: Environment,
        runner: FakeRunner,
        dirs: Vec<PathBuf>,
    }

    impl Fixture {
        fn new(files: &[&str], env: &[(&str, &str)]) -> Self {
            let bindir = tempfile::tempdir().unwrap();
            for f in files {
                std::fs::write(bindir.path().join(f), "").unwrap();
            }
            let dirs = vec![bindir.path().to_path_buf()];
            Self {
                bindir,
                wdir: tempfile::tempdir().unwrap(),
                env: Environment::from_pairs(env.iter().copied()),
                runner: FakeRunner::new(),
                dirs,
            }
        }

        fn ctx<'a>(&'a self, label: &'a str) -> LaunchContext<'a> {
            LaunchContext {
                label,
                search_dirs: &self.dirs,
                bindir: Some(self.bindir.path()),
                wdir: Some(self.wdir.path()),
                env: &self.env,
                runner: &self.runner,
                os: HostOs::Unix,
            }
        }

        fn alloc(&self, hosts: Option<Vec<String>>) -> ResourceAllocation {
            let mut resolver = ResourceResolver::new();
            if let Some(hosts) = hosts {
                resolver = resolver.with_hosts_list(hosts);
            }
            resolver.resolve(BatchJobInfo::detect(&self.env), &self.env)
        }

        fn bin(&self, name: &str) -> String {
            self.bindir.path().join(name).to_string_lossy().into_owned()
        }
    }

    fn hosts(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("MPICH2 Version:\t1.2.1p1\n"), Some((1, 2)));
        assert_eq!(parse_version("MPICH Version:\t3.4.2\n"), Some((3, 4)));
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn test_pm_from_suffix() {
        let f = Fixture::new(&[], &[]);
        let ctx = f.ctx("MPICH");
        assert_eq!(
            detect_process_manager(&ctx, Path::new("/opt/bin/mpiexec.gforker")),
            Some(ProcessManager::Gforker)
        );
        assert!(f.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_pm_from_configure() {
        let mut f = Fixture::new(&["mpiexec", "mpichversion"], &[]);
        let helper = f.bin("mpichversion");
        f.runner = FakeRunner::new().with_combined(
            &format!("{} -configure", helper),
            "./configure --prefix=/opt --with-pm=smpd:hydra",
        );
        let ctx = f.ctx("MPICH");
        let launcher = PathBuf::from(f.bin("mpiexec"));
        assert_eq!(detect_process_manager(&ctx, &launcher), Some(ProcessManager::Smpd));
    }

    #[test]
    fn test_pm_from_old_version() {
        let mut f = Fixture::new(&["mpiexec", "mpich2version"], &[]);
        let helper = f.bin("mpich2version");
        f.runner = FakeRunner::new()
            .with_combined(&format!("{} -configure", helper), "./configure --prefix=/opt")
            .with_combined(&format!("{} -version", helper), "MPICH2 Version:\t1.2.1p1\n");
        let ctx = f.ctx("MPICH2");
        let launcher = PathBuf::from(f.bin("mpiexec"));
        assert_eq!(detect_process_manager(&ctx, &launcher), Some(ProcessManager::Mpd));
    }

    #[test]
    fn test_pm_from_help_text() {
        let mut f = Fixture::new(&["mpiexec"], &[]);
        let launcher = f.bin("mpiexec");
        f.runner = FakeRunner::new().with_combined(
            &format!("{} -help", launcher),
            "Usage: ./mpiexec [global opts] [local opts for exec1]\n  -usize <n>\n",
        );
        let ctx = f.ctx("MPICH");
        assert_eq!(
            detect_process_manager(&ctx, Path::new(&launcher)),
            Some(ProcessManager::Gforker)
        );
    }

    #[test]
    fn test_hydra_default_warns() {
        let f = Fixture::new(&["mpiexec"], &[]);
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("MPICH");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH")).unwrap();

        assert_eq!(config.mpiexec.as_deref(), Some(f.bin("mpiexec").as_str()));
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("Hydra"));
        assert_eq!(config.mpiexec_n.as_deref(), Some(" -n "));
        assert!(config.mpmd.contains(MpmdMode::MPIEXEC | MpmdMode::CONFIGFILE | MpmdMode::SCRIPT));
        assert_eq!(config.info_cmds, vec!["mpichversion"]);
    }

    #[test]
    fn test_hydra_hosts_file_without_manager() {
        let f = Fixture::new(&["mpiexec.hydra"], &[]);
        let mut alloc = f.alloc(hosts(&["a", "a", "b", "b"]));
        let mut config = MpiEnvironmentConfig::new("MPICH");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH")).unwrap();

        let expected = f.wdir.path().join("hostsfile");
        assert_eq!(
            config.mpiexec_hostsfile,
            Some(format!(" -f {}", expected.display()))
        );
        assert!(expected.is_file());
        assert_eq!(config.mpiexec_n_per_node.as_deref(), Some(" -ppn 2"));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_hydra_native_manager_skips_hosts_file() {
        let f = Fixture::new(&["mpiexec.hydra"], &[("SLURM_JOBID", "1"), ("SLURM_NPROCS", "4")]);
        let mut alloc = f.alloc(hosts(&["a", "b"]));
        let mut config = MpiEnvironmentConfig::new("MPICH");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH")).unwrap();

        assert!(config.mpiexec_hostsfile.is_none());
        assert!(!f.wdir.path().join("hostsfile").exists());
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("SLURM"));
    }

    #[cfg(unix)]
    #[test]
    fn test_mpd_launchers_skipped() {
        let f = Fixture::new(&["mpiexec.py", "mpirun"], &[]);
        std::os::unix::fs::symlink(
            f.bindir.path().join("mpiexec.py"),
            f.bindir.path().join("mpiexec"),
        )
        .unwrap();
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH2")).unwrap();

        assert_eq!(config.mpiexec.as_deref(), Some(f.bin("mpirun").as_str()));
        assert_eq!(config.mpiexec_n.as_deref(), Some(" -np "));
        assert_eq!(config.mpmd, MpmdMode::SCRIPT);
    }

    #[test]
    fn test_smpd_boot_and_halt() {
        let f = Fixture::new(&["mpiexec.smpd", "smpd"], &[]);
        let mut alloc = f.alloc(hosts(&["n1", "n2"]));
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH2")).unwrap();

        let smpd = f.bin("smpd");
        let hostsfile = f.wdir.path().join("hostsfile");
        assert_eq!(
            config.mpiboot,
            Some(format!("{} -s --file={}", smpd, hostsfile.display()))
        );
        assert_eq!(config.mpihalt, Some(format!("{} -shutdown", smpd)));
        assert!(config.mpiexec_hostsfile.is_none());
    }

    #[test]
    fn test_smpd_on_windows() {
        let f = Fixture::new(&["mpiexec", "smpd"], &[]);
        let mut ctx = f.ctx("MPICH2");
        ctx.os = HostOs::Windows;
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        init_mpich(&mut config, &mut alloc, &ctx).unwrap();

        let smpd = f.bin("smpd");
        assert_eq!(config.mpiexec.as_deref(), Some(f.bin("mpiexec").as_str()));
        assert_eq!(config.mpiboot, Some(format!("{} -start", smpd)));
        assert_eq!(config.mpihalt, Some(format!("{} -stop", smpd)));
        assert!(config.warnings.is_empty());
        assert!(f.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_mpd_under_pbs() {
        let nodes = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(nodes.path(), "n1\nn1\nn2\n").unwrap();
        let f = Fixture::new(
            &["mpdboot"],
            &[("PBS_JOBID", "3.srv"), ("PBS_NODEFILE", nodes.path().to_str().unwrap())],
        );
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        config.mpiexec = Some(f.bin("mpiexec.mpd"));
        std::fs::write(f.bindir.path().join("mpiexec.mpd"), "").unwrap();
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH2")).unwrap();

        let boot = config.mpiboot.unwrap();
        assert!(boot.starts_with(&format!("{} > /dev/null 2>&1", f.bin("mpdtrace"))));
        assert!(boot.contains(&format!("{} --file=./mpd.nodes", f.bin("mpdboot"))));
        let halt = config.mpihalt.unwrap();
        assert!(halt.contains(&f.bin("mpdlistjobs")));
        assert!(halt.contains(&f.bin("mpdallexit")));
        assert!(config.gen_hostsfile.unwrap().contains("$PBS_NODEFILE"));
        assert_eq!(config.del_hostsfile.as_deref(), Some("rm -f ./mpd.nodes"));
    }

    #[test]
    fn test_mpd_with_generated_hosts_file() {
        let f = Fixture::new(&["mpiexec.mpd", "mpdboot"], &[]);
        let mut alloc = f.alloc(hosts(&["n1", "n2"]));
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        config.mpiexec = Some(f.bin("mpiexec.mpd"));
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH2")).unwrap();

        let hostsfile = f.wdir.path().join("hostsfile");
        assert!(hostsfile.is_file());
        assert_eq!(
            config.mpiboot,
            Some(format!(
                "{} > /dev/null 2>&1\nif test $? != 0 ; then {} --file={} ; fi",
                f.bin("mpdtrace"),
                f.bin("mpdboot"),
                hostsfile.display()
            ))
        );
        assert_eq!(
            config.mpihalt,
            Some(format!(
                "listjobs=`{} | wc -l`\nif test $listjobs = 0 ; then {} ; fi",
                f.bin("mpdlistjobs"),
                f.bin("mpdallexit")
            ))
        );
        assert!(config.gen_hostsfile.is_none());
        assert!(config.del_hostsfile.is_none());
    }

    #[test]
    fn test_root_mpd_needs_no_setup() {
        let f = Fixture::new(&["mpiexec.mpd", "mpdboot"], &[("MPD_USE_ROOT_MPD", "1")]);
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("MPICH2");
        config.mpiexec = Some("mpiexec.mpd".to_string());
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH2")).unwrap();

        assert!(config.mpiboot.is_none());
        assert!(config.mpihalt.is_none());
    }

    #[test]
    fn test_gforker_ignores_hosts() {
        let f = Fixture::new(&["mpiexec.gforker"], &[]);
        let mut alloc = f.alloc(hosts(&["n1"]));
        let mut config = MpiEnvironmentConfig::new("MPICH");
        init_mpich(&mut config, &mut alloc, &f.ctx("MPICH")).unwrap();

        assert!(config.mpiexec_hostsfile.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("gforker"));
    }

    #[test]
    fn test_no_launcher_found() {
        let f = Fixture::new(&[], &[]);
        let mut alloc = f.alloc(None);
        let mut config = MpiEnvironmentConfig::new("Intel_MPI");
        init_mpich(&mut config, &mut alloc, &f.ctx("Intel_MPI")).unwrap();

        assert_eq!(config.mpiexec.as_deref(), Some("mpiexec"));
        assert_eq!(config.mpiexec_n.as_deref(), Some(" -n "));
        assert!(config.mpiboot.is_none());
        assert!(config.info_cmds.is_empty());
    }
}
