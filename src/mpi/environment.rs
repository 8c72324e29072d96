//! MPI launch configuration
//!
//! [`MpiEnvironmentConfig`] is filled in three passes (overlay, variant
//! strategy, overlay again) and then handed to whoever runs the job.

use super::variant::MpiVariant;
use crate::error::{LaunchError, Result};
use crate::system::{separate_args, CommandRunner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// MPMD (multiple program, multiple data) syntaxes accepted by a launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MpmdMode(u8);

impl MpmdMode {
    /// No MPMD support
    pub const NONE: MpmdMode = MpmdMode(0);
    /// Colon-separated program groups on the launcher command line
    pub const MPIEXEC: MpmdMode = MpmdMode(1);
    /// Program groups listed in a launcher configuration file
    pub const CONFIGFILE: MpmdMode = MpmdMode(2);
    /// Generated script dispatching on the MPI rank
    pub const SCRIPT: MpmdMode = MpmdMode(4);

    /// Mode names accepted in configuration files
    pub const NAMES: [(&'static str, MpmdMode); 4] = [
        ("none", MpmdMode::NONE),
        ("mpiexec", MpmdMode::MPIEXEC),
        ("configfile", MpmdMode::CONFIGFILE),
        ("script", MpmdMode::SCRIPT),
    ];

    /// Parse a mode name, or several joined with `|`
    pub fn parse(s: &str) -> Result<Self> {
        let mut mode = MpmdMode::NONE;
        for name in s.split('|').map(str::trim) {
            let (_, flag) = Self::NAMES
                .iter()
                .find(|(n, _)| *n == name)
                .ok_or_else(|| LaunchError::InvalidMpmdMode(s.to_string()))?;
            mode |= *flag;
        }
        Ok(mode)
    }

    /// Check whether all modes of `other` are allowed
    pub fn contains(&self, other: MpmdMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no mode is allowed
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// This mask with the modes of `other` cleared
    pub fn unset(self, other: MpmdMode) -> Self {
        MpmdMode(self.0 & !other.0)
    }

    /// Names of the modes set in this mask
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, flag)| !flag.is_none() && self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for MpmdMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        MpmdMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for MpmdMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MpmdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            f.write_str(&self.names().join("|"))
        }
    }
}

/// Resolved MPI launch configuration
///
/// Flag texts carry their surrounding whitespace verbatim (`" -n "`,
/// `" --ntasks="`): launchers disagree on whether a space separates a flag
/// from its value, so the text is concatenated as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpiEnvironmentConfig {
    /// MPI type label the configuration was resolved for
    pub label: String,
    /// Strategy selected for the label
    pub variant: MpiVariant,
    /// Launcher, absolute when found in the MPI bindir
    pub mpiexec: Option<String>,
    /// Extra launcher options
    pub mpiexec_opts: Option<String>,
    /// Host file option, including the file path
    pub mpiexec_hostsfile: Option<String>,
    /// Process count flag
    pub mpiexec_n: Option<String>,
    /// Processes per node option, including the count
    pub mpiexec_n_per_node: Option<String>,
    /// Separator between the launcher and the program
    pub mpiexec_separator: Option<String>,
    /// Flag preceding the program
    pub mpiexec_exe: Option<String>,
    /// Flag preceding the program arguments
    pub mpiexec_args: Option<String>,
    /// Allowed MPMD syntaxes
    pub mpmd: MpmdMode,
    /// Command starting process manager daemons
    pub mpiboot: Option<String>,
    /// Command stopping process manager daemons
    pub mpihalt: Option<String>,
    /// Command preparing a host file before boot
    pub gen_hostsfile: Option<String>,
    /// Command removing that host file after halt
    pub del_hostsfile: Option<String>,
    /// Commands describing the MPI installation
    pub info_cmds: Vec<String>,
    /// Overlay values with no matching field
    pub extra: BTreeMap<String, String>,
    /// Non-fatal issues found during resolution
    pub warnings: Vec<String>,
}

impl MpiEnvironmentConfig {
    /// Create an empty configuration for a type label
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            variant: MpiVariant::from_label(&label),
            label,
            ..Default::default()
        }
    }

    /// Set a field by name; `None` unsets it
    ///
    /// Names without a matching field are kept in [`extra`](Self::extra).
    /// `info_cmds` takes a single command. The `mpmd` key is handled by
    /// [`MpmdMode::parse`] and rejected here.
    pub fn set_field(&mut self, key: &str, value: Option<String>) -> Result<()> {
        let slot = match key {
            "mpiexec" => &mut self.mpiexec,
            "mpiexec_opts" => &mut self.mpiexec_opts,
            "mpiexec_hostsfile" => &mut self.mpiexec_hostsfile,
            "mpiexec_n" => &mut self.mpiexec_n,
            "mpiexec_n_per_node" => &mut self.mpiexec_n_per_node,
            "mpiexec_separator" => &mut self.mpiexec_separator,
            "mpiexec_exe" => &mut self.mpiexec_exe,
            "mpiexec_args" => &mut self.mpiexec_args,
            "mpiboot" => &mut self.mpiboot,
            "mpihalt" => &mut self.mpihalt,
            "gen_hostsfile" => &mut self.gen_hostsfile,
            "del_hostsfile" => &mut self.del_hostsfile,
            "info_cmds" => {
                self.info_cmds = value.into_iter().collect();
                return Ok(());
            }
            "mpmd" => {
                return Err(LaunchError::config(
                    "mpmd must be set through MpmdMode, not as a text field",
                ))
            }
            _ => {
                match value {
                    Some(v) => self.extra.insert(key.to_string(), v),
                    None => self.extra.remove(key),
                };
                return Ok(());
            }
        };
        *slot = value;
        Ok(())
    }

    /// Disallow one MPMD syntax
    pub fn unset_mpmd_mode(&mut self, mode: MpmdMode) {
        self.mpmd = self.mpmd.unset(mode);
    }

    /// Append text to the launcher options
    pub fn append_opts(&mut self, opts: &str) {
        self.mpiexec_opts
            .get_or_insert_with(String::new)
            .push_str(opts);
    }

    /// Run the information commands and collect their output
    ///
    /// Each command contributes one block; a command that fails leaves its
    /// block empty.
    pub fn info(&self, runner: &dyn CommandRunner) -> String {
        let mut output = String::new();
        for cmd in &self.info_cmds {
            let args = separate_args(cmd);
            if let Some((program, rest)) = args.split_first() {
                let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
                if let Some(text) = runner.stdout(program, &rest) {
                    output.push_str(&text);
                }
            }
            output.push('\n');
        }
        output
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Print the configuration to console
    pub fn print_summary(&self) {
        println!("=== MPI Environment ===\n");
        println!("  MPI type: {} ({})", display_or(&self.label, "default"), self.variant);
        println!("  Launcher: {}", self.mpiexec.as_deref().unwrap_or("none"));
        let fields = [
            ("Options", &self.mpiexec_opts),
            ("Hosts file option", &self.mpiexec_hostsfile),
            ("Process count flag", &self.mpiexec_n),
            ("Per node option", &self.mpiexec_n_per_node),
            ("Separator", &self.mpiexec_separator),
            ("Boot", &self.mpiboot),
            ("Halt", &self.mpihalt),
            ("Hosts file generation", &self.gen_hostsfile),
            ("Hosts file removal", &self.del_hostsfile),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                println!("  {}: {:?}", name, v);
            }
        }
        println!("  MPMD modes: {}", self.mpmd);
        if !self.info_cmds.is_empty() {
            println!("  Info commands: {}", self.info_cmds.join(", "));
        }
        for (key, value) in &self.extra {
            println!("  {}: {:?}", key, value);
        }
        for warning in &self.warnings {
            println!("  Warning: {}", warning);
        }
    }
}

fn display_or<'a>(s: &'a str, default: &'a str) -> &'a str {
    if s.is_empty() {
        default
    } else {
        s
    }
}
