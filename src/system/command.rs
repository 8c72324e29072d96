//! External command execution
//!
//! Every subprocess used during resolution is introspection only (version
//! queries, host enumeration, scheduler status), so failures are reported
//! as `None` and callers fall back to their next heuristic.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Runs introspection commands
pub trait CommandRunner {
    /// Standard output of a successful run
    ///
    /// Returns `None` if the command cannot be spawned or exits non-zero.
    fn stdout(&self, program: &str, args: &[&str]) -> Option<String>;

    /// Standard output followed by standard error, whatever the exit status
    ///
    /// Returns `None` only if the command cannot be spawned.
    fn combined(&self, program: &str, args: &[&str]) -> Option<String>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    bindir: Option<PathBuf>,
}

impl SystemRunner {
    /// Create a runner using the inherited `PATH`
    pub fn new() -> Self {
        Self { bindir: None }
    }

    /// Create a runner whose children see `bindir` ahead of `PATH`
    pub fn with_bindir(bindir: impl Into<PathBuf>) -> Self {
        Self {
            bindir: Some(bindir.into()),
        }
    }

    /// Build the command with its search path scoped to the child
    fn command(&self, program: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(path) = self.child_path() {
            cmd.env("PATH", path);
        }
        cmd
    }

    fn child_path(&self) -> Option<OsString> {
        let bindir = self.bindir.as_ref()?;
        let mut dirs = vec![bindir.clone()];
        if let Some(current) = env::var_os("PATH") {
            dirs.extend(env::split_paths(&current));
        }
        env::join_paths(dirs).ok()
    }

    fn run(&self, program: &str, args: &[&str]) -> Option<Output> {
        match self
            .command(program, args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::debug!("Could not run {}: {}", program, e);
                None
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn stdout(&self, program: &str, args: &[&str]) -> Option<String> {
        let output = self.run(program, args)?;
        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            tracing::debug!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
    }

    fn combined(&self, program: &str, args: &[&str]) -> Option<String> {
        let output = self.run(program, args)?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}

/// Find a file by name in a list of directories
///
/// Absolute names are returned as-is when they exist.
pub fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    dirs.iter().map(|d| d.join(name)).find(|p| p.is_file())
}

/// Split a command line into arguments
///
/// Whitespace separates arguments unless protected by quotes or a
/// backslash before an alphanumeric character. Quotes wrapping a whole
/// argument are removed; quotes starting later, as in `--opt="a b"`, are
/// kept.
pub fn separate_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut protected = false;
    let mut in_quotes: Option<char> = None;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if protected {
            current.push(c);
            protected = false;
            continue;
        }
        match c {
            '\\' if chars.peek().is_some_and(|n| n.is_alphanumeric()) => protected = true,
            '"' | '\'' => {
                current.push(c);
                match in_quotes {
                    Some(q) if q == c => in_quotes = None,
                    Some(_) => {}
                    None => in_quotes = Some(c),
                }
            }
            _ if in_quotes.is_some() => current.push(c),
            ' ' | '\t' => {
                if !current.is_empty() {
                    args.push(strip_wrapping_quotes(&current));
                    current.clear();
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(strip_wrapping_quotes(&current));
    }

    args
}

fn strip_wrapping_quotes(arg: &str) -> String {
    let bytes = arg.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        arg[1..arg.len() - 1].to_string()
    } else {
        arg.to_string()
    }
}

/// Quote an argument containing whitespace
///
/// Arguments that already contain an unescaped double quote are left
/// alone, so `--option="string 1"` is unchanged.
pub fn enquote_arg(s: &str) -> String {
    if !s.contains(' ') {
        return s.to_string();
    }
    let mut escaped = false;
    for c in s.chars() {
        if c == '\\' {
            escaped = !escaped;
        } else {
            if c == '"' && !escaped {
                return s.to_string();
            }
            escaped = false;
        }
    }
    format!("\"{}\"", s)
}

/// Join arguments into a single command line, quoting where needed
pub fn assemble_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| enquote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CommandRunner;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Runner returning canned output keyed by the full command line
    #[derive(Default)]
    pub struct FakeRunner {
        stdout: HashMap<String, String>,
        combined: HashMap<String, String>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_stdout(mut self, cmdline: &str, output: &str) -> Self {
            self.stdout.insert(cmdline.to_string(), output.to_string());
            self
        }

        pub fn with_combined(mut self, cmdline: &str, output: &str) -> Self {
            self.combined.insert(cmdline.to_string(), output.to_string());
            self
        }

        fn key(program: &str, args: &[&str]) -> String {
            std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    impl CommandRunner for FakeRunner {
        fn stdout(&self, program: &str, args: &[&str]) -> Option<String> {
            let key = Self::key(program, args);
            self.calls.borrow_mut().push(key.clone());
            self.stdout.get(&key).cloned()
        }

        fn combined(&self, program: &str, args: &[&str]) -> Option<String> {
            let key = Self::key(program, args);
            self.calls.borrow_mut().push(key.clone());
            self.combined
                .get(&key)
                .or_else(|| self.stdout.get(&key))
                .cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_args() {
        assert_eq!(separate_args("mpiexec -n 4"), vec!["mpiexec", "-n", "4"]);
        assert_eq!(
            separate_args("run \"two words\" --opt=\"a b\""),
            vec!["run", "two words", "--opt=\"a b\""]
        );
        assert_eq!(separate_args("a\\ b"), vec!["a\\", "b"]);
        assert_eq!(separate_args("path\\tmp x"), vec!["pathtmp", "x"]);
        assert!(separate_args("   ").is_empty());
    }

    #[test]
    fn test_enquote_arg() {
        assert_eq!(enquote_arg("plain"), "plain");
        assert_eq!(enquote_arg("two words"), "\"two words\"");
        assert_eq!(enquote_arg("--option=\"string 1\""), "--option=\"string 1\"");
    }

    #[test]
    fn test_assemble_args() {
        assert_eq!(
            assemble_args(&["solver", "-in", "my case.xml"]),
            "solver -in \"my case.xml\""
        );
    }

    #[test]
    fn test_find_in_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mpiexec"), "").unwrap();
        let dirs = vec![PathBuf::from("/nonexistent"), dir.path().to_path_buf()];

        assert_eq!(find_in_dirs("mpiexec", &dirs), Some(dir.path().join("mpiexec")));
        assert_eq!(find_in_dirs("mpirun", &dirs), None);

        let abs = dir.path().join("mpiexec");
        assert_eq!(find_in_dirs(abs.to_str().unwrap(), &[]), Some(abs));
    }

    #[test]
    fn test_child_path_prepends_bindir() {
        let runner = SystemRunner::with_bindir("/opt/mpi/bin");
        let path = runner.child_path().unwrap();
        let first = env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/opt/mpi/bin"));
        assert!(SystemRunner::new().child_path().is_none());
    }
}
