//! Environment snapshot
//!
//! All detection reads variables through [`Environment`] rather than
//! `std::env` directly, so one resolution sees a single consistent view and
//! tests can describe a scheduler without touching the process environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Immutable snapshot of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped; none of
    /// the scheduler variables we read can legitimately contain such bytes.
    pub fn capture() -> Self {
        let vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Build an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a variable
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Check whether a variable is set (even to an empty value)
    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Get a variable parsed as an unsigned count
    ///
    /// Unparsable values are logged and treated as absent.
    pub fn count(&self, key: &str) -> Option<usize> {
        let raw = self.var(key)?;
        match raw.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!("Ignoring non-numeric value {}={:?}", key, raw);
                None
            }
        }
    }

    /// Get a variable as a path
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.var(key).map(PathBuf::from)
    }

    /// Directories listed in `PATH`, empty entries dropped
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.var("PATH")
            .map(|p| {
                env::split_paths(p)
                    .filter(|d| !d.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_parsing() {
        let env = Environment::from_pairs([("NSLOTS", "16"), ("NHOSTS", "two")]);
        assert_eq!(env.count("NSLOTS"), Some(16));
        assert_eq!(env.count("NHOSTS"), None);
        assert_eq!(env.count("MISSING"), None);
    }

    #[test]
    fn test_search_path() {
        let env = Environment::from_pairs([("PATH", "/usr/bin::/opt/mpi/bin")]);
        assert_eq!(
            env.search_path(),
            vec![PathBuf::from("/usr/bin"), PathBuf::from("/opt/mpi/bin")]
        );
        assert!(Environment::default().search_path().is_empty());
    }

    #[test]
    fn test_is_set_with_empty_value() {
        let env = Environment::from_pairs([("SGE_TASK_ID", "")]);
        assert!(env.is_set("SGE_TASK_ID"));
        assert_eq!(env.var("SGE_TASK_ID"), Some(""));
    }
}
