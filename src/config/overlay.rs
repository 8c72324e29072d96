//! Site and user MPI settings
//!
//! Overlay files are TOML with an `[mpi]` table. Files are read in order
//! and later ones override earlier ones key by key:
//!
//! ```toml
//! [mpi]
//! mpiexec = "/opt/mpi/bin/mpiexec"
//! mpiexec_n = " -np "
//! mpmd = "script"
//! ```
//!
//! Keys map onto [`MpiEnvironmentConfig`] fields by name, except `mpmd`
//! which names the allowed MPMD syntaxes. An empty value unsets a field.

use crate::error::{LaunchError, Result};
use crate::mpi::{MpiEnvironmentConfig, MpmdMode};
use std::path::{Path, PathBuf};

/// Name of the overlay table
pub const MPI_SECTION: &str = "mpi";

/// Ordered MPI setting overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverlay {
    entries: Vec<(String, Option<String>)>,
}

impl ConfigOverlay {
    /// Create an empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from key/value pairs
    ///
    /// Values go through the same normalization as file values.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut overlay = Self::new();
        for (key, value) in pairs {
            overlay.set(key, value)?;
        }
        Ok(overlay)
    }

    /// Load overlay files in order, skipping missing ones
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut overlay = Self::new();
        for path in paths {
            if !path.is_file() {
                tracing::debug!("No configuration file at {}", path.display());
                continue;
            }
            let content = std::fs::read_to_string(path).map_err(|e| LaunchError::io(path, e))?;
            overlay.merge(Self::parse(&content, path)?);
        }
        Ok(overlay)
    }

    /// Parse the `[mpi]` table of a TOML document
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let parse_error = |message: String| LaunchError::ConfigParse {
            path: origin.to_path_buf(),
            message,
        };

        let document: toml::Table = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
        let mut overlay = Self::new();

        let section = match document.get(MPI_SECTION) {
            Some(toml::Value::Table(table)) => table,
            Some(_) => return Err(parse_error(format!("[{}] must be a table", MPI_SECTION))),
            None => return Ok(overlay),
        };

        for (key, value) in section {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    return Err(parse_error(format!("{}.{} must be a scalar", MPI_SECTION, key)))
                }
            };
            overlay.set(key, &text)?;
        }

        Ok(overlay)
    }

    /// Set a key, replacing any earlier value in place
    ///
    /// Keys are case-insensitive. Quotes wrapping the value are removed and
    /// an empty value means unset.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.trim().to_lowercase();
        let value = normalize_value(value);

        if key == "mpmd" {
            MpmdMode::parse(value.as_deref().unwrap_or("none"))?;
        }

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    /// Add the entries of a later overlay
    pub fn merge(&mut self, other: ConfigOverlay) {
        for (key, value) in other.entries {
            match self.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => self.entries.push((key, value)),
            }
        }
    }

    /// Get a value; `Some(None)` means the key unsets its field
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Check if the overlay is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Write every entry into a configuration
    pub fn apply(&self, config: &mut MpiEnvironmentConfig) -> Result<()> {
        for (key, value) in &self.entries {
            if key == "mpmd" {
                config.mpmd = match value {
                    Some(v) => MpmdMode::parse(v)?,
                    None => MpmdMode::NONE,
                };
            } else {
                config.set_field(key, value.clone())?;
            }
        }
        Ok(())
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let stripped = match value.chars().next() {
        Some(q @ ('"' | '\'')) if value.len() >= 2 && value.ends_with(q) => &value[1..value.len() - 1],
        _ => value,
    };
    (!stripped.is_empty()).then(|| stripped.to_string())
}
