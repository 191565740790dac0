//! Password lookup for hosts that prompt for one.
//!
//! The credential table is a plain text file of `host password` lines.
//! Blank lines and lines starting with `#` are skipped; a later entry for the
//! same host replaces an earlier one.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigLayer;

/// Credential table used when none is configured.
pub const DEFAULT_PASSWORD_DB: &str = "password_db.txt";

/// Errors from credential resolution.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No password could be found or asked for.
    #[error("cannot retrieve password for {host} in batch mode")]
    Unavailable {
        /// Host the password was needed for.
        host: String,
    },

    /// The credential table exists but could not be read.
    #[error("reading credential table {}: {source}", path.display())]
    Read {
        /// Table path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Host to password map.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialTable {
    entries: HashMap<String, String>,
}

impl CredentialTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table at `path`. A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no credential table");
                Ok(Self::new())
            }
            Err(source) => Err(CredentialError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse table content.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut table = Self::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(host), Some(password)) => table.insert(host, password),
                _ => tracing::warn!(line = number + 1, "credential line without a password"),
            }
        }
        table
    }

    /// Add or replace the password for `host`.
    pub fn insert(&mut self, host: impl Into<String>, password: impl Into<String>) {
        self.entries.insert(host.into(), password.into());
    }

    /// Password for `host`.
    #[must_use]
    pub fn lookup(&self, host: &str) -> Option<&str> {
        self.entries.get(host).map(String::as_str)
    }

    /// Number of hosts in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CredentialTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialTable")
            .field("hosts", &self.entries.len())
            .finish()
    }
}

/// Fill in `layer.password` if the session will be asked for one.
///
/// Order: a password already in the layer, then the table entry for the
/// host, then `prompt`. `prompt` returns `None` when it cannot ask, for
/// example when stdin is not a terminal.
pub fn resolve_password<F>(
    layer: &mut ConfigLayer,
    table: &CredentialTable,
    prompt: F,
) -> Result<(), CredentialError>
where
    F: FnOnce(&str) -> Option<String>,
{
    if !layer.needs_password() || layer.password.as_deref().is_some_and(|p| !p.is_empty()) {
        return Ok(());
    }

    let host = layer.host.clone().unwrap_or_default();
    if let Some(password) = table.lookup(&host) {
        tracing::debug!(host = %host, "password taken from credential table");
        layer.password = Some(password.to_string());
        return Ok(());
    }

    match prompt(&host) {
        Some(password) => {
            layer.password = Some(password);
            Ok(())
        }
        None => Err(CredentialError::Unavailable { host }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn layer(host: &str) -> ConfigLayer {
        ConfigLayer {
            host: Some(host.into()),
            ..ConfigLayer::defaults()
        }
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let table = CredentialTable::parse("# lab\n\nrouter1 s3cret\n  router2\tother  \nbroken\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("router1"), Some("s3cret"));
        assert_eq!(table.lookup("router2"), Some("other"));
        assert_eq!(table.lookup("broken"), None);
    }

    #[test]
    fn later_entry_wins() {
        let table = CredentialTable::parse("r1 old\nr1 new\n");
        assert_eq!(table.lookup("r1"), Some("new"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = CredentialTable::load(&dir.path().join("nope.txt")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "console1 pw1").unwrap();
        let table = CredentialTable::load(file.path()).unwrap();
        assert_eq!(table.lookup("console1"), Some("pw1"));
    }

    #[test]
    fn explicit_password_wins() {
        let mut layer = layer("r1");
        layer.password = Some("given".into());
        let table = CredentialTable::parse("r1 stored");
        resolve_password(&mut layer, &table, |_| panic!("must not prompt")).unwrap();
        assert_eq!(layer.password.as_deref(), Some("given"));
    }

    #[test]
    fn table_before_prompt() {
        let mut layer = layer("r1");
        let table = CredentialTable::parse("r1 stored");
        resolve_password(&mut layer, &table, |_| panic!("must not prompt")).unwrap();
        assert_eq!(layer.password.as_deref(), Some("stored"));
    }

    #[test]
    fn prompt_last() {
        let mut layer = layer("r2");
        let table = CredentialTable::parse("r1 stored");
        resolve_password(&mut layer, &table, |host| Some(format!("typed-for-{host}"))).unwrap();
        assert_eq!(layer.password.as_deref(), Some("typed-for-r2"));
    }

    #[test]
    fn unavailable_without_prompt() {
        let mut layer = layer("r2");
        let err = resolve_password(&mut layer, &CredentialTable::new(), |_| None).unwrap_err();
        assert!(matches!(err, CredentialError::Unavailable { ref host } if host == "r2"));
        assert!(layer.password.is_none());
    }

    #[test]
    fn not_needed_without_password_prompt() {
        let mut layer = layer("r1");
        layer.password_prompt = Some(String::new());
        resolve_password(&mut layer, &CredentialTable::new(), |_| None).unwrap();
        assert!(layer.password.is_none());
    }
}
