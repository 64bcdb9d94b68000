use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::MediumError;

/// Durable key-value collaborator: one string payload per key, no
/// multi-key transactions.
pub trait KeyValueMedium {
    fn get(&self, key: &str) -> Result<Option<String>, MediumError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), MediumError>;
    fn remove(&mut self, key: &str) -> Result<(), MediumError>;
}

/// Replaces characters that are unsafe in file names.
#[must_use]
pub fn sanitize_key_for_filename(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' | '.' => '-',
            _ => c,
        })
        .collect()
}

/// File-backed medium: one file per key under a root directory.
///
/// Writes go through a temp file and a rename, so a failed write retains the
/// previous durable value for that key.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key_for_filename(key))
    }
}

impl KeyValueMedium for FileMedium {
    fn get(&self, key: &str) -> Result<Option<String>, MediumError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MediumError::io("reading key file", &path, source)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), MediumError> {
        fs::create_dir_all(&self.root)
            .map_err(|source| MediumError::io("creating medium root", &self.root, source))?;

        let path = self.key_path(key);
        let temp = self
            .root
            .join(format!("{}.{}.tmp", sanitize_key_for_filename(key), Uuid::new_v4()));

        fs::write(&temp, value)
            .map_err(|source| MediumError::io("writing temp key file", &temp, source))?;
        if let Err(source) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(MediumError::io("replacing key file", &path, source));
        }

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), MediumError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MediumError::io("removing key file", &path, source)),
        }
    }
}

/// In-memory medium for tests, with write-failure injection.
#[derive(Debug, Default, Clone)]
pub struct MemoryMedium {
    values: BTreeMap<String, String>,
    fail_writes: bool,
}

impl MemoryMedium {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a key before the medium is handed to the code under test.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Makes subsequent `set`/`remove` calls fail, simulating a full or
    /// refusing underlying medium.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>, MediumError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), MediumError> {
        if self.fail_writes {
            return Err(MediumError::WriteRefused {
                key: key.to_string(),
                reason: "write failure injected".to_string(),
            });
        }

        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), MediumError> {
        if self.fail_writes {
            return Err(MediumError::WriteRefused {
                key: key.to_string(),
                reason: "write failure injected".to_string(),
            });
        }

        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_key_for_filename, KeyValueMedium, MemoryMedium};

    #[test]
    fn sanitize_replaces_path_separators_and_dots() {
        assert_eq!(sanitize_key_for_filename("auth.token"), "auth-token");
        assert_eq!(sanitize_key_for_filename("a/b\\c:d e"), "a-b-c-d-e");
        assert_eq!(sanitize_key_for_filename("conversations"), "conversations");
    }

    #[test]
    fn memory_medium_round_trips_and_removes() {
        let mut medium = MemoryMedium::new();
        medium.set("k", "v").expect("set should succeed");
        assert_eq!(medium.get("k").expect("get should succeed").as_deref(), Some("v"));

        medium.remove("k").expect("remove should succeed");
        assert_eq!(medium.get("k").expect("get should succeed"), None);
    }

    #[test]
    fn memory_medium_write_failure_leaves_previous_value() {
        let mut medium = MemoryMedium::new().with_value("k", "old");
        medium.fail_writes(true);

        medium.set("k", "new").expect_err("injected write should fail");
        assert_eq!(medium.get("k").expect("get should succeed").as_deref(), Some("old"));
    }
}
