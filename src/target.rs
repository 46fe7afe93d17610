use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{BoardError, Result};

/// Name under which a freshly logged-in target is saved.
pub const DEFAULT_TARGET_NAME: &str = "progress-board";

const RC_FILE_NAME: &str = ".flyrc";

/// Bearer credential as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetToken {
    #[serde(rename = "type")]
    pub token_type: String,
    pub value: String,
}

impl TargetToken {
    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

/// A named, authenticated connection to one CI server and team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub api: String,
    pub team: String,
    pub insecure: bool,
    pub token: TargetToken,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RcFile {
    #[serde(default)]
    targets: BTreeMap<String, RcTarget>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RcTarget {
    api: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<TargetToken>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

/// Persists bearer credentials keyed by target name.
///
/// The file layout matches the CI's own command-line tool, so targets saved
/// by either program can be used by the other:
///
/// ```yaml
/// targets:
///   main:
///     api: https://ci.example.com
///     team: main
///     insecure: false
///     token:
///       type: bearer
///       value: eyJhbGciOi...
/// ```
pub struct TargetStore {
    path: PathBuf,
}

impl TargetStore {
    /// Store backed by `~/.flyrc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| BoardError::Config("No home directory found".into()))?;
        Ok(Self::at(home.join(RC_FILE_NAME)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves (or replaces) a target entry.
    ///
    /// The whole file is rewritten through a temporary file in the same
    /// directory and renamed into place, so readers never observe a partial
    /// write. Entries and fields this program does not know about survive.
    pub fn save(
        &self,
        name: &str,
        api: &str,
        team: &str,
        token_type: &str,
        token_value: &str,
        insecure: bool,
    ) -> Result<()> {
        let mut rc = self.read()?;

        let entry = rc.targets.entry(name.to_string()).or_default();
        entry.api = api.trim_end_matches('/').to_string();
        entry.team = team.to_string();
        entry.insecure = insecure;
        entry.token = Some(TargetToken {
            token_type: token_type.to_string(),
            value: token_value.to_string(),
        });

        let contents = serde_yaml::to_string(&rc)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BoardError::Io(e.error))?;

        info!("Saved target '{name}' to {}", self.path.display());
        Ok(())
    }

    /// Loads a target by name.
    ///
    /// # Errors
    ///
    /// Returns `TargetNotFound` when the file or entry is missing, and a
    /// configuration error when the entry has no token.
    pub fn load(&self, name: &str) -> Result<Target> {
        if !self.path.exists() {
            return Err(BoardError::TargetNotFound(format!(
                "{name} (no credential file at {})",
                self.path.display()
            )));
        }

        let rc = self.read()?;
        let entry = rc
            .targets
            .get(name)
            .ok_or_else(|| BoardError::TargetNotFound(name.to_string()))?;

        let token = entry.token.clone().ok_or_else(|| {
            BoardError::Config(format!(
                "target '{name}' has no saved token; log in with --username and --password"
            ))
        })?;

        debug!("Loaded target '{name}' ({})", entry.api);

        Ok(Target {
            name: name.to_string(),
            api: entry.api.trim_end_matches('/').to_string(),
            team: entry.team.clone(),
            insecure: entry.insecure,
            token,
        })
    }

    fn read(&self) -> Result<RcFile> {
        if !self.path.exists() {
            return Ok(RcFile::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(RcFile::default());
        }

        Ok(serde_yaml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_store(dir: &TempDir) -> TargetStore {
        TargetStore::at(dir.path().join(RC_FILE_NAME))
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);

        store
            .save("ci", "https://ci.example.com/", "main", "Bearer", "abc", true)
            .unwrap();

        let target = store.load("ci").unwrap();
        assert_eq!(target.name, "ci");
        assert_eq!(target.api, "https://ci.example.com");
        assert_eq!(target.team, "main");
        assert!(target.insecure);
        assert_eq!(target.token.header_value(), "Bearer abc");
    }

    #[test]
    fn test_save_overwrites_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);

        store
            .save("ci", "https://old.example.com", "main", "Bearer", "old", false)
            .unwrap();
        store
            .save("ci", "https://new.example.com", "ops", "Bearer", "new", false)
            .unwrap();

        let target = store.load("ci").unwrap();
        assert_eq!(target.api, "https://new.example.com");
        assert_eq!(target.team, "ops");
        assert_eq!(target.token.value, "new");
    }

    #[test]
    fn test_load_missing_file_is_target_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);

        let err = store.load("ci").unwrap_err();
        assert!(matches!(err, BoardError::TargetNotFound(_)));
    }

    #[test]
    fn test_load_missing_entry_is_target_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);
        store
            .save("ci", "https://ci.example.com", "main", "Bearer", "abc", false)
            .unwrap();

        let err = store.load("other").unwrap_err();
        assert!(matches!(err, BoardError::TargetNotFound(ref name) if name == "other"));
    }

    #[test]
    fn test_load_entry_without_token_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);
        fs::write(
            store.path(),
            "targets:\n  ci:\n    api: https://ci.example.com\n    team: main\n",
        )
        .unwrap();

        let err = store.load("ci").unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }

    #[test]
    fn test_save_preserves_unknown_fields_and_targets() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);
        fs::write(
            store.path(),
            r"targets:
  other:
    api: https://other.example.com
    team: main
    ca_cert: some-cert
    token:
      type: bearer
      value: xyz
future_setting: 3
",
        )
        .unwrap();

        store
            .save("ci", "https://ci.example.com", "main", "Bearer", "abc", false)
            .unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("future_setting: 3"));
        assert!(contents.contains("ca_cert: some-cert"));

        let other = store.load("other").unwrap();
        assert_eq!(other.token.header_value(), "bearer xyz");
        assert_eq!(store.load("ci").unwrap().token.value, "abc");
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&temp_dir);

        store
            .save("ci", "https://ci.example.com", "main", "Bearer", "abc", false)
            .unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
