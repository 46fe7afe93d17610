use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One immutable revision of a tracked resource.
///
/// The `version` descriptor is opaque to us; a `BTreeMap` keeps its keys
/// sorted so the printable key is stable across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVersion {
    /// Server-assigned identifier, used to query `input_to`
    pub id: u64,
    /// Descriptor such as `{"ref": "abc123"}`
    #[serde(default)]
    pub version: BTreeMap<String, String>,
}

impl ResourceVersion {
    /// Printable key for this version: the descriptor as canonical JSON.
    pub fn key(&self) -> String {
        // A map of strings always serializes.
        serde_json::to_string(&self.version).unwrap_or_else(|_| format!("#{}", self.id))
    }
}

/// A build that consumed a version as one of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// One-off builds have no job and are reported without `job_name`
    #[serde(default)]
    pub job_name: String,
    pub status: BuildStatus,
}

/// Terminal or in-flight state of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Succeeded,
    Failed,
    Started,
    Errored,
    Aborted,
    Pending,
    #[default]
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_parses_known_and_unknown_values() {
        let statuses: Vec<BuildStatus> =
            serde_json::from_str(r#"["succeeded","failed","started","errored","aborted","pending","bogus"]"#)
                .unwrap();

        assert_eq!(
            statuses,
            vec![
                BuildStatus::Succeeded,
                BuildStatus::Failed,
                BuildStatus::Started,
                BuildStatus::Errored,
                BuildStatus::Aborted,
                BuildStatus::Pending,
                BuildStatus::Unknown,
            ]
        );
    }

    #[test]
    fn test_build_ignores_extra_fields() {
        let build: Build = serde_json::from_str(
            r#"{"id": 42, "name": "7", "job_name": "deploy", "pipeline_name": "main", "status": "failed"}"#,
        )
        .unwrap();

        assert_eq!(build.job_name, "deploy");
        assert_eq!(build.status, BuildStatus::Failed);
    }

    #[test]
    fn test_version_key_is_sorted_json() {
        let version: ResourceVersion = serde_json::from_str(
            r#"{"id": 17, "version": {"ref": "abc", "branch": "main"}, "enabled": true}"#,
        )
        .unwrap();

        assert_eq!(version.id, 17);
        assert_eq!(version.key(), r#"{"branch":"main","ref":"abc"}"#);
    }
}
