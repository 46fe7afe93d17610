use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use log::{debug, info};

use crate::concourse::{BuildStatus, ConcourseClient, ResourceVersion};
use crate::error::{BoardError, Result};
use crate::reducer::reduce_statuses;

/// What to show on one dashboard page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixQuery {
    pub team: String,
    pub pipeline: String,
    pub resource: String,
    pub jobs: Vec<String>,
    pub limit: usize,
}

/// One version's row: its server id and one status per requested job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRow {
    pub id: u64,
    pub statuses: Vec<BuildStatus>,
}

/// Statuses of the requested jobs for the latest versions of a resource.
///
/// Rows are keyed by printable version key and kept newest first. Every row
/// holds exactly one status per job.
#[derive(Debug, Clone)]
pub struct StatusMatrix {
    pub resource: String,
    pub jobs: Vec<String>,
    pub rows: IndexMap<String, VersionRow>,
    pub generated_at: DateTime<Utc>,
}

impl StatusMatrix {
    pub fn empty(resource: &str, jobs: &[String]) -> Self {
        Self {
            resource: resource.to_string(),
            jobs: jobs.to_vec(),
            rows: IndexMap::new(),
            generated_at: Utc::now(),
        }
    }

    /// True when the resource has no versions yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Status of `job` for the version with the given key; `Unknown` when
    /// either is not part of the matrix.
    pub fn status(&self, version_key: &str, job: &str) -> BuildStatus {
        let Some(row) = self.rows.get(version_key) else {
            return BuildStatus::Unknown;
        };

        self.jobs
            .iter()
            .position(|j| j == job)
            .and_then(|index| row.statuses.get(index).copied())
            .unwrap_or_default()
    }

    fn push_row(&mut self, version: &ResourceVersion, statuses: Vec<BuildStatus>) {
        let mut key = version.key();
        if self.rows.contains_key(&key) {
            key = format!("{key} #{}", version.id);
        }
        self.rows.insert(
            key,
            VersionRow {
                id: version.id,
                statuses,
            },
        );
    }
}

/// Builds the status matrix for one resource.
///
/// Fetches the latest `query.limit` versions, then the consuming builds of
/// each version with at most `max_in_flight` queries outstanding. Rows keep
/// the order the server returned the versions in. Any API error fails the
/// whole matrix.
pub async fn build_matrix(
    client: &ConcourseClient,
    query: &MatrixQuery,
    max_in_flight: usize,
) -> Result<StatusMatrix> {
    let mut versions = client
        .list_recent_versions(&query.team, &query.pipeline, &query.resource, query.limit)
        .await?;

    if versions.is_empty() {
        info!(
            "No versioned resources for {}/{}",
            query.pipeline, query.resource
        );
        return Ok(StatusMatrix::empty(&query.resource, &query.jobs));
    }

    if versions.len() > query.limit {
        debug!(
            "Server returned {} versions, keeping the latest {}",
            versions.len(),
            query.limit
        );
        versions.truncate(query.limit);
    }

    let version_ids: Vec<u64> = versions.iter().map(|version| version.id).collect();

    let rows: Vec<Vec<BuildStatus>> = stream::iter(version_ids)
        .map(|version_id| async move {
            let builds = client
                .list_builds_consuming_version(
                    &query.team,
                    &query.pipeline,
                    &query.resource,
                    version_id,
                )
                .await?;
            let by_job = reduce_statuses(&builds);

            let statuses: Vec<BuildStatus> = query
                .jobs
                .iter()
                .map(|job| by_job.get(job).copied().unwrap_or_default())
                .collect();
            Ok::<_, BoardError>(statuses)
        })
        .buffered(max_in_flight.max(1))
        .try_collect()
        .await?;

    let mut matrix = StatusMatrix::empty(&query.resource, &query.jobs);
    for (version, statuses) in versions.iter().zip(rows) {
        matrix.push_row(version, statuses);
    }

    debug!(
        "Built {}x{} matrix for {}/{}",
        matrix.rows.len(),
        matrix.jobs.len(),
        query.pipeline,
        query.resource
    );

    Ok(matrix)
}
