use std::collections::HashMap;

use crate::concourse::{Build, BuildStatus};

/// Collapses the builds of one version into a single status per job.
///
/// Builds are folded in the order the API returned them. The first
/// `Succeeded` seen for a job is final; any other status is replaced by the
/// next build of the same job, so among non-successes the last one wins.
pub fn reduce_statuses(builds: &[Build]) -> HashMap<String, BuildStatus> {
    let mut statuses: HashMap<String, BuildStatus> = HashMap::new();

    for build in builds {
        statuses
            .entry(build.job_name.clone())
            .and_modify(|current| {
                if *current != BuildStatus::Succeeded {
                    *current = build.status;
                }
            })
            .or_insert(build.status);
    }

    statuses
}
