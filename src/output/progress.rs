use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::concourse::BuildStatus;

use super::styling::status_text;

/// Spinner shown on stderr while a snapshot is being fetched
pub struct FetchProgress {
    pb: ProgressBar,
}

impl FetchProgress {
    pub fn start(resource: &str, limit: usize) -> Self {
        let pb = create_spinner(
            status_text(
                BuildStatus::Started,
                format!("Fetching the latest {limit} versions of {resource} and their builds"),
            )
            .to_string(),
        );
        Self { pb }
    }

    pub fn finish(self, versions: usize) {
        self.pb.finish_with_message(
            status_text(
                BuildStatus::Succeeded,
                format!("Fetched builds for {versions} versions ✓"),
            )
            .to_string(),
        );
        eprintln!();
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(status_text(BuildStatus::Failed, "Fetching failed ✗").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
