mod html;
mod progress;
mod styling;
mod summary;
mod tables;

pub use html::{render_message, render_page, PageOptions};
pub use progress::FetchProgress;
pub use styling::link;
pub use summary::print_matrix;

use styling::{banner, muted};

/// Prints the banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        banner("📊 progress-board"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Resource version dashboard for Concourse CI")
    );
}
