use std::fmt::Display;

use console::{style, StyledObject};

use crate::concourse::BuildStatus;

/// Tool name in the startup banner.
pub fn banner(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Pipeline and resource heading above the terminal table.
pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

/// Addresses the operator is expected to open.
pub fn link(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan().underlined()
}

/// Text colored like the build status it reports on: green for success,
/// red for failures, yellow while work is still in progress.
pub fn status_text(status: BuildStatus, text: impl Display) -> StyledObject<String> {
    let styled = style(text.to_string()).bright();
    match status {
        BuildStatus::Succeeded => styled.green(),
        BuildStatus::Failed | BuildStatus::Errored | BuildStatus::Aborted => styled.red(),
        _ => styled.yellow(),
    }
}
