use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::concourse::BuildStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label).fg(TableColor::Cyan)
}

/// Green, red and yellow for succeeded, failed and started builds; blank otherwise.
pub fn status_cell(status: BuildStatus) -> Cell {
    match status {
        BuildStatus::Succeeded => Cell::new("●").fg(TableColor::Green),
        BuildStatus::Failed => Cell::new("●").fg(TableColor::Red),
        BuildStatus::Started => Cell::new("●").fg(TableColor::Yellow),
        _ => Cell::new(""),
    }
}
