use std::fmt::Write;

use comfy_table::Cell;

use crate::matrix::StatusMatrix;

use super::styling::{heading, muted};
use super::tables::{create_table, header_cell, status_cell};

/// Prints the status matrix to stdout as a color-coded table.
///
/// One row per version, newest first, with a colored dot for succeeded
/// (green), failed (red) and started (yellow) jobs.
pub fn print_matrix(pipeline: &str, matrix: &StatusMatrix) {
    println!("{}", render_matrix(pipeline, matrix));
}

fn render_matrix(pipeline: &str, matrix: &StatusMatrix) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "📋 {}",
        heading(format!("{pipeline} / {}", matrix.resource))
    );

    if matrix.is_empty() {
        let _ = writeln!(output, "{}", muted("No versions found"));
        return output;
    }

    let mut table = create_table();

    let mut header = vec![header_cell("#"), header_cell(&matrix.resource)];
    header.extend(matrix.jobs.iter().map(|job| header_cell(job)));
    table.set_header(header);

    for (version_key, row) in &matrix.rows {
        let mut cells = vec![Cell::new(row.id), Cell::new(version_key)];
        cells.extend(
            matrix
                .jobs
                .iter()
                .map(|job| status_cell(matrix.status(version_key, job))),
        );
        table.add_row(cells);
    }

    let _ = writeln!(output, "{table}");
    let _ = writeln!(
        output,
        "{}",
        muted(format!(
            "Updated {}",
            matrix.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ))
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concourse::BuildStatus;
    use crate::matrix::VersionRow;

    #[test]
    fn test_render_empty_matrix() {
        let matrix = StatusMatrix::empty("repo", &["build".to_string()]);

        let output = render_matrix("app", &matrix);

        assert!(output.contains("app / repo"));
        assert!(output.contains("No versions found"));
    }

    #[test]
    fn test_render_matrix_lists_versions_and_jobs() {
        let mut matrix =
            StatusMatrix::empty("repo", &["build".to_string(), "deploy".to_string()]);
        matrix.rows.insert(
            r#"{"ref":"abc"}"#.to_string(),
            VersionRow {
                id: 41,
                statuses: vec![BuildStatus::Succeeded, BuildStatus::Unknown],
            },
        );

        let output = render_matrix("app", &matrix);

        assert!(output.contains("build"));
        assert!(output.contains("deploy"));
        assert!(output.contains(r#"{"ref":"abc"}"#));
        assert!(output.contains("41"));
        assert!(output.contains("●"));
    }
}
