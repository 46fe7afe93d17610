use std::fmt::Write;

use crate::concourse::BuildStatus;
use crate::matrix::StatusMatrix;

/// Page-level settings that do not come from the CI server.
#[derive(Debug, Clone)]
pub struct PageOptions<'a> {
    pub pipeline: &'a str,
    pub refresh_seconds: u64,
    pub stylesheets: &'a [String],
}

/// Renders the status matrix as a self-refreshing HTML page.
///
/// Each row of the table body is one version, newest first, followed by
/// one cell per job. All text that originates from the CI server or the
/// request is escaped.
pub fn render_page(matrix: &StatusMatrix, options: &PageOptions<'_>) -> String {
    let mut html = String::with_capacity(2048);

    // Writing into a String cannot fail.
    let _ = write_page(&mut html, matrix, options);
    html
}

fn write_page(
    html: &mut String,
    matrix: &StatusMatrix,
    options: &PageOptions<'_>,
) -> std::fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "    <meta http-equiv=\"refresh\" content=\"{}\"/>",
        options.refresh_seconds
    )?;
    writeln!(
        html,
        "    <title>{} / {}</title>",
        escape(options.pipeline),
        escape(&matrix.resource)
    )?;
    for stylesheet in options.stylesheets {
        writeln!(
            html,
            "    <link rel=\"stylesheet\" href=\"{}\" media=\"screen\">",
            escape(stylesheet)
        )?;
    }
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "    <table class=\"table table-hover\">")?;

    write!(html, "<thead><tr><th scope=\"col\">{}</th>", escape(&matrix.resource))?;
    for job in &matrix.jobs {
        write!(html, "<th scope=\"col\">{}</th>", escape(job))?;
    }
    writeln!(html, "</tr></thead>")?;

    write!(html, "<tbody>")?;
    for version_key in matrix.rows.keys() {
        write!(html, "<tr><td>{}</td>", escape(version_key))?;
        for job in &matrix.jobs {
            write!(html, "<td>{}</td>", status_badge(matrix.status(version_key, job)))?;
        }
        write!(html, "</tr>")?;
    }
    writeln!(html, "</tbody>")?;

    writeln!(html, "    </table>")?;
    writeln!(
        html,
        "    <p class=\"text-muted\"><small>Updated {}</small></p>",
        matrix.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(())
}

/// Renders a short HTML page carrying a single message, for error responses.
pub fn render_message(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"></head>\n<body><p>{}</p></body>\n</html>\n",
        escape(message)
    )
}

fn status_badge(status: BuildStatus) -> &'static str {
    match status {
        BuildStatus::Succeeded => r#"<button type="button" class="btn btn-success"> </button>"#,
        BuildStatus::Failed => r#"<button type="button" class="btn btn-danger"> </button>"#,
        BuildStatus::Started => r#"<button type="button" class="btn btn-warning"> </button>"#,
        _ => "",
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
