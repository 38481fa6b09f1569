//! Human-readable run summary for terminal output.
use colored::*;

use crate::convert::RunSummary;

/// Title line underlined to the title's width, styled after measuring so
/// escape codes do not count.
fn section_header(title: &str, color: Color) -> String {
    format!(
        "\n{}\n{}\n\n",
        title.bold().color(color),
        "─".repeat(title.chars().count())
    )
}

pub fn render_summary(summary: &RunSummary, output: &str) -> String {
    let mut out = String::new();
    out.push_str(&section_header("DMARC Report Conversion", Color::Cyan));
    if summary.converted.is_empty() {
        out.push_str("(No reports converted)\n");
    }
    for file in &summary.converted {
        out.push_str(&format!("  {}: {} rows\n", file.path.display(), file.rows));
    }
    out.push_str(&format!(
        "\nRows written: {} from {} report(s)\n",
        summary.rows_written(),
        summary.converted.len()
    ));
    out.push_str(&format!("Output: {}\n", output.green()));

    if !summary.skipped.is_empty() {
        let title = format!("Skipped Files ({})", summary.skipped.len());
        out.push_str(&section_header(&title, Color::Yellow));
        for path in &summary.skipped {
            let name = path.display().to_string();
            out.push_str(&format!("  {}\n", name.as_str().dimmed()));
        }
    }
    out
}
