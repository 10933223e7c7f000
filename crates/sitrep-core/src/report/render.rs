//! Presentation adapters. Both read the [`Report`] without changing it.

use crate::domain::Result;
use crate::report::{Report, SourceSection, SourceStatus, NO_SOURCES_AVAILABLE};

/// Render the report as pretty JSON for machine consumers.
pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render the report as markdown for terminals and PR comments.
pub fn render_markdown(report: &Report) -> String {
    let mut out = format!("# Status: {}\n\n", report.window_label);
    out.push_str(&format!(
        "_generated {}_\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    if report.no_sources_available {
        out.push_str(&format!("\n**{NO_SOURCES_AVAILABLE}**\n"));
    }

    if report.has_attention() {
        out.push_str("\n## Needs attention\n\n");
        for failed in &report.attention.failed_sources {
            out.push_str(&format!(
                "- **failed** `{}`: {}\n",
                failed.source_id, failed.detail
            ));
        }
        for item in &report.attention.items {
            let label = item.title.as_deref().unwrap_or(&item.record.identifier);
            out.push_str(&format!(
                "- **{}** `{}` {}: {}",
                item.severity.as_str(),
                item.record,
                label,
                item.reason
            ));
            if let Some(url) = &item.url {
                out.push_str(&format!(" <{url}>"));
            }
            out.push('\n');
        }
        if report.attention.omitted > 0 {
            out.push_str(&format!(
                "\n_{} more item(s) not shown_\n",
                report.attention.omitted
            ));
        }
    }

    for section in &report.sections {
        render_section(&mut out, section);
    }

    if !report.notes.is_empty() {
        out.push_str("\n## Unavailable or errored sources\n\n");
        for note in &report.notes {
            let status = match note.status {
                SourceStatus::Success => "ok",
                SourceStatus::PartialSuccess => "partial",
                SourceStatus::Unavailable => "unavailable",
                SourceStatus::Error => "error",
            };
            out.push_str(&format!("- `{}` ({}): {}\n", note.source_id, status, note.detail));
        }
    }

    out
}

fn render_section(out: &mut String, section: &SourceSection) {
    out.push_str(&format!("\n## {}\n\n", section.source_id));
    if section.records.is_empty() {
        out.push_str("nothing in window\n");
        return;
    }

    for record in &section.records {
        out.push_str(&format!(
            "- `{}` [{}] {} ({})",
            record.identifier,
            record.state,
            record.title,
            record.updated_at.format("%Y-%m-%d")
        ));
        if !record.links.is_empty() {
            let links: Vec<String> = record.links.iter().map(ToString::to_string).collect();
            out.push_str(&format!(" → {}", links.join(", ")));
        }
        out.push('\n');
    }

    if let Some(truncation) = &section.truncation {
        out.push_str(&format!("\n_{truncation}_\n"));
    }
    if let Some(warning) = &section.warning {
        out.push_str(&format!("\n> {warning}\n"));
    }
}
