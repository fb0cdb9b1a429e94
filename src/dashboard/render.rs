//! Plain-text rendering of a `DashboardView` for the terminal.

use std::fmt::Write;

use comfy_table::{presets::UTF8_FULL, Table};

use super::view::{DashboardView, LogRow, Panel, RiskBadge};

/// Width of the risk bar in characters.
const BAR_WIDTH: usize = 20;

/// Log rows are cut to this many characters.
const LOG_TEXT_CHARS: usize = 60;

/// `[########------------] 62 (moderate)`
pub fn risk_bar(badge: &RiskBadge) -> String {
    let filled = (usize::from(badge.score) * BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}] {} ({})",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        badge.score,
        badge.band
    )
}

pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();

    if let Some(banner) = &view.error {
        let _ = writeln!(out, "!! {}", banner.message);
        out.push('\n');
    }

    let _ = writeln!(out, "Risk        {}", risk_bar(&view.risk_meter.badge));
    if let Some(ms) = view.elapsed_ms {
        let _ = writeln!(out, "Last run    {ms} ms");
    }
    out.push('\n');

    section(&mut out, "Sanitized input", &view.sanitized, |out, s| {
        let _ = writeln!(out, "  {}", s.text);
        if s.entity_count > 0 {
            let _ = writeln!(out, "  entities: {} ({})", s.entity_count, s.labels.join(", "));
        }
        if !s.placeholders.is_empty() {
            let placeholders: Vec<String> = s
                .placeholders
                .iter()
                .map(|p| format!("{} ({})", p.placeholder, p.kind))
                .collect();
            let _ = writeln!(out, "  placeholders: {}", placeholders.join(", "));
        }
        if let Some(detected) = &s.detected_context {
            let _ = writeln!(out, "  detected context: {detected}");
        }
    });

    section(&mut out, "Context", &view.context, |out, c| {
        let _ = writeln!(
            out,
            "  category: {}  confidence: {}",
            c.category.as_deref().unwrap_or("—"),
            c.confidence
        );
    });

    section(&mut out, "LLM response", &view.llm, |out, l| {
        let _ = writeln!(out, "  {}", l.answer);
        let _ = writeln!(out, "  confidence: {}", l.confidence);
        if l.fallback_used {
            let _ = writeln!(out, "  (fallback response)");
        }
        if let Some(explanation) = &l.explanation {
            for line in explanation.lines() {
                let _ = writeln!(out, "  > {line}");
            }
        }
    });

    section(&mut out, "Output filter", &view.filter, |out, f| {
        let _ = writeln!(out, "  {}", f.safe_text);
        if f.leak_detected {
            let _ = writeln!(
                out,
                "  leak detected{}",
                f.notes
                    .as_deref()
                    .map(|n| format!(": {n}"))
                    .unwrap_or_default()
            );
        }
    });

    section(&mut out, "Final output", &view.final_output, |out, f| {
        let _ = writeln!(out, "  {}", f.text);
        let _ = writeln!(out, "  risk: {}", risk_bar(&f.risk));
    });

    section(&mut out, "Logs", &view.logs, |out, rows| {
        let _ = writeln!(out, "{}", log_table(rows));
    });

    out
}

/// Run log as a table, most recent run first.
fn log_table(rows: &[LogRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["SCORE", "BAND", "SANITIZED TEXT"]);
    for row in rows {
        let score = row.risk.score.to_string();
        let text = shorten(&row.text, LOG_TEXT_CHARS);
        table.add_row([score.as_str(), row.risk.band.label(), text.as_str()]);
    }
    table
}

fn section<T>(
    out: &mut String,
    title: &str,
    panel: &Panel<T>,
    body: impl FnOnce(&mut String, &T),
) {
    let _ = writeln!(out, "{title}");
    match panel {
        Panel::Loading => {
            let _ = writeln!(out, "  …");
        }
        Panel::Ready(data) => body(out, data),
        Panel::Empty { message } => {
            let _ = writeln!(out, "  {message}");
        }
    }
    out.push('\n');
}

fn shorten(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    match single_line.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &single_line[..idx]),
        None => single_line,
    }
}
