//! Terminal rendering: ariadne diagnostics, JSON envelopes and the layout
//! table.
//!
//! Diagnostics go to stderr in pretty mode so generated data on stdout stays
//! clean. In JSON mode everything a command reports is a single document on
//! stdout.

use std::fmt::Write as _;
use std::io::{self, IsTerminal};

use ariadne::{Color, Config, Fmt, Label, Report, ReportKind, Source};
use copybook_toolchain_core::LayoutRow;
use copybook_toolchain_diagnostics::{Diagnostic, LineIndex, Severity};
use serde::Serialize;

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, or pick from whether stdout is a TTY.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Severity mapping ────────────────────────────────────────────────────

fn report_kind(severity: &Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warn => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warn => Color::Yellow,
        Severity::Info => Color::Blue,
        _ => Color::White,
    }
}

fn severity_word(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warn => "warning",
        Severity::Info => "info",
        _ => "diagnostic",
    }
}

/// `key=value` pairs from a diagnostic's context, comma separated.
fn context_note(diag: &Diagnostic) -> Option<String> {
    let ctx = diag.context.as_ref().filter(|ctx| !ctx.is_empty())?;
    Some(
        ctx.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

// ── Pretty rendering ────────────────────────────────────────────────────

/// Render diagnostics with source context to stderr.
///
/// Spans refer to `source`, which for copybooks is the normalised text.
/// Diagnostics without a span are printed as one-line messages.
pub(crate) fn render_diagnostics_pretty(source: &str, filename: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default().with_compact(false);
    let mut cache = (filename, Source::from(source));

    for diag in diagnostics {
        let note = context_note(diag);

        let Some(span) = &diag.span else {
            eprintln!("{}[{}]: {}", severity_word(&diag.severity), diag.id, diag.message);
            if let Some(note) = &note {
                eprintln!("  = note: {note}");
            }
            if let Some(explanation) = diag.explain() {
                eprintln!("  = help: {explanation}");
            }
            continue;
        };

        // Clamp to the source so a stale span cannot panic the renderer.
        let start = span.start.min(source.len());
        let end = span.end.min(source.len()).max(start);

        let label_msg = note.clone().unwrap_or_else(|| diag.message.clone());
        let mut builder = Report::build(report_kind(&diag.severity), (filename, start..end))
            .with_code(diag.id.as_ref())
            .with_message(&diag.message)
            .with_config(config)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(label_msg)
                    .with_color(severity_color(&diag.severity)),
            );
        if let Some(note) = note {
            builder = builder.with_note(note);
        }
        if let Some(explanation) = diag.explain() {
            builder = builder.with_help(explanation);
        }

        builder.finish().eprint(&mut cache).ok();
    }
}

/// Print a coloured `N errors, M warnings` line to stderr.
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    let (mut errors, mut warnings, mut infos) = (0usize, 0usize, 0usize);
    for d in diagnostics {
        match d.severity {
            Severity::Error => errors += 1,
            Severity::Info => infos += 1,
            _ => warnings += 1,
        }
    }
    if errors + warnings + infos == 0 {
        return;
    }

    let mut parts = Vec::new();
    if errors > 0 {
        let s = if errors == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{errors} error{s}").fg(Color::Red)));
    }
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{warnings} warning{s}").fg(Color::Yellow)));
    }
    if infos > 0 {
        parts.push(format!("{}", format!("{infos} info").fg(Color::Blue)));
    }
    eprintln!("{}", parts.join(", "));
}

// ── JSON rendering ──────────────────────────────────────────────────────

/// Print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("JSON value serialization cannot fail")
    );
}

/// A diagnostic with the 1-based line and column its span starts at.
#[derive(Debug, Serialize)]
pub(crate) struct Located<'a> {
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
}

/// Attach source positions to diagnostics for JSON output.
pub(crate) fn locate<'a>(source: &str, diagnostics: &'a [Diagnostic]) -> Vec<Located<'a>> {
    let index = LineIndex::new(source);
    diagnostics
        .iter()
        .map(|diagnostic| {
            let position = diagnostic.span.as_ref().map(|span| index.line_col(span.start));
            Located {
                diagnostic,
                line: position.map(|(line, _)| line + 1),
                column: position.map(|(_, col)| col + 1),
            }
        })
        .collect()
}

/// Report a failed command: `{"ok": false, "diagnostics": [...]}` in JSON
/// mode, source-annotated diagnostics and a summary line otherwise.
pub(crate) fn report_failure(
    source: &str,
    filename: &str,
    diagnostics: &[Diagnostic],
    format: Format,
) {
    match format {
        Format::Json => print_json(&serde_json::json!({
            "ok": false,
            "diagnostics": locate(source, diagnostics),
        })),
        Format::Pretty => {
            render_diagnostics_pretty(source, filename, diagnostics);
            print_summary(diagnostics);
        }
    }
}

// ── Layout table ────────────────────────────────────────────────────────

/// Format layout rows as an aligned table, names indented by depth.
pub(crate) fn layout_table(rows: &[LayoutRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.depth * 2 + r.name.len())
        .chain(std::iter::once("FIELD".len()))
        .max()
        .unwrap_or(0);
    let pic_width = rows
        .iter()
        .filter_map(|r| r.picture.as_ref().map(String::len))
        .chain(std::iter::once("PIC".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<name_width$} {:<pic_width$} {:>5} {:>6} {:>6} {:>6} {:>6} {:>6}  REDEFINES",
        "LVL", "FIELD", "PIC", "OCC", "START", "END", "GSTART", "GEND", "SIZE",
    );
    for row in rows {
        let name = format!("{}{}", "  ".repeat(row.depth), row.name);
        let occurs = row.occurs.map(|n| n.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<4} {:<name_width$} {:<pic_width$} {:>5} {:>6} {:>6} {:>6} {:>6} {:>6}  {}",
            format!("{:02}", row.level),
            name,
            row.picture.as_deref().unwrap_or(""),
            occurs,
            row.local_start,
            row.local_end,
            row.global_start,
            row.global_end,
            row.size,
            row.redefines.as_deref().unwrap_or(""),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use copybook_toolchain_diagnostics::Span;

    fn row(depth: usize, level: u32, name: &str, picture: Option<&str>, size: usize) -> LayoutRow {
        LayoutRow {
            depth,
            level,
            name: name.into(),
            picture: picture.map(Into::into),
            occurs: None,
            redefines: None,
            local_start: 1,
            local_end: size,
            global_start: 1,
            global_end: size,
            size,
        }
    }

    #[test]
    fn layout_table_indents_children() {
        let rows = [row(0, 1, "REC", None, 3), row(1, 5, "A", Some("X(3)"), 3)];
        let table = layout_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("LVL  FIELD"));
        assert!(lines[1].starts_with("01   REC "));
        assert!(lines[2].starts_with("05     A "), "{:?}", lines[2]);
        assert!(lines[2].contains("X(3)"));
    }

    #[test]
    fn located_diagnostics_carry_one_based_positions() {
        let source = "       01  REC.\n           05  A  PIC X  BOGUS.\n";
        let start = source.find("BOGUS").unwrap();
        let diagnostics = [
            Diagnostic::for_code("CPY0001", "unexpected", Some(Span::new(start, start + 5))),
            Diagnostic::for_code("CPY0101", "no root", None),
        ];
        let json = serde_json::to_value(locate(source, &diagnostics)).unwrap();
        assert_eq!(json[0]["id"], "CPY0001");
        assert_eq!(json[0]["line"], 2);
        assert_eq!(json[0]["column"], 26);
        assert!(json[1].get("line").is_none());
        assert_eq!(json[1]["message"], "no root");
    }

    #[test]
    fn context_note_joins_pairs() {
        let d = Diagnostic::for_code("CPY1103", "x", None).with_context(
            [("field".to_string(), "B".to_string()), ("target".to_string(), "A".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(context_note(&d).as_deref(), Some("field=B, target=A"));
        assert_eq!(context_note(&Diagnostic::for_code("CPY1103", "x", None)), None);
    }
}
