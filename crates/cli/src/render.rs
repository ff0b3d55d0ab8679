//! Pretty diagnostic rendering using ariadne.
//!
//! Diagnostics arrive with spans already moved to file offsets, so one
//! [`Source`] serves every line of the file.

use std::io::{self, IsTerminal};

use ariadne::{Color, Config, Fmt, Label, Report, ReportKind, Source};
use hed_toolchain_core::{Diagnostic, Severity};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, else pretty on a terminal and JSON on a pipe.
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

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        _ => Color::Yellow,
    }
}

fn context_note(diag: &Diagnostic) -> Option<String> {
    let ctx = diag.context.as_ref().filter(|c| !c.is_empty())?;
    Some(
        ctx.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn help_text(diag: &Diagnostic) -> Option<String> {
    let explanation = diag.explain()?;
    Some(match diag.hed_code() {
        Some(code) => format!("{explanation} [{code}]"),
        None => explanation.to_string(),
    })
}

// ── Rendering ───────────────────────────────────────────────────────────

/// Render diagnostics to stderr against the whole source file.
pub(crate) fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default().with_compact(false);
    let mut cache = (filename, Source::from(source));

    for diag in diagnostics {
        let Some(span) = diag.span else {
            eprintln!("{}[{}]: {}", diag.severity, diag.id, diag.message);
            if let Some(note) = context_note(diag) {
                eprintln!("  = note: {note}");
            }
            if let Some(help) = help_text(diag) {
                eprintln!("  = help: {help}");
            }
            continue;
        };

        // Clamp to the source length.
        let start = span.start.min(source.len());
        let end = span.end.min(source.len()).max(start);

        let mut builder = Report::build(report_kind(diag.severity), (filename, start..end))
            .with_code(diag.id.as_ref())
            .with_message(&diag.message)
            .with_config(config)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(context_note(diag).unwrap_or_else(|| diag.message.clone()))
                    .with_color(severity_color(diag.severity)),
            );
        if let Some(help) = help_text(diag) {
            builder = builder.with_help(help);
        }
        builder.finish().eprint(&mut cache).ok();
    }
}

/// Print a coloured count of errors and warnings to stderr.
///
/// Example: `2 errors, 1 warning`
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    if errors + warnings == 0 {
        return;
    }

    let mut parts = Vec::new();
    if errors > 0 {
        let s = if errors == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{errors} error{s}").fg(Color::Red)));
    }
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!(
            "{}",
            format!("{warnings} warning{s}").fg(Color::Yellow)
        ));
    }
    eprintln!("{}", parts.join(", "));
}
