mod input;
mod render;

use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hed_toolchain_core::{
    AnnotatedRow, DefinitionManager, Diagnostic, EmitConfig, EventManager, HedSchemas,
    ParseOptions, TagForm, emit_hed, parse_hed_string, validate_hed_string,
};
use hed_toolchain_diagnostics as diag;
use tracing_subscriber::EnvFilter;

use crate::input::{Line, SourceFile, event_rows, load_schemas, parse_library};
use crate::render::{Format, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hed",
    version,
    about = "HED toolchain: parse, validate, and format HED annotation strings"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Schema selection shared by every command that reads annotations.
#[derive(Args, Debug)]
struct SchemaArgs {
    /// Path to the base schema JSON.
    #[arg(long)]
    schema: String,
    /// Library schema as `<prefix>=<path>`; repeatable.
    #[arg(long = "library", value_name = "PREFIX=PATH", value_parser = parse_library)]
    libraries: Vec<(String, String)>,
}

impl SchemaArgs {
    fn load(&self) -> Result<HedSchemas> {
        load_schemas(&self.schema, &self.libraries)
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse each line of a file (or `-` for stdin) and print its parse tree.
    Parse {
        file: String,
        #[command(flatten)]
        schemas: SchemaArgs,
    },

    /// Validate each line of a file as a HED string.
    Validate {
        file: String,
        #[command(flatten)]
        schemas: SchemaArgs,
        /// File of definition strings, one per line. Enables `Def` and
        /// `Def-expand` checks.
        #[arg(long)]
        definitions: Option<String>,
        /// Allow `Definition` groups in the validated lines.
        #[arg(long)]
        allow_definitions: bool,
        /// Allow `#` placeholders outside definitions.
        #[arg(long)]
        allow_placeholders: bool,
        /// Reject bare top-level tags that belong in a top-level group.
        #[arg(long)]
        full: bool,
    },

    /// Re-emit each line in short or long form.
    Format {
        file: String,
        #[command(flatten)]
        schemas: SchemaArgs,
        /// Emit full schema paths instead of short tag names.
        #[arg(long)]
        long: bool,
        /// Omit the space after each comma.
        #[arg(long)]
        compact: bool,
    },

    /// Check the Onset/Inset/Offset timeline of a tab-separated event file
    /// with `onset` and `HED` columns.
    Events {
        file: String,
        #[command(flatten)]
        schemas: SchemaArgs,
        /// Simultaneity tolerance in seconds.
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Explain a diagnostic ID (e.g. HED2001).
    Explain { id: String },
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match run(cli.cmd, format) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            match format {
                Format::Json => {
                    let out = serde_json::json!({
                        "success": false,
                        "error": "command_failed",
                        "message": format!("{err:#}"),
                    });
                    println!("{out}");
                }
                Format::Pretty => eprintln!("error: {err:#}"),
            }
            process::exit(1);
        }
    }
}

/// Run one command. `Ok(false)` means error diagnostics were reported.
fn run(cmd: Cmd, format: Format) -> Result<bool> {
    match cmd {
        Cmd::Parse { file, schemas } => cmd_parse(&file, &schemas, format),
        Cmd::Validate {
            file,
            schemas,
            definitions,
            allow_definitions,
            allow_placeholders,
            full,
        } => {
            let options = ParseOptions::default()
                .with_definitions(allow_definitions)
                .with_placeholders(allow_placeholders)
                .with_full_validation(full);
            cmd_validate(&file, &schemas, definitions.as_deref(), &options, format)
        }
        Cmd::Format {
            file,
            schemas,
            long,
            compact,
        } => {
            let config = EmitConfig {
                form: if long { TagForm::Long } else { TagForm::Short },
                compact,
            };
            cmd_format(&file, &schemas, &config, format)
        }
        Cmd::Events {
            file,
            schemas,
            tolerance,
        } => {
            let manager = tolerance.map_or_else(EventManager::new, EventManager::with_tolerance);
            cmd_events(&file, &schemas, &manager, format)
        }
        Cmd::Explain { id } => cmd_explain(&id, format),
    }
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_parse(file: &str, schema_args: &SchemaArgs, format: Format) -> Result<bool> {
    let source = SourceFile::read(file)?;
    let schemas = schema_args.load()?;

    let mut records = Vec::new();
    let mut all = Vec::new();
    for line in source.lines() {
        let result = parse_hed_string(line.hed, &schemas);
        records.push(serde_json::json!({
            "line": line.number,
            "hed": line.hed,
            "tree": result.parsed,
            "diagnostics": result.diagnostics,
        }));
        all.extend(line.relocate(&result.diagnostics));
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        Format::Pretty => {
            println!("{}", serde_json::to_string_pretty(&records)?);
            render_diagnostics(&source.text, &source.name, &all);
            print_summary(&all);
        }
    }
    Ok(!has_errors(&all))
}

fn cmd_validate(
    file: &str,
    schema_args: &SchemaArgs,
    definitions_path: Option<&str>,
    options: &ParseOptions,
    format: Format,
) -> Result<bool> {
    let source = SourceFile::read(file)?;
    let schemas = schema_args.load()?;

    let definitions = match definitions_path {
        Some(path) => {
            let def_source = SourceFile::read(path)?;
            let (manager, issues) = load_definitions(&def_source, &schemas);
            if !issues.is_empty() {
                report(format, &def_source, &issues, "definitions")?;
                return Ok(false);
            }
            Some(manager)
        }
        None => None,
    };

    let mut records = Vec::new();
    let mut all = Vec::new();
    for line in source.lines() {
        let diagnostics = validate_line(line, &schemas, options, definitions.as_ref());
        records.push(serde_json::json!({
            "line": line.number,
            "hed": line.hed,
            "ok": !has_errors(&diagnostics),
            "diagnostics": diagnostics,
        }));
        all.extend(line.relocate(&diagnostics));
    }

    let ok = !has_errors(&all);
    match format {
        Format::Json => {
            let out = serde_json::json!({ "ok": ok, "lines": records });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            render_diagnostics(&source.text, &source.name, &all);
            print_summary(&all);
            if ok {
                eprintln!("validation ok");
            }
        }
    }
    Ok(ok)
}

fn validate_line(
    line: Line<'_>,
    schemas: &HedSchemas,
    options: &ParseOptions,
    definitions: Option<&DefinitionManager<'_>>,
) -> Vec<Diagnostic> {
    let result = validate_hed_string(line.hed, schemas, options);
    let (Some(parsed), Some(manager)) = (&result.parsed, definitions) else {
        return result.diagnostics().cloned().collect();
    };
    let mut issues = manager.validate_defs(parsed, schemas, options.placeholders_allowed);
    if issues.is_empty() {
        issues = manager.validate_def_expands(parsed, schemas, options.placeholders_allowed);
    }
    if issues.is_empty() {
        result.warnings
    } else {
        issues
    }
}

fn load_definitions<'s>(
    source: &SourceFile,
    schemas: &'s HedSchemas,
) -> (DefinitionManager<'s>, Vec<Diagnostic>) {
    let mut manager = DefinitionManager::new();
    let mut issues = Vec::new();
    for line in source.lines() {
        let (definitions, errors) =
            DefinitionManager::create_definitions(std::slice::from_ref(&line.hed), schemas);
        issues.extend(line.relocate(&errors));
        let conflicts = manager.add_definitions(definitions);
        issues.extend(line.relocate(&conflicts));
    }
    tracing::debug!(definitions = manager.len(), issues = issues.len(), "loaded definitions");
    (manager, issues)
}

fn cmd_format(
    file: &str,
    schema_args: &SchemaArgs,
    config: &EmitConfig,
    format: Format,
) -> Result<bool> {
    let source = SourceFile::read(file)?;
    let schemas = schema_args.load()?;

    let mut records = Vec::new();
    let mut all = Vec::new();
    for line in source.lines() {
        let result = parse_hed_string(line.hed, &schemas);
        let formatted = result.parsed.as_ref().map(|p| emit_hed(p, config));
        if format == Format::Pretty
            && let Some(text) = &formatted
        {
            println!("{text}");
        }
        records.push(serde_json::json!({
            "line": line.number,
            "formatted": formatted,
            "diagnostics": result.diagnostics,
        }));
        all.extend(line.relocate(&result.diagnostics));
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        Format::Pretty => {
            render_diagnostics(&source.text, &source.name, &all);
            print_summary(&all);
        }
    }
    Ok(!has_errors(&all))
}

fn cmd_events(
    file: &str,
    schema_args: &SchemaArgs,
    manager: &EventManager,
    format: Format,
) -> Result<bool> {
    let source = SourceFile::read(file)?;
    let schemas = schema_args.load()?;

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    let mut located: Vec<Line<'_>> = Vec::new();
    for row in event_rows(&source)? {
        let result = parse_hed_string(row.line.hed, &schemas);
        issues.extend(row.line.relocate(&result.diagnostics));
        if let Some(hed) = result.parsed {
            rows.push(AnnotatedRow {
                onset: row.onset,
                hed,
                line: row.line.number,
            });
            located.push(row.line);
        }
    }
    // Event diagnostics name their row in the `line` context key.
    let locate = |diags: Vec<Diagnostic>| -> Vec<Diagnostic> {
        diags
            .into_iter()
            .flat_map(|d| {
                let number = d
                    .context
                    .as_ref()
                    .and_then(|c| c.get("line"))
                    .and_then(|l| l.parse::<usize>().ok());
                match located.iter().find(|l| Some(l.number) == number) {
                    Some(line) => line.relocate(std::slice::from_ref(&d)),
                    None => vec![d],
                }
            })
            .collect()
    };

    let mut events = Vec::new();
    if issues.is_empty() {
        match manager.parse_events(&rows) {
            Ok(parsed) => {
                issues.extend(locate(manager.validate(&parsed)));
                events = parsed;
            }
            Err(errors) => issues.extend(locate(errors)),
        }
    }

    let ok = !has_errors(&issues);
    match format {
        Format::Json => {
            let timeline: Vec<_> = events
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "definition": e.definition,
                        "kind": e.kind,
                        "onset": e.onset,
                        "line": e.line,
                    })
                })
                .collect();
            let out = serde_json::json!({
                "ok": ok,
                "events": timeline,
                "diagnostics": issues,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            for e in &events {
                println!(
                    "{:>12.6}  {:<6}  {}  (line {})",
                    e.onset,
                    e.kind.as_str(),
                    e.definition,
                    e.line
                );
            }
            render_diagnostics(&source.text, &source.name, &issues);
            print_summary(&issues);
            if ok {
                eprintln!("timeline ok");
            }
        }
    }
    Ok(ok)
}

fn cmd_explain(id: &str, format: Format) -> Result<bool> {
    let text = diag::explain(id);
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "id": id,
                "hedCode": diag::hed_code_for(id),
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            use ariadne::Fmt;
            match (text, diag::hed_code_for(id)) {
                (Some(text), Some(code)) => {
                    println!("{} ({code}): {text}", id.fg(ariadne::Color::Cyan));
                }
                (Some(text), None) => println!("{}: {text}", id.fg(ariadne::Color::Cyan)),
                (None, _) => println!("{id}: (no explanation available)"),
            }
        }
    }
    Ok(true)
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Report diagnostics from an auxiliary file (such as definitions) in the
/// selected format.
fn report(
    format: Format,
    source: &SourceFile,
    diagnostics: &[Diagnostic],
    what: &str,
) -> Result<()> {
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "ok": false,
                "file": source.name,
                "stage": what,
                "diagnostics": diagnostics,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("failed to serialize report")?
            );
        }
        Format::Pretty => {
            render_diagnostics(&source.text, &source.name, diagnostics);
            print_summary(diagnostics);
        }
    }
    Ok(())
}
