//! Input loading: source files, annotation lines, event tables, and schemas.

use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use hed_toolchain_core::{Diagnostic, HedSchema, HedSchemas, Span};

/// A source file held in memory.
pub(crate) struct SourceFile {
    /// Display name (`<stdin>` for `-`).
    pub(crate) name: String,
    /// Full text.
    pub(crate) text: String,
}

impl SourceFile {
    /// Read `path`, or standard input when `path` is `-`.
    pub(crate) fn read(path: &str) -> Result<Self> {
        if path == "-" {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read standard input")?;
            return Ok(Self {
                name: "<stdin>".to_string(),
                text,
            });
        }
        let text = fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))?;
        Ok(Self {
            name: path.to_string(),
            text,
        })
    }

    /// Non-blank lines, each one HED string.
    pub(crate) fn lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        let mut offset = 0;
        for (i, raw) in self.text.split_inclusive('\n').enumerate() {
            let hed = raw.trim_end_matches(['\n', '\r']);
            if !hed.trim().is_empty() {
                lines.push(Line {
                    number: i + 1,
                    offset,
                    hed,
                });
            }
            offset += raw.len();
        }
        lines
    }
}

/// One HED string located in its source file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// 1-based line number.
    pub(crate) number: usize,
    /// Byte offset of the string in the file.
    pub(crate) offset: usize,
    /// The HED string.
    pub(crate) hed: &'a str,
}

impl Line<'_> {
    /// Move string-relative spans to file offsets.
    pub(crate) fn relocate(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        diagnostics
            .iter()
            .cloned()
            .map(|mut d| {
                d.span = d
                    .span
                    .map(|s| Span::new(s.start + self.offset, s.end + self.offset));
                d
            })
            .collect()
    }
}

/// One row of a tab-separated event file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventRow<'a> {
    /// Row onset; `None` for `n/a` or an empty cell.
    pub(crate) onset: Option<f64>,
    /// The row's annotation, located in the file.
    pub(crate) line: Line<'a>,
}

/// Split a tab-separated event file with `onset` and `HED` header columns.
pub(crate) fn event_rows(source: &SourceFile) -> Result<Vec<EventRow<'_>>> {
    let mut rows = source.text.split_inclusive('\n');
    let Some(header) = rows.next() else {
        bail!("'{}' is empty", source.name);
    };
    let columns: Vec<&str> = header.trim_end_matches(['\n', '\r']).split('\t').collect();
    let find = |name: &str| columns.iter().position(|c| c.trim().eq_ignore_ascii_case(name));
    let Some(onset_col) = find("onset") else {
        bail!("'{}' has no onset column", source.name);
    };
    let Some(hed_col) = find("hed") else {
        bail!("'{}' has no HED column", source.name);
    };

    let mut out = Vec::new();
    let mut offset = header.len();
    for (i, raw) in rows.enumerate() {
        let number = i + 2;
        let text = raw.trim_end_matches(['\n', '\r']);
        let row_offset = offset;
        offset += raw.len();
        if text.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = text.split('\t').collect();
        let onset = match cells.get(onset_col).map(|c| c.trim()) {
            None | Some("" | "n/a") => None,
            Some(cell) => Some(
                cell.parse::<f64>()
                    .with_context(|| format!("line {number}: invalid onset '{cell}'"))?,
            ),
        };
        let Some(hed) = cells.get(hed_col).copied() else {
            continue;
        };
        if hed.trim().is_empty() || hed.trim() == "n/a" {
            continue;
        }
        let cell_offset: usize = cells[..hed_col].iter().map(|c| c.len() + 1).sum();
        out.push(EventRow {
            onset,
            line: Line {
                number,
                offset: row_offset + cell_offset,
                hed,
            },
        });
    }
    Ok(out)
}

/// Parse a `--library` argument of the form `prefix=path`.
pub(crate) fn parse_library(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((prefix, path))
            if !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphabetic())
                && !path.is_empty() =>
        {
            Ok((prefix.to_string(), path.to_string()))
        }
        _ => Err(format!("expected <prefix>=<path>, got '{arg}'")),
    }
}

/// Load the base schema and any library schemas.
pub(crate) fn load_schemas(base: &str, libraries: &[(String, String)]) -> Result<HedSchemas> {
    let schema = HedSchema::from_path(base)
        .with_context(|| format!("failed to load schema '{base}'"))?;
    let mut schemas = HedSchemas::with_base(schema);
    for (prefix, path) in libraries {
        let schema = HedSchema::from_path(path)
            .with_context(|| format!("failed to load library schema '{path}'"))?;
        schemas.insert(prefix.as_str(), schema);
    }
    tracing::debug!(schemas = schemas.len(), "loaded schemas");
    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> SourceFile {
        SourceFile {
            name: "test".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn lines_skip_blanks_and_track_offsets() {
        let file = source("Red\n\n  \nBlue, Green\r\n");
        let lines = file.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].number, lines[0].offset, lines[0].hed), (1, 0, "Red"));
        assert_eq!((lines[1].number, lines[1].offset, lines[1].hed), (4, 8, "Blue, Green"));
    }

    #[test]
    fn spans_move_to_file_offsets() {
        let file = source("Red\nBlue, Foo\n");
        let line = file.lines()[1];
        let diag = Diagnostic::error("HED2001", "unknown", Some(Span::new(6, 9)));
        let moved = line.relocate(&[diag]);
        assert_eq!(moved[0].span, Some(Span::new(10, 13)));
    }

    #[test]
    fn event_rows_locate_hed_cells() {
        let file = source("onset\tduration\tHED\n1.5\tn/a\t(Onset, Def/A)\nn/a\t2\tRed\n3\t0\tn/a\n");
        let rows = event_rows(&file).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].onset, Some(1.5));
        assert_eq!(rows[0].line.number, 2);
        assert_eq!(&file.text[rows[0].line.offset..][..14], "(Onset, Def/A)");
        assert_eq!(rows[1].onset, None);
        assert_eq!(rows[1].line.hed, "Red");
    }

    #[test]
    fn event_rows_need_columns() {
        assert!(event_rows(&source("onset\tvalue\n1\tRed\n")).is_err());
        assert!(event_rows(&source("")).is_err());
        assert!(event_rows(&source("onset\tHED\nsoon\tRed\n")).is_err());
    }

    #[test]
    fn library_arguments() {
        assert_eq!(
            parse_library("sc=lib.json"),
            Ok(("sc".to_string(), "lib.json".to_string()))
        );
        assert!(parse_library("sc").is_err());
        assert!(parse_library("s1=lib.json").is_err());
        assert!(parse_library("=lib.json").is_err());
    }
}
