//! Character-level scanner for HED strings.
//!
//! The tokenizer splits a raw string into tag tokens, column splices
//! (`{name}`), and parenthesized groups. It performs no schema lookups; the
//! only context it tracks is the current delimiter state and an optional
//! library prefix (`sc:`). Tokenization stops at the first issue.

use super::diag::{Diagnostic, Span, codes};
use serde::Serialize;

/// A tag token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpec {
    /// Trimmed tag text, without the library prefix.
    pub tag: String,
    /// Library prefix without the colon; empty for the base schema.
    pub library: String,
    /// Bounds of the trimmed token (prefix included) in the source string.
    pub bounds: Span,
}

/// A parenthesized group and the tokens it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSpec {
    /// Child tokens in source order.
    pub children: Vec<SubstringSpec>,
    /// Bounds including both parentheses. The root group spans the whole string.
    pub bounds: Span,
}

/// A column splice token (`{name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpliceSpec {
    /// Trimmed column name.
    pub column_name: String,
    /// Bounds including both braces.
    pub bounds: Span,
}

/// A token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SubstringSpec {
    /// A tag.
    Tag(TagSpec),
    /// A group.
    Group(GroupSpec),
    /// A column splice.
    ColumnSplice(ColumnSpliceSpec),
}

impl SubstringSpec {
    /// Bounds of the token in the source string.
    pub fn bounds(&self) -> Span {
        match self {
            SubstringSpec::Tag(t) => t.bounds,
            SubstringSpec::Group(g) => g.bounds,
            SubstringSpec::ColumnSplice(c) => c.bounds,
        }
    }
}

impl GroupSpec {
    fn open(start: usize) -> Self {
        Self {
            children: Vec::new(),
            bounds: Span::empty(start),
        }
    }
}

/// Result of tokenizing a HED string.
#[derive(Debug, Clone, Serialize)]
pub struct TokenizeResult {
    /// Root group holding the top-level tokens; `None` when tokenization failed.
    pub root: Option<GroupSpec>,
    /// Issues found. At most one: the tokenizer stops at the first.
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenize a raw HED string.
pub fn tokenize(input: &str) -> TokenizeResult {
    let result = Tokenizer::new(input).run();
    tracing::trace!(
        len = input.len(),
        ok = result.root.is_some(),
        "tokenized HED string"
    );
    result
}

// ─── Tokenizer Implementation ──────────────────────────────────────────────

const INVALID_CHARACTERS: [char; 4] = ['[', ']', '~', '"'];

/// Control characters (C0 and C1) and a few reserved ASCII symbols never
/// appear in a valid HED string.
fn is_invalid_character(c: char) -> bool {
    c.is_control() || INVALID_CHARACTERS.contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    OpenGroup,
    CloseGroup,
    OpenColumn,
    CloseColumn,
    Comma,
}

type Step = Result<(), Diagnostic>;

struct Tokenizer<'a> {
    input: &'a str,
    /// Characters of the current tag, minus any library prefix.
    token: String,
    /// Byte offset where the current tag (including its prefix) begins.
    token_start: usize,
    prefix: String,
    last_delimiter: Option<(Delimiter, usize)>,
    last_slash: Option<usize>,
    /// Open groups; index 0 is the root.
    groups: Vec<GroupSpec>,
}

fn fail(id: &'static str, message: impl Into<String>, span: Span) -> Step {
    Err(Diagnostic::error(id, message, Some(span)))
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            token: String::new(),
            token_start: 0,
            prefix: String::new(),
            last_delimiter: None,
            last_slash: None,
            groups: vec![GroupSpec::open(0)],
        }
    }

    fn run(mut self) -> TokenizeResult {
        let outcome = if self.input.trim().is_empty() {
            fail(codes::EMPTY_TAG, "HED string is empty", Span::empty(0))
        } else {
            self.scan().and_then(|()| self.finalize())
        };
        match outcome {
            Ok(()) => {
                let root = self.groups.pop().map(|mut root| {
                    root.bounds = Span::new(0, self.input.len());
                    root
                });
                TokenizeResult {
                    root,
                    diagnostics: Vec::new(),
                }
            }
            Err(diag) => TokenizeResult {
                root: None,
                diagnostics: vec![diag],
            },
        }
    }

    fn scan(&mut self) -> Step {
        let mut chars = self.input.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let next = chars.peek().map(|&(_, n)| n);
            match c {
                ',' => self.comma(i)?,
                '(' => self.open_group(i)?,
                ')' => self.close_group(i)?,
                '{' => self.open_column(i)?,
                '}' => self.close_column(i)?,
                ':' => self.colon(i)?,
                '/' => self.slash(i, next)?,
                c if is_invalid_character(c) => {
                    return Err(Diagnostic::error(
                        codes::INVALID_CHARACTER,
                        format!("invalid character {c:?} at position {i}"),
                        Some(Span::at(i, c)),
                    )
                    .with_context(ctx!("character" => c.to_string())));
                }
                c => self.token.push(c),
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Step {
        let end = self.input.len();
        if let Some((Delimiter::OpenColumn, pos)) = self.last_delimiter {
            return fail(
                codes::UNCLOSED_CURLY_BRACE,
                "column splice is not closed",
                Span::at(pos, '{'),
            );
        }
        if self.groups.len() > 1
            && let Some(open) = self.groups.last()
        {
            return fail(
                codes::UNCLOSED_PARENTHESIS,
                "parenthesis is never closed",
                Span::at(open.bounds.start, '('),
            );
        }
        let pending = !self.pending(end).trim().is_empty();
        match self.last_delimiter {
            Some((Delimiter::Comma, pos)) if !pending => {
                return fail(codes::EXTRA_COMMA, "HED string ends in a comma", Span::at(pos, ','));
            }
            Some((Delimiter::CloseGroup | Delimiter::CloseColumn, _)) if pending => {
                return self.missing_comma(end);
            }
            _ => {}
        }
        if pending {
            self.push_tag(end)?;
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn last_kind(&self) -> Option<Delimiter> {
        self.last_delimiter.map(|(kind, _)| kind)
    }

    fn in_column(&self) -> bool {
        self.last_kind() == Some(Delimiter::OpenColumn)
    }

    /// Raw text between the last delimiter and `i`.
    fn pending(&self, i: usize) -> &'a str {
        let start = self.last_delimiter.map_or(0, |(_, pos)| pos + 1);
        &self.input[start..i]
    }

    /// Bounds of `input[start..end]` with surrounding whitespace removed.
    fn trimmed_span(&self, start: usize, end: usize) -> Span {
        let raw = &self.input[start..end];
        let lead = raw.len() - raw.trim_start().len();
        let trail = raw.len() - raw.trim_end().len();
        if lead == raw.len() {
            return Span::empty(start);
        }
        Span::new(start + lead, end - trail)
    }

    fn reset(&mut self, i: usize) {
        self.token.clear();
        self.prefix.clear();
        self.token_start = i + 1;
        self.last_slash = None;
    }

    fn missing_comma(&self, i: usize) -> Step {
        let start = self.last_delimiter.map_or(0, |(_, pos)| pos + 1);
        let span = self.trimmed_span(start, i);
        Err(Diagnostic::error(
            codes::MISSING_COMMA,
            format!("missing comma before {:?}", &self.input[span.start..span.end]),
            Some(span),
        ))
    }

    fn push_tag(&mut self, i: usize) -> Step {
        let text = self.token.trim();
        if text.is_empty() {
            return fail(codes::EMPTY_TAG, "tag is empty", Span::empty(i));
        }
        let bounds = self.trimmed_span(self.token_start, i);
        if text.ends_with('/') {
            let pos = self.last_slash.unwrap_or(bounds.end.saturating_sub(1));
            return fail(codes::EXTRA_SLASH, "tag ends with a slash", Span::at(pos, '/'));
        }
        check_placeholder(text, bounds)?;
        let spec = TagSpec {
            tag: text.to_string(),
            library: std::mem::take(&mut self.prefix),
            bounds,
        };
        if let Some(group) = self.groups.last_mut() {
            group.children.push(SubstringSpec::Tag(spec));
        }
        self.reset(i);
        Ok(())
    }

    // ── Delimiter handlers ──────────────────────────────────────────────

    fn comma(&mut self, i: usize) -> Step {
        let pending = !self.pending(i).trim().is_empty();
        match self.last_delimiter {
            Some((Delimiter::OpenColumn, pos)) => {
                return fail(
                    codes::UNCLOSED_CURLY_BRACE,
                    "column splice is not closed before comma",
                    Span::at(pos, '{'),
                );
            }
            Some((Delimiter::CloseGroup | Delimiter::CloseColumn, _)) if pending => {
                return self.missing_comma(i);
            }
            None | Some((Delimiter::OpenGroup | Delimiter::Comma, _)) if !pending => {
                return fail(codes::EMPTY_TAG, "empty tag before comma", Span::at(i, ','));
            }
            _ => {}
        }
        if pending {
            self.push_tag(i)?;
        } else {
            self.reset(i);
        }
        self.last_delimiter = Some((Delimiter::Comma, i));
        Ok(())
    }

    fn open_group(&mut self, i: usize) -> Step {
        match self.last_delimiter {
            Some((Delimiter::OpenColumn, pos)) => {
                return fail(
                    codes::UNCLOSED_CURLY_BRACE,
                    "column splice is not closed before parenthesis",
                    Span::at(pos, '{'),
                );
            }
            Some((Delimiter::CloseGroup | Delimiter::CloseColumn, _)) => {
                return fail(
                    codes::MISSING_COMMA,
                    "missing comma before parenthesis",
                    Span::at(i, '('),
                );
            }
            _ => {}
        }
        if !self.pending(i).trim().is_empty() {
            return self.missing_comma(i);
        }
        self.groups.push(GroupSpec::open(i));
        self.reset(i);
        self.last_delimiter = Some((Delimiter::OpenGroup, i));
        Ok(())
    }

    fn close_group(&mut self, i: usize) -> Step {
        if self.groups.len() <= 1 {
            return fail(
                codes::UNOPENED_PARENTHESIS,
                "closing parenthesis has no opening parenthesis",
                Span::at(i, ')'),
            );
        }
        let pending = !self.pending(i).trim().is_empty();
        match self.last_delimiter {
            Some((Delimiter::OpenColumn, pos)) => {
                return fail(
                    codes::UNCLOSED_CURLY_BRACE,
                    "column splice is not closed before parenthesis",
                    Span::at(pos, '{'),
                );
            }
            Some((Delimiter::OpenGroup, pos)) if !pending => {
                return fail(codes::EMPTY_TAG, "group is empty", Span::new(pos, i + 1));
            }
            Some((Delimiter::Comma, pos)) if !pending => {
                return fail(
                    codes::EXTRA_COMMA,
                    "comma directly before closing parenthesis",
                    Span::at(pos, ','),
                );
            }
            Some((Delimiter::CloseGroup | Delimiter::CloseColumn, _)) if pending => {
                return self.missing_comma(i);
            }
            _ => {}
        }
        if pending {
            self.push_tag(i)?;
        }
        let Some(mut group) = self.groups.pop() else {
            return fail(codes::INTERNAL_ERROR, "group stack is empty", Span::at(i, ')'));
        };
        group.bounds = Span::new(group.bounds.start, i + 1);
        if let Some(parent) = self.groups.last_mut() {
            parent.children.push(SubstringSpec::Group(group));
        }
        self.reset(i);
        self.last_delimiter = Some((Delimiter::CloseGroup, i));
        Ok(())
    }

    fn open_column(&mut self, i: usize) -> Step {
        if self.in_column() {
            return fail(
                codes::NESTED_CURLY_BRACE,
                "column splices cannot be nested",
                Span::at(i, '{'),
            );
        }
        if !self.pending(i).trim().is_empty() {
            return Err(Diagnostic::error(
                codes::INVALID_CHARACTER,
                format!("invalid character '{{' inside a tag at position {i}"),
                Some(Span::at(i, '{')),
            )
            .with_context(ctx!("character" => "{")));
        }
        if matches!(
            self.last_kind(),
            Some(Delimiter::CloseGroup | Delimiter::CloseColumn)
        ) {
            return fail(
                codes::MISSING_COMMA,
                "missing comma before column splice",
                Span::at(i, '{'),
            );
        }
        self.reset(i);
        self.last_delimiter = Some((Delimiter::OpenColumn, i));
        Ok(())
    }

    fn close_column(&mut self, i: usize) -> Step {
        let Some((Delimiter::OpenColumn, start)) = self.last_delimiter else {
            return fail(
                codes::UNOPENED_CURLY_BRACE,
                "closing curly brace has no opening curly brace",
                Span::at(i, '}'),
            );
        };
        let name = self.pending(i).trim();
        if name.is_empty() {
            return fail(
                codes::EMPTY_CURLY_BRACE,
                "column splice names no column",
                Span::new(start, i + 1),
            );
        }
        let spec = ColumnSpliceSpec {
            column_name: name.to_string(),
            bounds: Span::new(start, i + 1),
        };
        if let Some(group) = self.groups.last_mut() {
            group.children.push(SubstringSpec::ColumnSplice(spec));
        }
        self.reset(i);
        self.last_delimiter = Some((Delimiter::CloseColumn, i));
        Ok(())
    }

    fn colon(&mut self, i: usize) -> Step {
        let candidate = self.token.trim();
        if self.in_column()
            || !self.prefix.is_empty()
            || candidate.contains(' ')
            || candidate.contains('/')
        {
            self.token.push(':');
            return Ok(());
        }
        if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphabetic()) {
            let span = self.trimmed_span(self.token_start, i);
            return Err(Diagnostic::error(
                codes::INVALID_TAG_PREFIX,
                format!("invalid library prefix {candidate:?}"),
                Some(Span::new(span.start, i + 1)),
            )
            .with_context(ctx!("prefix" => candidate)));
        }
        self.prefix = candidate.to_string();
        self.token.clear();
        Ok(())
    }

    fn slash(&mut self, i: usize, next: Option<char>) -> Step {
        if self.in_column() {
            self.token.push('/');
            return Ok(());
        }
        if self.token.trim().is_empty() {
            return fail(codes::EXTRA_SLASH, "tag begins with a slash", Span::at(i, '/'));
        }
        if self.input[i + 1..].trim_start_matches(' ').starts_with('/') {
            return fail(codes::EXTRA_SLASH, "tag contains a doubled slash", Span::at(i, '/'));
        }
        if self.token.ends_with(' ') {
            return fail(codes::EXTRA_BLANK, "blank before slash", Span::new(i - 1, i));
        }
        if next == Some(' ') {
            return fail(codes::EXTRA_BLANK, "blank after slash", Span::new(i + 1, i + 2));
        }
        self.token.push('/');
        self.last_slash = Some(i);
        Ok(())
    }
}

/// A tag may hold one `#`, directly after a slash, followed only by units.
fn check_placeholder(text: &str, bounds: Span) -> Step {
    let Some(pos) = text.find('#') else {
        return Ok(());
    };
    let (before, after) = (&text[..pos], &text[pos + 1..]);
    let problem = if after.contains('#') {
        "tag contains more than one placeholder"
    } else if !before.ends_with('/') {
        "placeholder must directly follow a slash"
    } else if !after.is_empty() && !after.starts_with(' ') {
        "placeholder may only be followed by a unit"
    } else {
        return Ok(());
    };
    Err(
        Diagnostic::error(codes::INVALID_PLACEHOLDER, problem, Some(bounds))
            .with_context(ctx!("tag" => text)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(root: &GroupSpec) -> Vec<&str> {
        root.children
            .iter()
            .filter_map(|c| match c {
                SubstringSpec::Tag(t) => Some(t.tag.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn invalid_characters() {
        assert!(is_invalid_character('\u{0}'));
        assert!(is_invalid_character('\t'));
        assert!(is_invalid_character('\u{85}'));
        assert!(is_invalid_character('~'));
        assert!(!is_invalid_character('é'));
        assert!(!is_invalid_character(' '));
    }

    #[test]
    fn trims_tags_and_tracks_bounds() {
        let result = tokenize("  Event , Item ");
        let root = result.root.unwrap();
        assert_eq!(tags(&root), vec!["Event", "Item"]);
        assert_eq!(root.children[0].bounds(), Span::new(2, 7));
        assert_eq!(root.children[1].bounds(), Span::new(10, 14));
    }

    #[test]
    fn placeholder_rules() {
        let span = Span::new(0, 1);
        assert!(check_placeholder("Label/#", span).is_ok());
        assert!(check_placeholder("Duration/# s", span).is_ok());
        assert!(check_placeholder("Label/#x", span).is_err());
        assert!(check_placeholder("Label#", span).is_err());
        assert!(check_placeholder("Label/#/#", span).is_err());
    }
}
