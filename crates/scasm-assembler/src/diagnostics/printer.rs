//! Rendering of collected diagnostics.
//!
//! Without a listing source only byte ranges are known, so each diagnostic is
//! printed on one line via its `Display`. With the source there are two
//! layouts: annotated snippets (the default) and a compact one line per
//! diagnostic form in the `file:line:col: severity: message` style of
//! assembler toolchains, with one `note:` line per related span.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use rowan::TextRange;

use super::Diagnostics;
use super::message::Severity;

pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    source: Option<&'s str>,
    path: Option<&'s str>,
    colored: bool,
    compact: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            path: None,
            colored: false,
            compact: false,
        }
    }

    /// Listing the diagnostic ranges point into.
    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    /// ANSI colors in snippet output.
    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    /// One line per diagnostic and related note instead of snippets.
    pub fn compact(mut self, value: bool) -> Self {
        self.compact = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.format(&mut out);
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        match self.source {
            None => self.format_ranges(w),
            Some(source) if self.compact => self.format_compact(w, &LineIndex::new(source)),
            Some(source) => self.format_snippets(w, source),
        }
    }

    fn format_ranges(&self, w: &mut impl Write) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{diag}")?;
        }
        Ok(())
    }

    fn format_compact(&self, w: &mut impl Write, lines: &LineIndex<'_>) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            self.locate(w, lines, diag.range)?;
            write!(w, "{}: {}", diag.severity(), diag.message)?;
            for related in &diag.related {
                w.write_char('\n')?;
                self.locate(w, lines, related.range)?;
                write!(w, "note: {}", related.message)?;
            }
        }
        Ok(())
    }

    fn locate(&self, w: &mut impl Write, lines: &LineIndex<'_>, range: TextRange) -> std::fmt::Result {
        if let Some(path) = self.path {
            write!(w, "{path}:")?;
        }
        let (line, column) = lines.position(range.start().into());
        write!(w, "{line}:{column}: ")
    }

    fn format_snippets(&self, w: &mut impl Write, source: &str) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(byte_span(diag.range, source.len()))
                    .label(&diag.message),
            );
            if let Some(path) = self.path {
                snippet = snippet.path(path);
            }
            for related in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(byte_span(related.range, source.len()))
                        .label(&related.message),
                );
            }
            let report: Vec<Group> =
                vec![level(diag.severity()).primary_title(&diag.message).element(snippet)];
            write!(w, "{}", renderer.render(&report))?;
        }
        Ok(())
    }
}

fn level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

/// Byte span to underline; an empty range still marks one character.
fn byte_span(range: TextRange, limit: usize) -> std::ops::Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    if start == end {
        start..(start + 1).min(limit)
    } else {
        start..end
    }
}

/// Maps byte offsets in a listing to 1-based line and column.
pub(crate) struct LineIndex<'s> {
    source: &'s str,
    /// Byte offset where each line begins.
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { source, starts }
    }

    /// Line and column of `offset`; columns count characters.
    pub(crate) fn position(&self, offset: usize) -> (usize, usize) {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let column = self.source[self.starts[line]..offset].chars().count();
        (line + 1, column + 1)
    }
}
