//! Minimal listing reader used by the tests.
//!
//! One line per statement: `[label:] [MNEMONIC|.directive] [operand, ...]`,
//! `;` starts a comment. Operands are integers (decimal or `0x` hex), floats,
//! `"strings"`, `value:label` switch cases or label names.

use rowan::{TextRange, TextSize};

use crate::syntax::{Ident, Line, LineKind, Operand, OperandKind};

pub fn parse(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in source.split_inclusive('\n') {
        let text = raw.trim_end_matches(['\n', '\r']);
        if let Some(line) = parse_line(text, start) {
            lines.push(line);
        }
        start += raw.len();
    }
    lines
}

pub fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn word_len(s: &str) -> usize {
    s.find(char::is_whitespace).unwrap_or(s.len())
}

/// Byte indices of `needle` in `text` outside double quotes.
fn unquoted(text: &str, needle: char) -> Vec<usize> {
    let mut quoted = false;
    let mut found = Vec::new();
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => found.push(i),
            _ => {}
        }
    }
    found
}

fn parse_line(text: &str, base: usize) -> Option<Line> {
    let code = match unquoted(text, ';').first() {
        Some(&end) => &text[..end],
        None => text,
    }
    .trim_end();
    if code.trim().is_empty() {
        return None;
    }

    let mut pos = base + leading_ws(code);
    let mut rest = code.trim_start();
    let line_range = range(pos, base + code.len());

    let mut label = None;
    let len = word_len(rest);
    if let Some(name) = rest[..len].strip_suffix(':') {
        label = Some(Ident::new(name, range(pos, pos + name.len())));
        let skip = len + leading_ws(&rest[len..]);
        pos += skip;
        rest = &rest[skip..];
    }
    if rest.is_empty() {
        return Some(Line::new(label, LineKind::Empty, line_range));
    }

    let len = word_len(rest);
    let word = &rest[..len];
    let operands = parse_operands(&rest[len..], pos + len);
    let kind = match word.strip_prefix('.') {
        Some(name) => LineKind::Directive {
            name: Ident::new(name, range(pos + 1, pos + len)),
            operands,
        },
        None => LineKind::Instruction {
            mnemonic: Ident::new(word, range(pos, pos + len)),
            operands,
        },
    };
    Some(Line::new(label, kind, line_range))
}

fn parse_operands(text: &str, base: usize) -> Vec<Operand> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut operands = Vec::new();
    let mut start = 0;
    let mut ends = unquoted(text, ',');
    ends.push(text.len());
    for end in ends {
        let piece = &text[start..end];
        let from = base + start + leading_ws(piece);
        let piece = piece.trim();
        operands.push(Operand::new(
            parse_operand(piece),
            range(from, from + piece.len()),
        ));
        start = end + 1;
    }
    operands
}

fn parse_operand(text: &str) -> OperandKind {
    if let Some(s) = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return OperandKind::String(s.to_owned());
    }
    if let Some((value, target)) = text.split_once(':') {
        return OperandKind::SwitchCase {
            value: parse_int(value.trim()).unwrap_or_default(),
            target: target.trim().to_owned(),
        };
    }
    if let Some(value) = parse_int(text) {
        return OperandKind::Integer(value);
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '-')
        && let Ok(value) = text.parse::<f32>()
    {
        return OperandKind::Float(value);
    }
    OperandKind::Identifier(text.to_owned())
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}
