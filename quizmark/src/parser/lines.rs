use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

/// Indentation (in columns) that makes a line belong to the preceding item.
const CONTINUATION_INDENT: usize = 2;

/// The role a single source line can play in a quiz block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    /// Empty, whitespace only, or an HTML comment with content.
    Blank,
    /// Inside a fenced code block, continuation indentation removed.
    Code(&'a str),
    /// Part of a heading outside any list.
    Heading,
    /// `<!--  -->`: an HTML comment with nothing in it.
    Separator,
    /// Inner text of a `{: ... }` attribute list.
    Attributes(&'a str),
    /// A `-` list item. Empty text for a bare dash.
    Item(&'a str),
    /// A continuation line, trimmed.
    Indented(&'a str),
    /// Any other unindented line, trimmed.
    Text(&'a str),
}

#[derive(Debug, Clone)]
pub(crate) struct Line<'a> {
    pub kind: LineKind<'a>,
    /// Byte span of the line, excluding the line terminator.
    pub span: Range<usize>,
}

/// Split `source` into classified lines.
///
/// A pulldown-cmark pass finds fenced code and headings first so that
/// lines inside code samples never act as structural anchors.
pub(crate) fn classify(source: &str) -> Vec<Line<'_>> {
    // Spans stay relative to `source`, BOM included.
    let bom = if source.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };
    let body = &source[bom..];

    let mut raw_lines: Vec<(usize, &str)> = Vec::new();
    let mut offset = bom;
    for raw in body.split_inclusive('\n') {
        let text = raw.trim_end_matches(['\n', '\r']);
        raw_lines.push((offset, text));
        offset += raw.len();
    }

    let starts: Vec<usize> = raw_lines.iter().map(|(start, _)| *start).collect();
    let mut code = vec![false; raw_lines.len()];
    let mut heading = vec![false; raw_lines.len()];
    let mut list_depth = 0usize;

    for (event, range) in CmarkParser::new_ext(body, Options::empty()).into_offset_iter() {
        let range = range.start + bom..range.end + bom;
        match event {
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                mark_lines(&mut code, &starts, &range);
            }
            Event::Start(Tag::Heading { .. }) if list_depth == 0 => {
                mark_lines(&mut heading, &starts, &range);
            }
            _ => {}
        }
    }

    let lines: Vec<Line<'_>> = raw_lines
        .iter()
        .enumerate()
        .map(|(i, (start, text))| {
            let kind = if code[i] {
                LineKind::Code(strip_indent(text, CONTINUATION_INDENT))
            } else if heading[i] {
                LineKind::Heading
            } else {
                classify_line(text)
            };
            Line {
                kind,
                span: *start..*start + text.len(),
            }
        })
        .collect();

    tracing::trace!(
        lines = lines.len(),
        code_lines = code.iter().filter(|c| **c).count(),
        heading_lines = heading.iter().filter(|h| **h).count(),
        "classified source lines"
    );

    lines
}

fn classify_line(text: &str) -> LineKind<'_> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if indent_width(text) >= CONTINUATION_INDENT {
        return LineKind::Indented(trimmed);
    }
    if let Some(inner) = comment_body(trimmed) {
        return if inner.trim().is_empty() {
            LineKind::Separator
        } else {
            LineKind::Blank
        };
    }
    if let Some(inner) = trimmed.strip_prefix("{:").and_then(|s| s.strip_suffix('}')) {
        return LineKind::Attributes(inner.trim());
    }
    if trimmed == "-" {
        return LineKind::Item("");
    }
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("-\t"))
    {
        return LineKind::Item(rest.trim());
    }
    LineKind::Text(trimmed)
}

fn comment_body(trimmed: &str) -> Option<&str> {
    trimmed.strip_prefix("<!--")?.strip_suffix("-->")
}

/// Width of leading whitespace, counting a tab as four columns.
fn indent_width(text: &str) -> usize {
    text.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Remove up to `max` columns of leading spaces (a tab counts as all of them).
fn strip_indent(text: &str, max: usize) -> &str {
    let mut removed = 0;
    let mut byte = 0;
    for c in text.chars() {
        if removed >= max {
            break;
        }
        match c {
            ' ' => removed += 1,
            '\t' => removed = max,
            _ => break,
        }
        byte += c.len_utf8();
    }
    &text[byte..]
}

/// Mark every line that the byte `range` touches.
fn mark_lines(mask: &mut [bool], starts: &[usize], range: &Range<usize>) {
    if starts.is_empty() || range.is_empty() {
        return;
    }
    let first = line_index(starts, range.start);
    let last = line_index(starts, range.end - 1);
    for flag in &mut mask[first..=last] {
        *flag = true;
    }
}

fn line_index(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|s| *s <= offset).saturating_sub(1)
}
