use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Range;

use crate::block::{QuizBlock, QuizKind, QuizOption};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lines::{self, Line, LineKind};
use crate::parser::metadata::{self, AttributeList};
use crate::parser::line_of;

/// Attribute keys that map onto `QuizBlock` fields rather than `attributes`.
const RESERVED_KEYS: [&str; 3] = ["title", "points", "answer"];

// ---------------------------------------------------------------------------
// Block iterator
// ---------------------------------------------------------------------------

/// Lazy iterator over the quiz blocks of a document, in document order.
///
/// Each item is either a complete block or one defect. Blocks with a
/// defect are not yielded. Created by [`Parser::blocks`]; calling that
/// again (or cloning) restarts the scan.
///
/// [`Parser::blocks`]: crate::parser::Parser::blocks
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    source: &'a str,
    file_id: usize,
    lines: Vec<Line<'a>>,
    next_line: usize,
    finished: bool,
    fragment: Option<Fragment>,
    /// Span of the metadata line that first claimed each id.
    seen: HashMap<String, Range<usize>>,
    pending: VecDeque<Result<QuizBlock, ParseError>>,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(source: &'a str, file_id: usize) -> Self {
        Blocks {
            source,
            file_id,
            lines: lines::classify(source),
            next_line: 0,
            finished: false,
            fragment: None,
            seen: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    fn process_line(&mut self, kind: LineKind<'a>, span: Range<usize>) {
        match kind {
            LineKind::Blank => {}

            LineKind::Heading => self.close_fragment(),

            LineKind::Separator => {
                self.close_fragment();
                self.fragment = Some(Fragment::new(true, span));
            }

            LineKind::Attributes(text) => self.handle_attributes(text, span),

            LineKind::Item(text) => {
                let fragment = self
                    .fragment
                    .get_or_insert_with(|| Fragment::new(false, span.clone()));
                fragment.push_item(text);
                fragment.end = span.end;
            }

            LineKind::Indented(text) | LineKind::Code(text) => {
                if let Some(fragment) = self.fragment.as_mut() {
                    fragment.push_continuation(text);
                    fragment.end = span.end;
                }
            }

            LineKind::Text(text) => match self.fragment.as_mut() {
                // Prompt paragraph, or a lazy continuation of the last option.
                Some(fragment) if fragment.anchored() => {
                    fragment.push_continuation(text);
                    fragment.end = span.end;
                }
                // Narrative text after a list nobody anchored: it was not a quiz.
                Some(_) => self.fragment = None,
                None => {}
            },
        }
    }

    fn handle_attributes(&mut self, text: &str, span: Range<usize>) {
        let list = match metadata::parse_attribute_list(text) {
            Ok(list) => list,
            Err(reason) => {
                if metadata::mentions_quiz_kind(text) {
                    self.fragment = None;
                    self.report(ParseErrorKind::MalformedMetadata { reason }, span);
                } else {
                    self.ignore_attributes();
                }
                return;
            }
        };

        let kind = match list.quiz_kinds().as_slice() {
            [] => {
                self.ignore_attributes();
                return;
            }
            [kind] => *kind,
            [first, second, ..] => {
                let reason = format!("conflicting quiz kinds `.{}` and `.{}`", first, second);
                self.fragment = None;
                self.report(ParseErrorKind::MalformedMetadata { reason }, span);
                return;
            }
        };

        let fragment = self
            .fragment
            .take()
            .unwrap_or_else(|| Fragment::new(false, span.clone()));
        self.finish_block(kind, &list, fragment, span);
    }

    /// A non-quiz attribute list: content inside an anchored fragment, a
    /// boundary for a plain list.
    fn ignore_attributes(&mut self) {
        if self.fragment.as_ref().is_some_and(|f| !f.anchored()) {
            self.fragment = None;
        }
    }

    fn finish_block(
        &mut self,
        kind: QuizKind,
        list: &AttributeList,
        fragment: Fragment,
        meta_span: Range<usize>,
    ) {
        let (Some(id), Some(title), Some(points), Some(answer)) = (
            list.id.as_deref(),
            list.get("title"),
            list.get("points"),
            list.get("answer"),
        ) else {
            let present = [
                ("id", list.id.is_some()),
                ("title", list.get("title").is_some()),
                ("points", list.get("points").is_some()),
                ("answer", list.get("answer").is_some()),
            ];
            for (attribute, is_present) in present {
                if !is_present {
                    self.report(
                        ParseErrorKind::MissingAttribute { attribute },
                        meta_span.clone(),
                    );
                }
            }
            return;
        };

        if let Some(first) = self.seen.get(id) {
            let note = format!(
                "`{}` is first defined on line {}",
                id,
                line_of(self.source, first.start)
            );
            let error = ParseError::error(
                ParseErrorKind::DuplicateId { id: id.to_string() },
                meta_span,
                self.file_id,
            )
            .with_note(note);
            self.pending.push_back(Err(error));
            return;
        }
        self.seen.insert(id.to_string(), meta_span.clone());

        let attributes: BTreeMap<String, String> = list
            .pairs
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();

        let classes: Vec<String> = list
            .classes
            .iter()
            .filter(|class| class.parse::<QuizKind>().is_err())
            .cloned()
            .collect();

        let span = fragment.start..meta_span.end;
        let (prompt, options) = fragment.into_parts(kind);
        let block = QuizBlock {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            points: points.to_string(),
            answer: answer.to_string(),
            prompt,
            options,
            classes,
            attributes,
            span,
        };

        if kind == QuizKind::ChooseBest && block.correct_index().is_none() {
            self.report(
                ParseErrorKind::AnswerOutOfRange {
                    id: block.id,
                    answer: block.answer,
                    option_count: block.options.len(),
                },
                meta_span,
            );
            return;
        }

        tracing::debug!(
            id = %block.id,
            kind = %block.kind,
            options = block.options.len(),
            "parsed quiz block"
        );
        self.pending.push_back(Ok(block));
    }

    /// End the current fragment at a heading, separator or end of input.
    fn close_fragment(&mut self) {
        let Some(fragment) = self.fragment.take() else {
            return;
        };
        if fragment.anchored() && fragment.has_items() {
            tracing::debug!(
                line = line_of(self.source, fragment.start),
                "quiz fragment without metadata"
            );
            let error = ParseError::error(
                ParseErrorKind::MissingMetadata,
                fragment.start..fragment.end,
                self.file_id,
            )
            .with_note("a quiz block ends with a `{: .choose_best ... }` or `{: .free_text_number ... }` line");
            self.pending.push_back(Err(error));
        }
    }

    fn report(&mut self, kind: ParseErrorKind, span: Range<usize>) {
        self.pending
            .push_back(Err(ParseError::error(kind, span, self.file_id)));
    }
}

impl Iterator for Blocks<'_> {
    type Item = Result<QuizBlock, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.next_line < self.lines.len() {
                let kind = self.lines[self.next_line].kind;
                let span = self.lines[self.next_line].span.clone();
                self.next_line += 1;
                self.process_line(kind, span);
            } else if !self.finished {
                self.finished = true;
                self.close_fragment();
            } else {
                return None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fragment: the block under construction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Fragment {
    /// Opened by a separator comment rather than by a bare list.
    armed: bool,
    start: usize,
    end: usize,
    prompt: Vec<String>,
    has_bare_prompt: bool,
    options: Vec<OptionBuilder>,
}

#[derive(Debug, Clone)]
struct OptionBuilder {
    text: String,
    feedback: Vec<String>,
}

impl Fragment {
    fn new(armed: bool, span: Range<usize>) -> Self {
        Fragment {
            armed,
            start: span.start,
            end: span.end,
            prompt: Vec::new(),
            has_bare_prompt: false,
            options: Vec::new(),
        }
    }

    /// Opened by a separator, or by a bare `-` prompt line. Narrative lists
    /// have neither.
    fn anchored(&self) -> bool {
        self.armed || self.has_bare_prompt
    }

    fn has_items(&self) -> bool {
        self.has_bare_prompt || !self.options.is_empty()
    }

    fn push_item(&mut self, text: &str) {
        if text.is_empty() && !self.has_bare_prompt && self.options.is_empty() {
            self.has_bare_prompt = true;
        } else {
            self.options.push(OptionBuilder {
                text: text.to_string(),
                feedback: Vec::new(),
            });
        }
    }

    fn push_continuation(&mut self, text: &str) {
        match self.options.last_mut() {
            Some(option) => option.feedback.push(text.to_string()),
            None => self.prompt.push(text.to_string()),
        }
    }

    fn into_parts(self, kind: QuizKind) -> (String, Vec<QuizOption>) {
        let mut prompt = self.prompt;
        let mut options: Vec<QuizOption> = self
            .options
            .into_iter()
            .map(|o| QuizOption::new(o.text, o.feedback.join("\n")))
            .collect();

        // `- How long did this take?` is the prompt of a free-text block.
        if kind == QuizKind::FreeTextNumber
            && !self.has_bare_prompt
            && prompt.is_empty()
            && options.len() == 1
        {
            let only = options.remove(0);
            prompt.push(only.text);
            if !only.feedback.is_empty() {
                prompt.push(only.feedback);
            }
        }

        (prompt.join("\n"), options)
    }
}
