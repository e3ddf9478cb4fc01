//! Reference adapter for Markdown documentation dumps.
//!
//! The expected dump layout is one `##` heading per documented entity:
//!
//! ````markdown
//! ## function numpy.array
//! Aliases: np.array
//! Tags: array, create
//!
//! Create an array.
//!
//! Longer description paragraphs become the body.
//!
//! ```signature
//! numpy.array(object, dtype=None)
//! ```
//!
//! ```python
//! >>> np.array([1, 2])
//! ```
//! ````
//!
//! The first word of the heading names the record kind (`function`,
//! `class`, `module`, `guide`, `example`), the second the identifier. The
//! first plain paragraph is the summary, later paragraphs the body. A
//! fenced block tagged `signature` sets the signature; any other fenced
//! block becomes an example whose description is the paragraph directly
//! before it. `Tags:`/`Aliases:` lines carry comma-separated values.
//!
//! Prose before the first `##` heading is the library preamble and is
//! deliberately not turned into a record. Headings that do not follow the
//! `<kind> <id>` shape produce a [`ParseWarning`] and their section is
//! skipped until the next `##` heading.

use super::{ParseOutcome, ParseWarning, ParserAdapter};
use crate::record::{DocRecord, ExampleSnippet, RecordKind, SourceRef};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

/// Parses Markdown documentation dumps into normalized records.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    document: String,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self {
            document: "markdown".to_string(),
        }
    }
}

impl MarkdownParser {
    /// Adapter whose emitted [`SourceRef`]s name the given raw document.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

/// 1-based line number of a byte offset in the raw source.
fn line_of(raw: &str, offset: usize) -> usize {
    raw[..offset.min(raw.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}

fn parse_kind(word: &str) -> Option<RecordKind> {
    match word.to_ascii_lowercase().as_str() {
        "function" => Some(RecordKind::Function),
        "class" => Some(RecordKind::Class),
        "module" => Some(RecordKind::Module),
        "guide" => Some(RecordKind::Guide),
        "example" => Some(RecordKind::Example),
        _ => None,
    }
}

fn split_csv(rest: &str) -> impl Iterator<Item = String> + '_ {
    rest.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Default)]
struct DumpState {
    current: Option<DocRecord>,
    heading: Option<(HeadingLevel, String, usize)>,
    paragraph: String,
    in_paragraph: bool,
    /// Most recent plain paragraph, pending as an example description.
    last_paragraph: Option<String>,
    code: String,
    code_fence: Option<String>,
}

impl DumpState {
    fn finish_record(&mut self, out: &mut ParseOutcome) {
        if let Some(record) = self.current.take() {
            out.records.push(record);
        }
        self.last_paragraph = None;
    }

    fn route_paragraph(&mut self) {
        self.in_paragraph = false;
        let text = std::mem::take(&mut self.paragraph);
        let Some(record) = self.current.as_mut() else {
            // Preamble prose before the first entity heading.
            return;
        };

        // Metadata lines may share a paragraph with each other or with prose.
        let mut prose: Vec<&str> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("Tags:") {
                record.tags.extend(split_csv(rest));
            } else if let Some(rest) = line.strip_prefix("Aliases:") {
                record.aliases.extend(split_csv(rest));
            } else {
                prose.push(line);
            }
        }
        if prose.is_empty() {
            return;
        }

        let text = prose.join(" ");
        if record.summary.is_empty() {
            record.summary = text.clone();
        } else {
            if !record.body.is_empty() {
                record.body.push_str("\n\n");
            }
            record.body.push_str(&text);
        }
        self.last_paragraph = Some(text);
    }

    fn route_code_block(&mut self) {
        let code = std::mem::take(&mut self.code);
        let fence = self.code_fence.take().unwrap_or_default();
        let Some(record) = self.current.as_mut() else {
            return;
        };
        if fence == "signature" {
            record.signature = Some(code.trim().to_string());
        } else {
            record.examples.push(ExampleSnippet {
                code: code.trim_end().to_string(),
                description: self.last_paragraph.clone().unwrap_or_default(),
            });
        }
    }
}

impl ParserAdapter for MarkdownParser {
    fn parse(&self, raw: &str) -> ParseOutcome {
        let mut out = ParseOutcome::default();
        let mut state = DumpState::default();

        for (event, range) in Parser::new(raw).into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    if state.in_paragraph {
                        state.route_paragraph();
                    }
                    if level == HeadingLevel::H2 {
                        state.finish_record(&mut out);
                    }
                    state.heading = Some((level, String::new(), line_of(raw, range.start)));
                }
                Event::End(TagEnd::Heading(_)) => {
                    let Some((level, text, line)) = state.heading.take() else {
                        continue;
                    };
                    if level == HeadingLevel::H2 {
                        self.open_record(&mut state, &mut out, text.trim(), line);
                    } else if let Some(record) = state.current.as_mut() {
                        // Sub-section headings become plain body text.
                        if !record.body.is_empty() {
                            record.body.push_str("\n\n");
                        }
                        record.body.push_str(text.trim());
                    }
                }
                Event::Start(Tag::Paragraph) => {
                    state.in_paragraph = true;
                }
                Event::End(TagEnd::Paragraph) => {
                    state.route_paragraph();
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    state.code_fence = Some(match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().unwrap_or_default().to_string()
                        }
                        CodeBlockKind::Indented => String::new(),
                    });
                }
                Event::End(TagEnd::CodeBlock) => {
                    state.route_code_block();
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, buffer, _)) = state.heading.as_mut() {
                        buffer.push_str(&text);
                    } else if state.code_fence.is_some() {
                        state.code.push_str(&text);
                    } else if state.in_paragraph {
                        state.paragraph.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if state.in_paragraph {
                        state.paragraph.push('\n');
                    }
                }
                _ => {}
            }
        }

        if state.in_paragraph {
            state.route_paragraph();
        }
        state.finish_record(&mut out);
        out
    }
}

impl MarkdownParser {
    fn open_record(&self, state: &mut DumpState, out: &mut ParseOutcome, heading: &str, line: usize) {
        let mut words = heading.split_whitespace();
        let Some(first) = words.next() else {
            out.warnings.push(ParseWarning::new("empty section heading", Some(line)));
            return;
        };
        let Some(kind) = parse_kind(first) else {
            out.warnings.push(ParseWarning::new(
                format!("unknown record kind '{first}'"),
                Some(line),
            ));
            return;
        };
        let Some(id) = words.next() else {
            out.warnings.push(ParseWarning::new(
                format!("missing identifier after '{first}'"),
                Some(line),
            ));
            return;
        };
        if words.next().is_some() {
            out.warnings.push(ParseWarning::new(
                format!("identifier '{id}' is followed by extra heading text"),
                Some(line),
            ));
            return;
        }

        let mut record = DocRecord::new(id, kind);
        record.source_ref = Some(SourceRef {
            document: self.document.clone(),
            line: Some(line),
        });
        state.current = Some(record);
    }
}
