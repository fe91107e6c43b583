//! Markdown formatter for agent replies.
//!
//! Agent text is tokenized with pulldown-cmark and the event stream is cut
//! down to a small subset before anything is emitted: fenced code, inline
//! code, bold, italic, level 2/3 headings, block quotes, lists and
//! paragraphs. Raw HTML becomes escaped text and links/images keep only
//! their text, so nothing the backend sends can inject markup. Code spans
//! are single tokens, so `*` inside code never turns into emphasis.
//!
//! [`format`] renders HTML; [`blocks`] exposes the same token stream as a
//! small block tree for the terminal renderer.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

/// Format agent text as an HTML fragment.
pub fn format(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, sanitized_events(text));
    out
}

/// Escape text for inclusion in HTML (used for human turns, which never go
/// through the formatter).
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn clamp_heading(level: HeadingLevel) -> HeadingLevel {
    match level {
        HeadingLevel::H1 | HeadingLevel::H2 => HeadingLevel::H2,
        _ => HeadingLevel::H3,
    }
}

fn sanitized_events(text: &str) -> impl Iterator<Item = Event<'_>> {
    Parser::new_ext(text, Options::empty()).filter_map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::HtmlBlock) => Some(Event::Start(Tag::Paragraph)),
        Event::End(TagEnd::HtmlBlock) => Some(Event::End(TagEnd::Paragraph)),
        Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) => Some(Event::Start(Tag::Heading {
            level: clamp_heading(level),
            id,
            classes,
            attrs,
        })),
        Event::End(TagEnd::Heading(level)) => Some(Event::End(TagEnd::Heading(clamp_heading(level)))),
        Event::Start(Tag::Link { .. })
        | Event::End(TagEnd::Link)
        | Event::Start(Tag::Image { .. })
        | Event::End(TagEnd::Image) => None,
        Event::SoftBreak => Some(Event::HardBreak),
        Event::Rule => None,
        other => Some(other),
    })
}

/// Inline emphasis flags for a run of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub style: InlineStyle,
}

/// One visual line of inline spans.
pub type MdLine = Vec<InlineSpan>;

/// Block-level token produced by [`blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdBlock {
    /// Heading, level already clamped to 2 or 3
    Heading { level: u8, lines: Vec<MdLine> },
    Paragraph { lines: Vec<MdLine>, quote_depth: usize },
    /// List item; `marker` is `•` or `N.`, `depth` counts enclosing lists
    ListItem {
        marker: String,
        depth: usize,
        lines: Vec<MdLine>,
        quote_depth: usize,
    },
    Code { language: Option<String>, text: String },
}

#[derive(Debug)]
enum OpenBlock {
    Heading(u8),
    Paragraph,
    ListItem { marker: String, depth: usize },
}

#[derive(Debug, Default)]
struct BlockBuilder {
    out: Vec<MdBlock>,
    open: Option<(OpenBlock, Vec<MdLine>)>,
    style: InlineStyle,
    quote_depth: usize,
    lists: Vec<Option<u64>>,
    code: Option<(Option<String>, String)>,
}

impl BlockBuilder {
    fn flush(&mut self) {
        let Some((kind, mut lines)) = self.open.take() else {
            return;
        };
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        if lines.is_empty() {
            return;
        }
        let block = match kind {
            OpenBlock::Heading(level) => MdBlock::Heading { level, lines },
            OpenBlock::Paragraph => MdBlock::Paragraph {
                lines,
                quote_depth: self.quote_depth,
            },
            OpenBlock::ListItem { marker, depth } => MdBlock::ListItem {
                marker,
                depth,
                lines,
                quote_depth: self.quote_depth,
            },
        };
        self.out.push(block);
    }

    fn push_text(&mut self, text: &str, style: InlineStyle) {
        let (_, lines) = self
            .open
            .get_or_insert_with(|| (OpenBlock::Paragraph, vec![Vec::new()]));
        if lines.is_empty() {
            lines.push(Vec::new());
        }
        if let Some(line) = lines.last_mut() {
            match line.last_mut() {
                Some(last) if last.style == style => last.text.push_str(text),
                _ => line.push(InlineSpan {
                    text: text.to_string(),
                    style,
                }),
            }
        }
    }

    fn line_break(&mut self) {
        if let Some((_, lines)) = self.open.as_mut() {
            lines.push(Vec::new());
        }
    }

    fn start(&mut self, kind: OpenBlock) {
        self.flush();
        self.open = Some((kind, vec![Vec::new()]));
    }

    fn next_marker(&mut self) -> String {
        match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{}.", n);
                *n += 1;
                marker
            }
            _ => "•".to_string(),
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Text(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_text(&text, self.style);
                }
            }
            Event::Code(text) => {
                let style = InlineStyle {
                    code: true,
                    ..self.style
                };
                self.push_text(&text, style);
            }
            Event::SoftBreak | Event::HardBreak => self.line_break(),
            Event::Start(Tag::Paragraph) => {
                // Loose list items wrap their text in paragraphs; keep it in the item.
                let item_has_text = match &self.open {
                    Some((OpenBlock::ListItem { .. }, lines)) => {
                        Some(lines.last().is_some_and(|l| !l.is_empty()))
                    }
                    _ => None,
                };
                match item_has_text {
                    Some(true) => self.line_break(),
                    Some(false) => {}
                    None => self.start(OpenBlock::Paragraph),
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if matches!(self.open, Some((OpenBlock::Paragraph, _))) {
                    self.flush();
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                let level = if level == HeadingLevel::H2 { 2 } else { 3 };
                self.start(OpenBlock::Heading(level));
            }
            Event::End(TagEnd::Heading(_)) => self.flush(),
            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, mut text)) = self.code.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.out.push(MdBlock::Code { language, text });
                }
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
            }
            Event::Start(Tag::Item) => {
                let marker = self.next_marker();
                let depth = self.lists.len().saturating_sub(1);
                self.start(OpenBlock::ListItem { marker, depth });
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::Strong) => self.style.strong = true,
            Event::End(TagEnd::Strong) => self.style.strong = false,
            Event::Start(Tag::Emphasis) => self.style.emphasis = true,
            Event::End(TagEnd::Emphasis) => self.style.emphasis = false,
            // Only block quotes remain among container tags once the stream
            // has been sanitized.
            Event::Start(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Event::End(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            _ => {}
        }
    }
}

/// Tokenize agent text into the block tree the terminal renderer draws.
pub fn blocks(text: &str) -> Vec<MdBlock> {
    let mut builder = BlockBuilder::default();
    for event in sanitized_events(text) {
        builder.handle(event);
    }
    builder.flush();
    builder.out
}

/// Plain text of a line, ignoring styles.
pub fn line_text(line: &MdLine) -> String {
    line.iter().map(|span| span.text.as_str()).collect()
}
