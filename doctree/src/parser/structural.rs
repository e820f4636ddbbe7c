use std::ops::Range;

use pulldown_cmark::{
    CodeBlockKind, Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd,
};

use crate::Document;
use crate::annotation::{self, Annotation, AttributeValue, Attributes, Segment};
use crate::node::{Location, Node, NodeKind};
use crate::parser::Parsed;
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse Markdown source text into a document tree. Syntax errors do not
/// stop the parse; they are returned next to the document.
pub fn parse_document(source: &str, file_id: usize) -> Parsed {
    // Heading attribute blocks are handled in `strip_attribute_block`:
    // pulldown would also swallow a trailing `{% tag %}` as one.
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
    let parser = CmarkParser::new_ext(source, options);

    let mut state = ParseState::new(source, file_id);
    for (event, range) in parser.into_offset_iter() {
        state.process_event(event, range);
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    source: &'a str,
    file_id: usize,
    /// Open elements. Innermost = last.
    stack: Vec<Frame>,
    /// Completed top-level nodes.
    nodes: Vec<Node>,
    frontmatter: Option<String>,
    in_metadata: bool,
    errors: Vec<ParseError>,
}

struct Frame {
    kind: NodeKind,
    span: Range<usize>,
    children: Vec<Node>,
}

/// Text after annotation expansion.
enum Piece {
    Node(Node),
    /// A bare `{% #id .class %}` list, applied to the enclosing node.
    Attributes(Attributes),
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str, file_id: usize) -> Self {
        ParseState {
            source,
            file_id,
            stack: Vec::new(),
            nodes: Vec::new(),
            frontmatter: None,
            in_metadata: false,
            errors: Vec::new(),
        }
    }

    fn location(&self, span: Range<usize>) -> Location {
        Location::new(self.file_id, span)
    }

    fn process_event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => {
                self.in_metadata = true;
                self.frontmatter = Some(String::new());
            }
            Event::End(TagEnd::MetadataBlock(_)) => {
                self.in_metadata = false;
            }
            Event::Text(text) if self.in_metadata => {
                if let Some(frontmatter) = self.frontmatter.as_mut() {
                    frontmatter.push_str(&text);
                }
            }
            Event::Start(tag) => {
                let kind = node_kind(tag);
                self.stack.push(Frame {
                    kind,
                    span: range,
                    children: Vec::new(),
                });
            }
            Event::End(_) => self.close_frame(),
            Event::Text(text) => self.push_text(text.into_string(), range),
            Event::Code(code) => {
                let location = self.location(range);
                self.push(Node::leaf(NodeKind::Code(code.into_string()), location));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let location = self.location(range);
                self.push(Node::leaf(NodeKind::Html(html.into_string()), location));
            }
            Event::SoftBreak => {
                let location = self.location(range);
                self.push(Node::leaf(NodeKind::SoftBreak, location));
            }
            Event::HardBreak => {
                let location = self.location(range);
                self.push(Node::leaf(NodeKind::HardBreak, location));
            }
            Event::Rule => {
                let location = self.location(range);
                self.push(Node::leaf(NodeKind::Rule, location));
            }
            _ => {}
        }
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.nodes.push(node),
        }
    }

    /// pulldown-cmark splits text around entities and escapes; adjacent
    /// pieces are merged so annotations are seen whole.
    fn push_text(&mut self, text: String, range: Range<usize>) {
        let file_id = self.file_id;
        let siblings = match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.nodes,
        };
        if let Some(Node {
            kind: NodeKind::Text(previous),
            location,
            ..
        }) = siblings.last_mut()
        {
            previous.push_str(&text);
            location.span.end = range.end;
            return;
        }
        siblings.push(Node::leaf(
            NodeKind::Text(text),
            Location::new(file_id, range),
        ));
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let node = self.finish(frame);
        self.push(node);
    }

    fn finish(&mut self, frame: Frame) -> Node {
        let Frame {
            mut kind,
            span,
            children,
        } = frame;
        let location = self.location(span);
        let mut children = children;

        // Fence bodies are opaque: annotations inside code are not processed.
        if let NodeKind::Fence { content, .. } = &mut kind {
            for child in &children {
                if let NodeKind::Text(text) = &child.kind {
                    content.push_str(text);
                }
            }
            return Node::leaf(kind, location);
        }

        if let NodeKind::Heading { id, .. } = &mut kind {
            if let Some(explicit) = strip_attribute_block(&mut children) {
                *id = Some(explicit);
            }
        }

        let pieces = self.expand_annotations(children);
        let mut children = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                Piece::Node(node) => children.push(node),
                Piece::Attributes(mut attributes) => {
                    if let NodeKind::Heading { id, .. } = &mut kind {
                        if let Some(AttributeValue::String(explicit)) = attributes.remove("id") {
                            if id.is_none() {
                                *id = Some(explicit);
                            }
                        }
                    }
                    if !attributes.is_empty() {
                        tracing::trace!(?attributes, "ignoring annotation attributes");
                    }
                }
            }
        }

        let children = nest_tags(children);

        if matches!(kind, NodeKind::Paragraph) {
            return match block_annotation(children, self.file_id) {
                Ok(tag) => tag,
                Err(children) => Node::new(kind, children, location),
            };
        }

        Node::new(kind, children, location)
    }

    fn expand_annotations(&mut self, children: Vec<Node>) -> Vec<Piece> {
        let mut pieces = Vec::with_capacity(children.len());
        for child in children {
            match child.kind {
                NodeKind::Text(text) if text.contains("{%") => {
                    self.split_text(&text, child.location, &mut pieces);
                }
                kind => pieces.push(Piece::Node(Node { kind, ..child })),
            }
        }
        pieces
    }

    fn split_text(&mut self, text: &str, location: Location, pieces: &mut Vec<Piece>) {
        let source = self.source;
        let haystack = source.get(location.span.clone()).unwrap_or("");
        let mut from = 0;

        for segment in annotation::segments(text) {
            match segment {
                Segment::Text(plain) => {
                    let span = locate(haystack, &location.span, plain, &mut from);
                    pieces.push(Piece::Node(Node::leaf(
                        NodeKind::Text(plain.to_string()),
                        self.location(span),
                    )));
                }
                Segment::Annotation { raw, inner } => {
                    let span = locate(haystack, &location.span, raw, &mut from);
                    match annotation::parse_annotation(inner) {
                        Ok(Annotation::Open(tag)) => pieces.push(Piece::Node(Node::leaf(
                            NodeKind::Tag(tag),
                            self.location(span),
                        ))),
                        Ok(Annotation::Close(name)) => pieces.push(Piece::Node(Node::leaf(
                            NodeKind::TagClose(name),
                            self.location(span),
                        ))),
                        Ok(Annotation::Attributes(attributes)) => {
                            pieces.push(Piece::Attributes(attributes));
                        }
                        Err(message) => {
                            tracing::debug!(%message, ?span, "malformed annotation");
                            let location = self.location(span);
                            self.errors.push(ParseError::malformed(message, location));
                        }
                    }
                }
                Segment::Unterminated(rest) => {
                    let span = locate(haystack, &location.span, rest, &mut from);
                    self.errors
                        .push(ParseError::unterminated(self.location(span.clone())));
                    pieces.push(Piece::Node(Node::leaf(
                        NodeKind::Text(rest.to_string()),
                        self.location(span),
                    )));
                }
            }
        }
    }

    fn finalize(mut self) -> Parsed {
        while !self.stack.is_empty() {
            self.close_frame();
        }

        let nodes = nest_tags(std::mem::take(&mut self.nodes));

        tracing::debug!(
            file_id = self.file_id,
            nodes = nodes.len(),
            errors = self.errors.len(),
            "parsed document"
        );
        Parsed {
            document: Document {
                nodes,
                frontmatter: self.frontmatter,
                source_id: self.file_id,
            },
            errors: self.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Tag nesting
// ---------------------------------------------------------------------------

enum Nesting {
    Open,
    Close(String),
    Keep,
}

/// Pair `{% name %}` openers with `{% /name %}` closers among siblings.
/// Everything between a pair becomes the opener's children; unmatched
/// openers stay childless and unmatched closers stay as `TagClose`.
fn nest_tags(nodes: Vec<Node>) -> Vec<Node> {
    if !nodes
        .iter()
        .any(|node| matches!(node.kind, NodeKind::TagClose(_)))
    {
        return nodes;
    }

    let mut out = Vec::with_capacity(nodes.len());
    let mut open: Vec<(Node, Vec<Node>)> = Vec::new();

    for node in nodes {
        let nesting = match &node.kind {
            NodeKind::Tag(tag) if !tag.self_closing && !tag.closed => Nesting::Open,
            NodeKind::TagClose(name) => Nesting::Close(name.clone()),
            _ => Nesting::Keep,
        };

        match nesting {
            Nesting::Open => open.push((node, Vec::new())),
            Nesting::Keep => push_current(&mut open, &mut out, node),
            Nesting::Close(name) => {
                let matching = open
                    .iter()
                    .rposition(|(opener, _)| opener.tag().is_some_and(|tag| tag.name == name));
                let Some(index) = matching else {
                    push_current(&mut open, &mut out, node);
                    continue;
                };
                while open.len() > index + 1 {
                    flatten_top(&mut open, &mut out);
                }
                if let Some((mut opener, children)) = open.pop() {
                    if let NodeKind::Tag(tag) = &mut opener.kind {
                        tag.closed = true;
                    }
                    opener.location.span.end = node.location.span.end;
                    opener.children = children;
                    push_current(&mut open, &mut out, opener);
                }
            }
        }
    }

    while !open.is_empty() {
        flatten_top(&mut open, &mut out);
    }
    out
}

fn push_current(open: &mut [(Node, Vec<Node>)], out: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some((_, children)) => children.push(node),
        None => out.push(node),
    }
}

/// Give up on the innermost opener: it and its collected nodes become siblings.
fn flatten_top(open: &mut Vec<(Node, Vec<Node>)>, out: &mut Vec<Node>) {
    if let Some((opener, children)) = open.pop() {
        push_current(open, out, opener);
        for child in children {
            push_current(open, out, child);
        }
    }
}

/// A paragraph holding nothing but one annotation is that annotation at
/// block level. A tag whose whole body sat inside the same paragraph gets
/// that body back as a paragraph.
fn block_annotation(mut children: Vec<Node>, file_id: usize) -> Result<Node, Vec<Node>> {
    let significant: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.is_blank())
        .map(|(index, _)| index)
        .collect();
    let index = match significant.as_slice() {
        [index] => *index,
        _ => return Err(children),
    };
    if !matches!(
        children[index].kind,
        NodeKind::Tag(_) | NodeKind::TagClose(_)
    ) {
        return Err(children);
    }

    let mut tag = children.swap_remove(index);
    let inline_body = tag.children.iter().any(|child| !child.is_blank())
        && tag
            .children
            .iter()
            .all(|child| child.kind.is_inline() || matches!(child.kind, NodeKind::Tag(_)));
    if inline_body {
        let body = trim_blank(std::mem::take(&mut tag.children));
        let span = match (body.first(), body.last()) {
            (Some(first), Some(last)) => first.location.span.start..last.location.span.end,
            _ => tag.location.span.clone(),
        };
        tag.children = vec![Node::new(
            NodeKind::Paragraph,
            body,
            Location::new(file_id, span),
        )];
    }
    Ok(tag)
}

fn trim_blank(mut nodes: Vec<Node>) -> Vec<Node> {
    while nodes.last().is_some_and(Node::is_blank) {
        nodes.pop();
    }
    let leading = nodes.iter().take_while(|node| node.is_blank()).count();
    nodes.split_off(leading)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove a trailing `{#id .class}` block from a heading's text and return
/// the id it names. `{% ... %}` is left for annotation expansion.
fn strip_attribute_block(children: &mut Vec<Node>) -> Option<String> {
    let last = children.last_mut()?;
    let NodeKind::Text(text) = &mut last.kind else {
        return None;
    };

    let body = text.trim_end().strip_suffix('}')?;
    let open = body.rfind('{')?;
    let inner = &body[open + 1..];
    if inner.starts_with('%') {
        return None;
    }
    let id = inner
        .split_ascii_whitespace()
        .filter_map(|token| token.strip_prefix('#'))
        .filter(|token| !token.is_empty())
        .last()
        .map(str::to_string);
    let kept = body[..open].trim_end().len();

    let removed = text.len() - kept;
    text.truncate(kept);
    let empty = text.is_empty();
    let span = &mut last.location.span;
    span.end = span.end.saturating_sub(removed).max(span.start);
    if empty {
        children.pop();
    }
    id
}

fn node_kind(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, id, .. } => NodeKind::Heading {
            level: heading_level_to_u8(level),
            id: id.map(|id| id.into_string()),
        },
        Tag::BlockQuote(_) => NodeKind::Blockquote,
        Tag::CodeBlock(kind) => {
            let language = match kind {
                CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                CodeBlockKind::Indented => None,
            };
            NodeKind::Fence {
                language,
                content: String::new(),
            }
        }
        Tag::List(start) => NodeKind::List { start },
        Tag::Item => NodeKind::Item,
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => NodeKind::Link {
            dest: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            dest: dest_url.into_string(),
            title: title.into_string(),
        },
        _ => NodeKind::Other,
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Byte span of `needle` within the source text of a node, searching
/// forward from `from`. Falls back to the whole node span when the text was
/// rewritten by the Markdown parser (entities, escapes).
fn locate(haystack: &str, base: &Range<usize>, needle: &str, from: &mut usize) -> Range<usize> {
    match haystack.get(*from..).and_then(|rest| rest.find(needle)) {
        Some(offset) => {
            let start = base.start + *from + offset;
            *from += offset + needle.len();
            start..start + needle.len()
        }
        None => base.clone(),
    }
}
