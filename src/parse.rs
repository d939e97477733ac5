//! Parse Module
//!
//! Turns Handlebars template text into a [`SyntaxTree`]. Only the structure the
//! resolver walks is modelled: block wrappers, mustache names, params and
//! dotted paths. Everything between mustaches is kept as opaque content.
//!
//! Templates in an editor are usually half-typed, so the parser always
//! produces a tree. Defects are recorded as errors next to it: a block left
//! open runs to end of input, an unterminated mustache runs to end of input,
//! an empty mustache has no name, and a stray close is kept as content.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{
    line_column, ResolveError, ERR_EMPTY_MUSTACHE, ERR_MISMATCHED_CLOSE, ERR_UNCLOSED_BLOCK,
    ERR_UNEXPECTED_CLOSE, ERR_UNTERMINATED_MUSTACHE,
};
use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree};

lazy_static! {
    /// One expression inside a mustache: optional `key=` then a quoted string,
    /// a parenthesised sub-expression or a bare run of non-space characters.
    static ref EXPRESSION_RE: Regex =
        Regex::new(r#"([A-Za-z_][\w-]*=)?("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\([^)]*\)|[^\s()=]+)"#)
            .unwrap();

    /// Values that never name a path.
    static ref LITERAL_RE: Regex =
        Regex::new(r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|-?\d+(?:\.\d+)?|true|false|null|undefined|\(.*\))$"#)
            .unwrap();

    /// Path segments and separators: `..`, `.`, `/` or a segment.
    static ref SEGMENT_RE: Regex = Regex::new(r"\.\.|[./]|[^./]+").unwrap();

    /// `as |item index|` block params; not modelled as paths.
    static ref BLOCK_PARAMS_RE: Regex = Regex::new(r"\bas\s+\|[^|]*\|").unwrap();

    /// `else` and chained `else if cond` heads.
    static ref ELSE_RE: Regex = Regex::new(r"^\s*else(?:\s|$)").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUSTACHE CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MustacheKind {
    Simple,
    Block,
    Inverse,
    Close,
    Comment,
    Partial,
}

struct OpenBlock {
    wrapper: NodeId,
    statements: NodeId,
    name: String,
    offset: usize,
}

/// Byte layout of one `{{ ... }}` occurrence.
struct MustacheSpan {
    start: usize,
    body_start: usize,
    body_end: usize,
    close_start: usize,
    end: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a recovering parse.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Best-effort tree, always present.
    pub tree: SyntaxTree,
    /// Defects repaired while building the tree, in the order found.
    pub errors: Vec<ResolveError>,
}

/// Parse a Handlebars template, rejecting it on the first defect.
pub fn parse_template(source: &str) -> Result<SyntaxTree, ResolveError> {
    let result = parse_template_recovering(source);
    match result.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(result.tree),
    }
}

/// Parse a Handlebars template, repairing defects instead of failing.
pub fn parse_template_recovering(source: &str) -> ParseResult {
    let mut parser = TemplateParser::new(source);
    parser.run();
    let result = parser.finish();
    tracing::debug!(
        nodes = result.tree.len(),
        bytes = source.len(),
        errors = result.errors.len(),
        "parsed template"
    );
    result
}

struct TemplateParser<'s> {
    source: &'s str,
    tree: SyntaxTree,
    blocks: Vec<OpenBlock>,
    errors: Vec<ResolveError>,
    cursor: usize,
}

impl<'s> TemplateParser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            tree: SyntaxTree::new(source),
            blocks: Vec::new(),
            errors: Vec::new(),
            cursor: 0,
        }
    }

    fn container(&self) -> NodeId {
        self.blocks
            .last()
            .map(|block| block.statements)
            .unwrap_or_else(|| self.tree.root())
    }

    fn report(&mut self, code: &str, message: &str, offset: usize, hints: Vec<String>) {
        let (line, column) = line_column(self.source, offset);
        self.errors
            .push(ResolveError::with_hints(code, message, line, column, hints));
    }

    fn run(&mut self) {
        let mut search_from = self.cursor;

        while let Some(found) = self.source[search_from..].find("{{") {
            let start = search_from + found;

            // `\{{` is literal text; `\\{{` is a backslash then a mustache.
            if is_escaped(self.source, start) {
                search_from = start + 2;
                continue;
            }

            self.push_content(self.cursor, start);
            self.cursor = self.mustache(start);
            search_from = self.cursor;
        }

        self.push_content(self.cursor, self.source.len());
        self.cursor = self.source.len();
    }

    /// Close blocks still open at end of input, innermost first.
    fn finish(mut self) -> ParseResult {
        let end = self.source.len();
        while let Some(open) = self.blocks.pop() {
            self.report(
                ERR_UNCLOSED_BLOCK,
                &format!("block '{}' is never closed", open.name),
                open.offset,
                vec![format!("add {{{{/{}}}}}", open.name)],
            );
            self.end_block(&open, end);
        }
        ParseResult {
            tree: self.tree,
            errors: self.errors,
        }
    }

    fn push_content(&mut self, start: usize, end: usize) {
        if end > start {
            let parent = self.container();
            self.tree.push(parent, NodeKind::Content, Span::new(start, end));
        }
    }

    /// Parse the mustache opening at `start` and return the offset after it.
    fn mustache(&mut self, start: usize) -> usize {
        let rest = &self.source[start + 2..];
        let triple = rest.starts_with('{');
        let mut pos = start + 2 + usize::from(triple);
        if self.source[pos..].starts_with('~') {
            pos += 1;
        }

        let (kind, sigil_len) = match self.source[pos..].chars().next() {
            Some('!') => (MustacheKind::Comment, 1),
            Some('#') => (MustacheKind::Block, 1),
            Some('^') => (MustacheKind::Inverse, 1),
            Some('/') => (MustacheKind::Close, 1),
            Some('>') => (MustacheKind::Partial, 1),
            Some('&') => (MustacheKind::Simple, 1),
            _ => (MustacheKind::Simple, 0),
        };
        let body_start = pos + sigil_len;

        if kind == MustacheKind::Comment {
            let closer = if self.source[body_start..].starts_with("--") {
                "--}}"
            } else {
                "}}"
            };
            let end = match self.source[body_start..].find(closer) {
                Some(i) => body_start + i + closer.len(),
                None => {
                    self.report(ERR_UNTERMINATED_MUSTACHE, "unterminated comment", start, vec![]);
                    self.source.len()
                }
            };
            let parent = self.container();
            self.tree.push(parent, NodeKind::Comment, Span::new(start, end));
            return end;
        }

        let closer = if triple { "}}}" } else { "}}" };
        let span = match find_mustache_end(self.source, body_start, closer) {
            Some(close_at) => {
                let mut body_end = close_at;
                if body_end > body_start && self.source[..body_end].ends_with('~') {
                    body_end -= 1;
                }
                MustacheSpan {
                    start,
                    body_start,
                    body_end,
                    close_start: body_end,
                    end: close_at + closer.len(),
                }
            }
            None => {
                // Still being typed: the body runs to end of input.
                self.report(
                    ERR_UNTERMINATED_MUSTACHE,
                    "unterminated mustache",
                    start,
                    vec![format!("add {}", closer)],
                );
                let end = self.source.len().max(body_start);
                MustacheSpan {
                    start,
                    body_start,
                    body_end: end,
                    close_start: end,
                    end,
                }
            }
        };

        match kind {
            MustacheKind::Block | MustacheKind::Inverse => {
                if kind == MustacheKind::Inverse && self.body(&span).trim().is_empty() {
                    // `{{^}}` is a bare else.
                    self.leaf_mustache(NodeKind::ElseMustache, &span);
                } else {
                    self.open_block(&span);
                }
            }
            MustacheKind::Close => self.close_block(&span),
            MustacheKind::Partial => {
                let parent = self.container();
                self.tree
                    .push(parent, NodeKind::Partial, Span::new(span.start, span.end));
            }
            MustacheKind::Simple | MustacheKind::Comment => {
                if ELSE_RE.is_match(self.body(&span)) {
                    self.leaf_mustache(NodeKind::ElseMustache, &span);
                } else {
                    let name = self.leaf_mustache(NodeKind::SimpleMustache, &span);
                    if name.is_empty() {
                        self.report(ERR_EMPTY_MUSTACHE, "empty mustache", span.start, vec![]);
                    }
                }
            }
        }

        span.end
    }

    /// Push a mustache that opens nothing under the current container.
    fn leaf_mustache(&mut self, kind: NodeKind, span: &MustacheSpan) -> String {
        let parent = self.container();
        let mustache = self
            .tree
            .push(parent, kind, Span::new(span.start, span.end));
        self.fill(mustache, span)
    }

    fn body(&self, span: &MustacheSpan) -> &'s str {
        &self.source[span.body_start..span.body_end]
    }

    fn open_block(&mut self, span: &MustacheSpan) {
        let parent = self.container();
        let wrapper = self
            .tree
            .push(parent, NodeKind::BlockWrapper, Span::new(span.start, span.end));
        let open = self.tree.push(
            wrapper,
            NodeKind::OpenBlockMustache,
            Span::new(span.start, span.end),
        );
        let name = self.fill(open, span);
        if name.is_empty() {
            self.report(ERR_EMPTY_MUSTACHE, "block without a name", span.start, vec![]);
        }
        let statements = self
            .tree
            .push(wrapper, NodeKind::Statements, Span::new(span.end, span.end));
        self.blocks.push(OpenBlock {
            wrapper,
            statements,
            name,
            offset: span.start,
        });
    }

    fn close_block(&mut self, span: &MustacheSpan) {
        let name = self.body(span).trim().to_string();
        let Some(expected) = self.blocks.last().map(|open| open.name.clone()) else {
            self.report(
                ERR_UNEXPECTED_CLOSE,
                &format!("'{{{{/{}}}}}' closes nothing", name),
                span.start,
                vec![],
            );
            self.push_content(span.start, span.end);
            return;
        };

        if expected != name {
            self.report(
                ERR_MISMATCHED_CLOSE,
                &format!("expected {{{{/{}}}}}, found {{{{/{}}}}}", expected, name),
                span.start,
                vec![format!("close '{}' before '{}'", expected, name)],
            );
            // Close the inner blocks up to the one named, or keep the stray
            // close as content when nothing open has that name.
            let Some(index) = self.blocks.iter().rposition(|open| open.name == name) else {
                self.push_content(span.start, span.end);
                return;
            };
            while self.blocks.len() > index + 1 {
                if let Some(inner) = self.blocks.pop() {
                    self.end_block(&inner, span.start);
                }
            }
        }

        let Some(open) = self.blocks.pop() else {
            return;
        };
        self.end_block(&open, span.start);
        let close = self.tree.push(
            open.wrapper,
            NodeKind::CloseBlockMustache,
            Span::new(span.start, span.end),
        );
        self.fill(close, span);
        let wrapper_start = self.tree.span(open.wrapper).start;
        self.tree
            .set_span(open.wrapper, Span::new(wrapper_start, span.end));
    }

    /// End a block's body, and its wrapper, at `end`.
    fn end_block(&mut self, open: &OpenBlock, end: usize) {
        let statements_start = self.tree.span(open.statements).start;
        self.tree
            .set_span(open.statements, Span::new(statements_start, end));
        let wrapper_start = self.tree.span(open.wrapper).start;
        self.tree.set_span(open.wrapper, Span::new(wrapper_start, end));
    }

    /// Populate a mustache node and return its name text, empty when the
    /// mustache has none.
    fn fill(&mut self, mustache: NodeId, span: &MustacheSpan) -> String {
        self.tree.push(
            mustache,
            NodeKind::OpenStache,
            Span::new(span.start, span.body_start),
        );

        let mut body = self.body(span);
        if let Some(params) = BLOCK_PARAMS_RE.find(body) {
            body = &body[..params.start()];
        }

        // `else` and the helper it chains to are keywords, not paths.
        let keywords = match self.tree.node(mustache).kind {
            NodeKind::ElseMustache => 2,
            _ => 0,
        };

        let mut name = String::new();
        for (index, caps) in EXPRESSION_RE.captures_iter(body).enumerate() {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let value_start = span.body_start + value.start();
            if index == 0 || index < keywords {
                if index == 0 {
                    name = value.as_str().to_string();
                }
                let mustache_name = self.tree.push(
                    mustache,
                    NodeKind::MustacheName,
                    Span::new(value_start, value_start + value.len()),
                );
                if keywords == 0 {
                    self.push_path(mustache_name, value_start, value.as_str());
                }
            } else {
                let param_start = span.body_start + whole.start();
                let param = self.tree.push(
                    mustache,
                    NodeKind::Param,
                    Span::new(param_start, param_start + whole.len()),
                );
                let param_name = self.tree.push(
                    param,
                    NodeKind::MustacheName,
                    Span::new(value_start, value_start + value.len()),
                );
                self.push_path(param_name, value_start, value.as_str());
            }
        }

        self.tree.push(
            mustache,
            NodeKind::CloseStache,
            Span::new(span.close_start, span.end),
        );
        name
    }

    fn push_path(&mut self, parent: NodeId, start: usize, text: &str) {
        if LITERAL_RE.is_match(text) {
            return;
        }
        let path = self
            .tree
            .push(parent, NodeKind::Path, Span::new(start, start + text.len()));
        if text == "." {
            self.tree
                .push(path, NodeKind::Id, Span::new(start, start + 1));
            return;
        }
        for segment in SEGMENT_RE.find_iter(text) {
            let kind = match segment.as_str() {
                "." | "/" => NodeKind::Sep,
                _ => NodeKind::Id,
            };
            self.tree.push(
                path,
                kind,
                Span::new(start + segment.start(), start + segment.end()),
            );
        }
    }
}

/// True when the `{{` at `start` follows an odd run of backslashes.
fn is_escaped(source: &str, start: usize) -> bool {
    let backslashes = source.as_bytes()[..start]
        .iter()
        .rev()
        .take_while(|b| **b == b'\\')
        .count();
    backslashes % 2 == 1
}

/// Offset of `closer` ending the mustache body that starts at `from`, skipping
/// over quoted strings.
fn find_mustache_end(source: &str, from: usize, closer: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut in_string: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }
        if b == b'"' || b == b'\'' {
            in_string = Some(b);
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(closer.as_bytes()) {
            return Some(i);
        }
        i += 1;
    }

    None
}
