//! Template syntax tree and navigation helpers.
//!
//! The resolver never builds or mutates a tree. It only asks the questions in
//! [`TemplateTree`], so a host that already owns a parsed Handlebars tree can
//! implement the trait over its own nodes. [`SyntaxTree`] is the arena-backed
//! implementation produced by [`crate::parse::parse_template`].

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// NODE KINDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of a template node.
///
/// Shape of `{{#each animals}}{{name}}{{/each}}`:
///
/// ```text
/// BlockWrapper
///   OpenBlockMustache
///     OpenStache "{{#"
///     MustacheName > Path > Id "each"
///     Param > MustacheName > Path > Id "animals"
///     CloseStache "}}"
///   Statements
///     SimpleMustache
///       OpenStache "{{"
///       MustacheName > Path > Id "name"
///       CloseStache "}}"
///   CloseBlockMustache
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Template,
    Statements,
    BlockWrapper,
    OpenBlockMustache,
    CloseBlockMustache,
    SimpleMustache,
    /// `{{else}}`, `{{^}}` or `{{else if cond}}`. Its keyword names carry no
    /// `Path`; only the trailing params are references.
    ElseMustache,
    MustacheName,
    Param,
    Path,
    Id,
    Sep,
    Content,
    Comment,
    Partial,
    OpenStache,
    CloseStache,
}

/// Byte range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Like `contains`, but also accepts the position right after the last byte
    /// (a caret placed at the end of an identifier).
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE COLLABORATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only view of a template tree.
pub trait TemplateTree {
    type Node: Copy + Eq + std::fmt::Debug;

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Source text covered by the node.
    fn text(&self, node: Self::Node) -> &str;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// Nearest strict ancestor of the given kind.
    fn ancestor_of_kind(&self, node: Self::Node, kind: NodeKind) -> Option<Self::Node> {
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if self.kind(candidate) == kind {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// First direct child of the given kind.
    fn child_of_kind(&self, node: Self::Node, kind: NodeKind) -> Option<Self::Node> {
        self.children(node)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    fn children_of_kind(&self, node: Self::Node, kind: NodeKind) -> Vec<Self::Node> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == kind)
            .collect()
    }

    /// Zero-based position of `node` among its parent's children of `kind`.
    ///
    /// For `zero.one.two` the `Path` has five children but only three `Id`s,
    /// so `two` sits at position 2.
    fn position_among_siblings(&self, node: Self::Node, kind: NodeKind) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == kind)
            .position(|child| child == node)
    }

    /// Path named by a block parameter: the first child of the param's first
    /// child, when that is a `Path`. Literal params have none.
    fn param_path(&self, param: Self::Node) -> Option<Self::Node> {
        let name = *self.children(param).first()?;
        let path = *self.children(name).first()?;
        (self.kind(path) == NodeKind::Path).then_some(path)
    }

    /// True when the node is a segment of a block parameter, e.g. `animals`
    /// in `{{#each animals}}`, rather than a segment inside the block body.
    /// Only params of an opening block count: `name` in `{{format name}}` is
    /// an ordinary reference, in a block body and at template root alike.
    fn is_block_parameter(&self, node: Self::Node) -> bool {
        self.parent(node)
            .and_then(|path| self.parent(path))
            .and_then(|name| self.parent(name))
            .filter(|param| self.kind(*param) == NodeKind::Param)
            .and_then(|param| self.parent(param))
            .is_some_and(|open| self.kind(open) == NodeKind::OpenBlockMustache)
    }

    /// Helper name of a mustache, e.g. `each` for `{{#each animals}}`.
    fn mustache_name(&self, mustache: Self::Node) -> Option<&str> {
        let name = self.child_of_kind(mustache, NodeKind::MustacheName)?;
        Some(self.text(name).trim())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARENA TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Parsed template: an arena of nodes over an owned source string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Empty tree holding only a `Template` root spanning the whole source.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = Node {
            kind: NodeKind::Template,
            span: Span::new(0, source.len()),
            parent: None,
            children: vec![],
        };
        Self {
            source,
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append a node under `parent`. Children keep insertion order.
    pub fn push(&mut self, parent: NodeId, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.index()].span = span;
    }

    /// Every `Id` that is a segment of a `Path`, in source order.
    pub fn path_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_path_ids(self.root(), &mut out);
        out
    }

    fn collect_path_ids(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.kind == NodeKind::Id
            && node
                .parent
                .is_some_and(|p| self.node(p).kind == NodeKind::Path)
        {
            out.push(id);
        }
        for child in &node.children {
            self.collect_path_ids(*child, out);
        }
    }

    /// The path segment under a caret at byte `offset`, if any.
    pub fn id_at_offset(&self, offset: usize) -> Option<NodeId> {
        let ids = self.path_ids();
        ids.iter()
            .copied()
            .find(|id| self.span(*id).contains(offset))
            .or_else(|| ids.into_iter().find(|id| self.span(*id).touches(offset)))
    }
}

impl TemplateTree for SyntaxTree {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn text(&self, node: NodeId) -> &str {
        let span = self.span(node);
        &self.source[span.start..span.end]
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }
}
