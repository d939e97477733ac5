//! Path resolution.
//!
//! The first segment of a path is searched through the scope stack from the
//! innermost context outward; every later segment is a field of the class the
//! previous segment's type resolves to. Any miss yields `None`: an unresolved
//! reference is an expected outcome while the user is typing, not an error.

use rayon::prelude::*;
use serde::Serialize;

use crate::options::ResolverOptions;
use crate::scope::Scope;
use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree, TemplateTree};
use crate::types::TypeSystem;

/// Resolves template references against a class model rooted at the
/// template's data-binding class.
#[derive(Debug, Clone)]
pub struct Resolver<'t, S: TypeSystem> {
    types: &'t S,
    root: S::Class,
    options: ResolverOptions,
}

/// One path segment of a template and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference<F> {
    pub node: NodeId,
    pub span: Span,
    pub text: String,
    pub field: Option<F>,
}

impl<'t, S: TypeSystem> Resolver<'t, S> {
    pub fn new(types: &'t S, root: S::Class) -> Self {
        Self::with_options(types, root, ResolverOptions::default())
    }

    pub fn with_options(types: &'t S, root: S::Class, options: ResolverOptions) -> Self {
        Self {
            types,
            root,
            options,
        }
    }

    pub fn types(&self) -> &'t S {
        self.types
    }

    pub fn root(&self) -> S::Class {
        self.root
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Field referenced by the path segment `element`.
    pub fn resolve<T: TemplateTree>(&self, tree: &T, element: T::Node) -> Option<S::Field> {
        let path = tree.ancestor_of_kind(element, NodeKind::Path)?;
        let position = tree.position_among_siblings(element, NodeKind::Id)?;
        let scope = self.element_scope(tree, element);
        self.resolve_path(&scope, tree, path, Some(position))
    }

    /// Go-to-definition entry point: the field under a caret.
    pub fn resolve_at_offset(&self, tree: &SyntaxTree, offset: usize) -> Option<S::Field> {
        let id = tree.id_at_offset(offset)?;
        self.resolve(tree, id)
    }

    /// Resolve `path` up to and including segment `depth` (the whole path when
    /// `None`). A path shorter than `depth` yields the field of its last
    /// segment.
    pub fn resolve_path<T: TemplateTree>(
        &self,
        scope: &Scope<S>,
        tree: &T,
        path: T::Node,
        depth: Option<usize>,
    ) -> Option<S::Field> {
        let segments = tree.children_of_kind(path, NodeKind::Id);
        let take = depth.map_or(segments.len(), |d| d.saturating_add(1));

        let mut field = None;
        for (index, segment) in segments.into_iter().take(take).enumerate() {
            let name = tree.text(segment);
            field = if index == 0 {
                self.resolve_first(scope, name)
            } else {
                self.resolve_member(field?, name)
            };
        }
        field
    }

    fn resolve_first(&self, scope: &Scope<S>, name: &str) -> Option<S::Field> {
        if name == self.options.self_keyword {
            return scope.innermost()?.origin;
        }
        scope
            .iter_outward()
            .find_map(|context| self.types.find_field(context.class, name))
    }

    fn resolve_member(&self, previous: S::Field, name: &str) -> Option<S::Field> {
        let class = self.types.field_class(previous)?;
        self.types.find_field(class, name)
    }

    /// Completion candidates for the segment at `element`: everything visible
    /// through the scope for a first segment (inner names shadow outer ones),
    /// otherwise the fields of the previous segment's class.
    pub fn completions<T: TemplateTree>(&self, tree: &T, element: T::Node) -> Vec<S::Field> {
        let Some(position) = tree.position_among_siblings(element, NodeKind::Id) else {
            return vec![];
        };
        let scope = self.element_scope(tree, element);

        if position == 0 {
            let mut seen: Vec<&str> = Vec::new();
            let mut out = Vec::new();
            for context in scope.iter_outward() {
                for field in self.types.fields(context.class) {
                    let name = self.types.field_name(field);
                    if !seen.contains(&name) {
                        seen.push(name);
                        out.push(field);
                    }
                }
            }
            return out;
        }

        tree.ancestor_of_kind(element, NodeKind::Path)
            .and_then(|path| self.resolve_path(&scope, tree, path, Some(position - 1)))
            .and_then(|previous| self.types.field_class(previous))
            .map(|class| self.types.fields(class))
            .unwrap_or_default()
    }
}

impl<'t, S> Resolver<'t, S>
where
    S: TypeSystem + Sync,
    S::Class: Send + Sync,
    S::Field: Send + Sync,
{
    /// Resolve every data reference in a template. Helper names of blocks are
    /// skipped. Segments are independent, so they are resolved in parallel.
    pub fn resolve_all(&self, tree: &SyntaxTree) -> Vec<ResolvedReference<S::Field>> {
        let ids: Vec<NodeId> = tree
            .path_ids()
            .into_iter()
            .filter(|id| !is_block_helper_name(tree, *id))
            .collect();

        let references: Vec<ResolvedReference<S::Field>> = ids
            .par_iter()
            .map(|id| ResolvedReference {
                node: *id,
                span: tree.span(*id),
                text: tree.text(*id).to_string(),
                field: self.resolve(tree, *id),
            })
            .collect();

        tracing::debug!(
            references = references.len(),
            resolved = references.iter().filter(|r| r.field.is_some()).count(),
            "resolved template references"
        );
        references
    }
}

/// `each` in `{{#each animals}}` or `{{/each}}`.
fn is_block_helper_name<T: TemplateTree>(tree: &T, id: T::Node) -> bool {
    tree.parent(id)
        .and_then(|path| tree.parent(path))
        .filter(|name| tree.kind(*name) == NodeKind::MustacheName)
        .and_then(|name| tree.parent(name))
        .is_some_and(|mustache| {
            matches!(
                tree.kind(mustache),
                NodeKind::OpenBlockMustache | NodeKind::CloseBlockMustache
            )
        })
}
