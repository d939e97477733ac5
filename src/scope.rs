//! Scope building.
//!
//! A template's lexical scope is the chain of enclosing `each`/`with` blocks.
//! Each one contributes a [`Context`]: the field its parameter resolved to and
//! the class that field's type resolves to. The stack is root-first, so the
//! innermost block is the last slot.

use crate::resolve::Resolver;
use crate::syntax::{NodeKind, TemplateTree};
use crate::types::TypeSystem;

/// One level of lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context<F, C> {
    /// Field whose type produced this scope; `None` for the template root.
    pub origin: Option<F>,
    /// Class whose fields are visible inside the scope.
    pub class: C,
}

/// Root-first sequence of scope slots.
///
/// A scope block whose parameter does not resolve still occupies a slot
/// (`None`), so depth keeps tracking block nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeStack<F, C> {
    slots: Vec<Option<Context<F, C>>>,
}

/// Scope stack over a type system's handles.
pub type Scope<S> = ScopeStack<<S as TypeSystem>::Field, <S as TypeSystem>::Class>;

impl<F: Copy, C: Copy> ScopeStack<F, C> {
    /// Stack with no slots, used when a block parameter has no enclosing block.
    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    /// Single root context for the template's data-binding class.
    pub fn root(class: C) -> Self {
        Self {
            slots: vec![Some(Context {
                origin: None,
                class,
            })],
        }
    }

    /// New stack with `slot` appended as the innermost scope.
    pub fn pushed(mut self, slot: Option<Context<F, C>>) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Context<F, C>>] {
        &self.slots
    }

    /// Innermost slot, if it holds a context.
    pub fn innermost(&self) -> Option<&Context<F, C>> {
        self.slots.last()?.as_ref()
    }

    /// Contexts from innermost to outermost, skipping empty slots.
    pub fn iter_outward(&self) -> impl Iterator<Item = &Context<F, C>> + '_ {
        self.slots.iter().rev().flatten()
    }
}

/// What a block does to the scope of its body.
enum BlockScope<F, C> {
    /// Appends one slot (possibly empty).
    Opens(Option<Context<F, C>>),
    /// Leaves the outer scope as is (`if`, `unless`, other helpers).
    PassThrough,
}

impl<'t, S: TypeSystem> Resolver<'t, S> {
    /// Scope stack in effect at `element`.
    pub fn build_scope<T: TemplateTree>(&self, tree: &T, element: T::Node) -> Scope<S> {
        let Some(wrapper) = tree.ancestor_of_kind(element, NodeKind::BlockWrapper) else {
            return ScopeStack::root(self.root());
        };

        let outer = self.build_scope(tree, wrapper);
        match self.block_scope(tree, wrapper, &outer) {
            BlockScope::Opens(slot) => outer.pushed(slot),
            BlockScope::PassThrough => outer,
        }
    }

    /// Scope used to resolve `element`. A block parameter names something in
    /// the scope around its block, so the block itself is skipped.
    pub fn element_scope<T: TemplateTree>(&self, tree: &T, element: T::Node) -> Scope<S> {
        if !tree.is_block_parameter(element) {
            return self.build_scope(tree, element);
        }
        match tree.ancestor_of_kind(element, NodeKind::BlockWrapper) {
            Some(wrapper) => self.build_scope(tree, wrapper),
            None => ScopeStack::empty(),
        }
    }

    fn block_scope<T: TemplateTree>(
        &self,
        tree: &T,
        wrapper: T::Node,
        outer: &Scope<S>,
    ) -> BlockScope<S::Field, S::Class> {
        let Some(open) = tree.child_of_kind(wrapper, NodeKind::OpenBlockMustache) else {
            return BlockScope::Opens(None);
        };
        let Some(name) = tree.mustache_name(open) else {
            return BlockScope::Opens(None);
        };
        let Some(param) = tree.child_of_kind(open, NodeKind::Param) else {
            return BlockScope::Opens(None);
        };
        if !self.options().opens_scope(name) {
            return BlockScope::PassThrough;
        }

        // `each` binds the element type of its collection, `with` the object
        // itself; both come out of `field_class`.
        let slot = tree
            .param_path(param)
            .and_then(|path| self.resolve_path(outer, tree, path, None))
            .and_then(|field| {
                self.types().field_class(field).map(|class| Context {
                    origin: Some(field),
                    class,
                })
            });
        BlockScope::Opens(slot)
    }
}
