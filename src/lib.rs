//! # Handlebars Reference Resolver
//!
//! Resolves identifiers inside Handlebars expressions such as `{{foo.bar}}` or
//! `{{#each items}}{{name}}{{/each}}` to typed fields of a host class model,
//! for go-to-definition and completion.
//!
//! ## Scope Rules
//!
//! 1. **Root Scope**: Outside of any block, the template's root class is the
//!    only context.
//!
//! 2. **Scope Blocks**: `each` and `with` push one context: the field named by
//!    the block parameter and the class its type resolves to. For `each` that
//!    is the collection's element class. Other blocks (`if`, `unless`, ...)
//!    leave the scope untouched.
//!
//! 3. **Empty Slots**: A scope block whose parameter does not resolve still
//!    pushes a slot, but an empty one, so stack depth tracks nesting.
//!
//! 4. **Block Parameters**: `animals` in `{{#each animals}}` is resolved in the
//!    scope around the block, never in the scope the block creates.
//!
//! 5. **First Segment**: Searched innermost context first; the nearest match
//!    wins. `this` names the innermost block's bound field.
//!
//! 6. **Later Segments**: Looked up only on the class of the previous
//!    segment's type, with no fallback to outer scopes.
//!
//! 7. **No Errors**: A reference that cannot be resolved is `None`.

mod bridge;
mod error;
mod model;
mod options;
mod parse;
mod resolve;
mod scope;
mod syntax;
mod types;

#[cfg(test)]
mod test_fixtures;

#[cfg(test)]
mod bridge_tests;

pub use bridge::{resolve_reference, resolve_template, FieldExport, ReferenceExport};
#[cfg(feature = "napi")]
pub use bridge::{resolve_reference_native, resolve_template_native, resolver_bridge};
pub use error::*;
pub use model::{ClassId, ClassInput, ClassModel, FieldId, FieldInput, ModelInput, TypeRef};
pub use options::ResolverOptions;
pub use parse::{parse_template, parse_template_recovering, ParseResult};
pub use resolve::{ResolvedReference, Resolver};
pub use scope::{Context, Scope, ScopeStack};
pub use syntax::{Node, NodeId, NodeKind, Span, SyntaxTree, TemplateTree};
pub use types::TypeSystem;
