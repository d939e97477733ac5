//! Host bridge.
//!
//! JSON-in/JSON-out entry points for editor hosts that cannot link against the
//! Rust API directly. With the `napi` feature the same functions are exported
//! to Node.js.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::model::{ClassModel, FieldId};
use crate::options::ResolverOptions;
use crate::parse::parse_template_recovering;
use crate::syntax::SyntaxTree;
use crate::resolve::Resolver;
use crate::types::TypeSystem;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// A resolved field, described by name so the host can locate its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct FieldExport {
    pub owner: String,
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct ReferenceExport {
    pub start: u32,
    pub end: u32,
    pub text: String,
    pub field: Option<FieldExport>,
}

fn export_field(model: &ClassModel, field: FieldId) -> FieldExport {
    FieldExport {
        owner: model.class_name(model.field_owner(field)).to_string(),
        name: model.field_name(field).to_string(),
        declared_type: model.field_type(field).to_string(),
    }
}

/// Half-typed templates are the norm in an editor, so template defects are
/// repaired and logged rather than returned.
fn load_template(template: &str) -> SyntaxTree {
    let result = parse_template_recovering(template);
    for err in &result.errors {
        tracing::debug!(code = %err.code, line = err.line, column = err.column, "{}", err.message);
    }
    result.tree
}

fn load_options(options_json: Option<&str>) -> Result<ResolverOptions, ResolveError> {
    match options_json {
        Some(json) if !json.trim().is_empty() => ResolverOptions::from_json(json),
        _ => Ok(ResolverOptions::default()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Field under the caret at byte `offset`, or `None` when the reference does
/// not resolve.
pub fn resolve_reference(
    template: &str,
    offset: usize,
    model_json: &str,
    root_class: &str,
    options_json: Option<&str>,
) -> Result<Option<FieldExport>, ResolveError> {
    let model = ClassModel::from_json(model_json)?;
    let root = model.require_class(root_class)?;
    let tree = load_template(template);
    let resolver = Resolver::with_options(&model, root, load_options(options_json)?);

    Ok(resolver
        .resolve_at_offset(&tree, offset)
        .map(|field| export_field(&model, field)))
}

/// Every data reference in a template with its resolution.
pub fn resolve_template(
    template: &str,
    model_json: &str,
    root_class: &str,
    options_json: Option<&str>,
) -> Result<Vec<ReferenceExport>, ResolveError> {
    let model = ClassModel::from_json(model_json)?;
    let root = model.require_class(root_class)?;
    let tree = load_template(template);
    let resolver = Resolver::with_options(&model, root, load_options(options_json)?);

    Ok(resolver
        .resolve_all(&tree)
        .into_iter()
        .map(|reference| ReferenceExport {
            start: reference.span.start as u32,
            end: reference.span.end as u32,
            text: reference.text,
            field: reference.field.map(|field| export_field(&model, field)),
        })
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn to_napi_error(err: ResolveError) -> napi::Error {
    napi::Error::from_reason(err.to_string())
}

#[cfg(feature = "napi")]
#[napi]
pub fn resolver_bridge() -> String {
    "Handlebars Resolver Bridge Connected".to_string()
}

#[cfg(feature = "napi")]
#[napi]
pub fn resolve_reference_native(
    template: String,
    offset: u32,
    model_json: String,
    root_class: String,
    options_json: Option<String>,
) -> napi::Result<Option<FieldExport>> {
    resolve_reference(
        &template,
        offset as usize,
        &model_json,
        &root_class,
        options_json.as_deref(),
    )
    .map_err(to_napi_error)
}

#[cfg(feature = "napi")]
#[napi]
pub fn resolve_template_native(
    template: String,
    model_json: String,
    root_class: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let references = resolve_template(&template, &model_json, &root_class, options_json.as_deref())
        .map_err(to_napi_error)?;
    serde_json::to_string(&references)
        .map_err(|e| napi::Error::from_reason(format!("Serialize error: {}", e)))
}
