//! Shared fixtures: a small zoo of data-binding classes and lookup helpers.

use crate::model::{ClassModel, FieldId};
use crate::parse::parse_template;
use crate::resolve::Resolver;
use crate::syntax::{NodeId, SyntaxTree, TemplateTree};
use crate::types::TypeSystem;

pub const JUNGLE_MODEL: &str = r#"{
    "classes": [
        { "name": "Jungle", "fields": [
            { "name": "animals", "type": "List<Animal>?" },
            { "name": "title", "type": "String" },
            { "name": "ranger", "type": "Ranger" }
        ] },
        { "name": "Animal", "fields": [
            { "name": "animalName", "type": "String" },
            { "name": "foods", "type": "List<Food>?" },
            { "name": "animalNames", "type": "String" },
            { "name": "sound", "type": "String" }
        ] },
        { "name": "Food", "fields": [
            { "name": "name", "type": "String" },
            { "name": "type", "type": "Type" }
        ] },
        { "name": "Type", "fields": [
            { "name": "name", "type": "String" }
        ] },
        { "name": "Person", "fields": [
            { "name": "fullName", "type": "String" }
        ] },
        { "name": "Ranger", "superclass": "Person", "fields": [
            { "name": "badge", "type": "Badge" }
        ] },
        { "name": "Badge", "fields": [
            { "name": "number", "type": "Int" }
        ] }
    ]
}"#;

pub fn jungle() -> ClassModel {
    ClassModel::from_json(JUNGLE_MODEL).unwrap()
}

pub fn parse(source: &str) -> SyntaxTree {
    parse_template(source).unwrap()
}

/// The `nth` (zero-based) path segment whose text is `text`.
pub fn segment(tree: &SyntaxTree, text: &str, nth: usize) -> NodeId {
    tree.path_ids()
        .into_iter()
        .filter(|id| tree.text(*id) == text)
        .nth(nth)
        .unwrap_or_else(|| panic!("no occurrence {} of segment '{}'", nth, text))
}

/// `Owner.field` for a resolved field.
pub fn describe(model: &ClassModel, field: Option<FieldId>) -> Option<String> {
    field.map(|f| {
        format!(
            "{}.{}",
            model.class_name(model.field_owner(f)),
            model.field_name(f)
        )
    })
}

/// Resolve the `nth` occurrence of `text` in `source` against a `Jungle` root.
pub fn resolve_nth(source: &str, text: &str, nth: usize) -> Option<String> {
    let model = jungle();
    let root = model.class("Jungle").unwrap();
    let tree = parse(source);
    let resolver = Resolver::new(&model, root);
    let field = resolver.resolve(&tree, segment(&tree, text, nth));
    describe(&model, field)
}

pub fn resolve_first(source: &str, text: &str) -> Option<String> {
    resolve_nth(source, text, 0)
}
