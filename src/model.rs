//! Class Model
//!
//! JSON-backed [`TypeSystem`]. A host exports its data-binding classes as
//!
//! ```json
//! { "classes": [
//!     { "name": "Jungle", "fields": [ { "name": "animals", "type": "List<Animal>?" } ] },
//!     { "name": "Animal", "superclass": "Creature", "fields": [ { "name": "animalName", "type": "String" } ] }
//! ] }
//! ```
//!
//! Declared types stay strings on the wire and are parsed into [`TypeRef`] at
//! load time, so every field's class is resolved once up front.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ResolveError, ERR_BAD_TYPE, ERR_DUPLICATE_CLASS, ERR_MODEL_JSON, ERR_UNKNOWN_ROOT};
use crate::types::TypeSystem;

lazy_static! {
    /// Possibly qualified type name: `Animal`, `kotlin.collections.List`, `Map$Entry`.
    static ref TYPE_NAME_RE: Regex = Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*").unwrap();

    /// Use-site variance and wildcard bounds that do not change the element class.
    static ref VARIANCE_RE: Regex = Regex::new(r"^(?:out\s+|in\s+|\?\s+extends\s+|\?\s+super\s+)").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInput {
    #[serde(default)]
    pub classes: Vec<ClassInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `String`, `Animal`, `?`, `*`
    Named(String),
    /// `List<Animal>`, `Map<String, Food>`
    Generic { base: String, args: Vec<TypeRef> },
    /// `Animal[]`
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// Parse a declared type string. A trailing `?` (nullable) is ignored.
    pub fn parse(text: &str) -> Option<TypeRef> {
        let mut parser = TypeParser { rest: text.trim() };
        let ty = parser.parse_type()?;
        parser.rest.is_empty().then_some(ty)
    }
}

struct TypeParser<'a> {
    rest: &'a str,
}

impl<'a> TypeParser<'a> {
    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest.trim_start();
                true
            }
            None => false,
        }
    }

    fn parse_type(&mut self) -> Option<TypeRef> {
        if let Some(found) = VARIANCE_RE.find(self.rest) {
            self.rest = &self.rest[found.end()..];
        }

        let mut ty = if self.eat("*") {
            TypeRef::Named("*".to_string())
        } else if self.rest.starts_with('?')
            && !self.rest[1..]
                .trim_start()
                .starts_with(|c: char| c.is_alphanumeric())
        {
            self.eat("?");
            TypeRef::Named("?".to_string())
        } else {
            let name = TYPE_NAME_RE.find(self.rest)?.as_str().to_string();
            self.rest = self.rest[name.len()..].trim_start();
            if self.eat("<") {
                let mut args = vec![self.parse_type()?];
                while self.eat(",") {
                    args.push(self.parse_type()?);
                }
                if !self.eat(">") {
                    return None;
                }
                TypeRef::Generic { base: name, args }
            } else {
                TypeRef::Named(name)
            }
        };

        loop {
            if self.eat("[]") {
                ty = TypeRef::Array(Box::new(ty));
            } else if self.eat("?") {
                // nullable marker
            } else {
                return Some(ty);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASS MODEL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(u32);

#[derive(Debug, Clone)]
struct ClassDef {
    name: String,
    superclass: Option<ClassId>,
    fields: Vec<FieldId>,
}

#[derive(Debug, Clone)]
struct FieldDef {
    owner: ClassId,
    name: String,
    declared_type: String,
    class: Option<ClassId>,
}

/// Loaded class model. Immutable after construction, so it can be shared
/// across threads during parallel resolution.
#[derive(Debug, Clone, Default)]
pub struct ClassModel {
    classes: Vec<ClassDef>,
    fields: Vec<FieldDef>,
    by_name: HashMap<String, ClassId>,
}

impl ClassModel {
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        let input: ModelInput = serde_json::from_str(json).map_err(|e| {
            ResolveError::new(
                ERR_MODEL_JSON,
                &format!("class model parse error: {}", e),
                e.line() as u32,
                e.column() as u32,
            )
        })?;
        Self::from_input(input)
    }

    pub fn from_input(input: ModelInput) -> Result<Self, ResolveError> {
        let mut model = ClassModel::default();

        for class in &input.classes {
            let id = ClassId(model.classes.len() as u32);
            if model.by_name.insert(class.name.clone(), id).is_some() {
                return Err(ResolveError::unpositioned(
                    ERR_DUPLICATE_CLASS,
                    &format!("class '{}' is declared twice", class.name),
                ));
            }
            model.classes.push(ClassDef {
                name: class.name.clone(),
                superclass: None,
                fields: vec![],
            });
        }

        let mut parsed = Vec::new();
        for (index, class) in input.classes.iter().enumerate() {
            let owner = ClassId(index as u32);
            if let Some(superclass) = &class.superclass {
                match model.class(superclass) {
                    Some(parent) => model.classes[index].superclass = Some(parent),
                    None => tracing::warn!(
                        class = %class.name,
                        %superclass,
                        "superclass not in model, inherited fields will be missing"
                    ),
                }
            }
            for field in &class.fields {
                let ty = TypeRef::parse(&field.declared_type).ok_or_else(|| {
                    ResolveError::unpositioned(
                        ERR_BAD_TYPE,
                        &format!(
                            "field '{}.{}' has unparseable type '{}'",
                            class.name, field.name, field.declared_type
                        ),
                    )
                })?;
                let id = FieldId(model.fields.len() as u32);
                model.fields.push(FieldDef {
                    owner,
                    name: field.name.clone(),
                    declared_type: field.declared_type.clone(),
                    class: None,
                });
                model.classes[index].fields.push(id);
                parsed.push(ty);
            }
        }

        for (index, ty) in parsed.iter().enumerate() {
            model.fields[index].class = model.resolve_type(ty);
        }

        tracing::debug!(
            classes = model.classes.len(),
            fields = model.fields.len(),
            "loaded class model"
        );
        Ok(model)
    }

    /// Class by exact name, falling back to the simple name of a qualified one.
    pub fn class(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied().or_else(|| {
            let simple = name.rsplit('.').next()?;
            (simple != name)
                .then(|| self.by_name.get(simple).copied())
                .flatten()
        })
    }

    pub fn require_class(&self, name: &str) -> Result<ClassId, ResolveError> {
        self.class(name).ok_or_else(|| {
            ResolveError::with_hints(
                ERR_UNKNOWN_ROOT,
                &format!("no class named '{}' in the model", name),
                0,
                0,
                self.classes.iter().map(|c| c.name.clone()).collect(),
            )
        })
    }

    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class.0 as usize].superclass
    }

    pub fn field_owner(&self, field: FieldId) -> ClassId {
        self.field_def(field).owner
    }

    pub fn field_type(&self, field: FieldId) -> &str {
        &self.field_def(field).declared_type
    }

    fn field_def(&self, field: FieldId) -> &FieldDef {
        &self.fields[field.0 as usize]
    }

    fn resolve_type(&self, ty: &TypeRef) -> Option<ClassId> {
        match ty {
            TypeRef::Named(name) => self.class(name),
            TypeRef::Generic { base, args } => self
                .class(base)
                .or_else(|| args.last().and_then(|arg| self.resolve_type(arg))),
            TypeRef::Array(element) => self.resolve_type(element),
        }
    }

    /// `class` followed by its superclasses. Stops on a cycle.
    fn lineage(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = vec![class];
        let mut current = self.superclass(class);
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.superclass(parent);
        }
        chain
    }
}

impl TypeSystem for ClassModel {
    type Class = ClassId;
    type Field = FieldId;

    fn find_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.lineage(class).into_iter().find_map(|c| {
            self.classes[c.0 as usize]
                .fields
                .iter()
                .copied()
                .find(|f| self.field_def(*f).name == name)
        })
    }

    fn field_class(&self, field: FieldId) -> Option<ClassId> {
        self.field_def(field).class
    }

    fn fields(&self, class: ClassId) -> Vec<FieldId> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::new();
        for c in self.lineage(class) {
            for field in &self.classes[c.0 as usize].fields {
                let name = self.field_def(*field).name.as_str();
                if !seen.contains(&name) {
                    seen.push(name);
                    out.push(*field);
                }
            }
        }
        out
    }

    fn field_name(&self, field: FieldId) -> &str {
        &self.field_def(field).name
    }

    fn class_name(&self, class: ClassId) -> &str {
        &self.classes[class.0 as usize].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str) -> TypeRef {
        TypeRef::Named(name.to_string())
    }

    #[test]
    fn test_type_ref_parsing() {
        assert_eq!(TypeRef::parse("String"), Some(named("String")));
        assert_eq!(TypeRef::parse("Animal?"), Some(named("Animal")));
        assert_eq!(
            TypeRef::parse("List<Animal>?"),
            Some(TypeRef::Generic {
                base: "List".to_string(),
                args: vec![named("Animal")],
            })
        );
        assert_eq!(
            TypeRef::parse("java.util.Map<String, List<out Food>>"),
            Some(TypeRef::Generic {
                base: "java.util.Map".to_string(),
                args: vec![
                    named("String"),
                    TypeRef::Generic {
                        base: "List".to_string(),
                        args: vec![named("Food")],
                    },
                ],
            })
        );
        assert_eq!(
            TypeRef::parse("Food[]"),
            Some(TypeRef::Array(Box::new(named("Food"))))
        );
        assert_eq!(
            TypeRef::parse("List<? extends Food>"),
            Some(TypeRef::Generic {
                base: "List".to_string(),
                args: vec![named("Food")],
            })
        );
        assert_eq!(TypeRef::parse("List<Animal"), None);
        assert_eq!(TypeRef::parse(""), None);
    }

    fn zoo() -> ClassModel {
        let input: ModelInput = serde_json::from_value(json!({
            "classes": [
                { "name": "Creature", "fields": [
                    { "name": "legs", "type": "Int" },
                    { "name": "home", "type": "Habitat" }
                ] },
                { "name": "Animal", "superclass": "Creature", "fields": [
                    { "name": "legs", "type": "Long" },
                    { "name": "foods", "type": "List<Food>" },
                    { "name": "tags", "type": "String[]" }
                ] },
                { "name": "Food", "fields": [ { "name": "name", "type": "String" } ] },
                { "name": "Habitat", "fields": [ { "name": "climate", "type": "String" } ] }
            ]
        }))
        .unwrap();
        ClassModel::from_input(input).unwrap()
    }

    #[test]
    fn test_inherited_lookup_prefers_nearest() {
        let model = zoo();
        let animal = model.class("Animal").unwrap();
        let legs = model.find_field(animal, "legs").unwrap();
        assert_eq!(model.field_type(legs), "Long");
        assert_eq!(model.class_name(model.field_owner(legs)), "Animal");

        let home = model.find_field(animal, "home").unwrap();
        assert_eq!(model.class_name(model.field_owner(home)), "Creature");
        assert_eq!(model.field_class(home), model.class("Habitat"));

        assert_eq!(model.find_field(animal, "wings"), None);
    }

    #[test]
    fn test_field_class_resolution() {
        let model = zoo();
        let animal = model.class("Animal").unwrap();
        let foods = model.find_field(animal, "foods").unwrap();
        assert_eq!(model.field_class(foods), model.class("Food"));
        let tags = model.find_field(animal, "tags").unwrap();
        assert_eq!(model.field_class(tags), None);
        let legs = model.find_field(animal, "legs").unwrap();
        assert_eq!(model.field_class(legs), None);
    }

    #[test]
    fn test_fields_hide_shadowed_inherited() {
        let model = zoo();
        let animal = model.class("Animal").unwrap();
        let names: Vec<&str> = model
            .fields(animal)
            .into_iter()
            .map(|f| model.field_name(f))
            .collect();
        assert_eq!(names, vec!["legs", "foods", "tags", "home"]);
    }

    #[test]
    fn test_qualified_name_falls_back_to_simple() {
        let model = zoo();
        assert_eq!(model.class("com.example.Food"), model.class("Food"));
        assert_eq!(model.class("com.example.Missing"), None);
    }

    #[test]
    fn test_superclass_cycle_terminates() {
        let json = r#"{ "classes": [
            { "name": "A", "superclass": "B", "fields": [] },
            { "name": "B", "superclass": "A", "fields": [ { "name": "x", "type": "String" } ] }
        ] }"#;
        let model = ClassModel::from_json(json).unwrap();
        let a = model.class("A").unwrap();
        assert!(model.find_field(a, "x").is_some());
        assert!(model.find_field(a, "y").is_none());
    }

    #[test]
    fn test_load_errors() {
        let err = ClassModel::from_json("{ \"classes\": [").unwrap_err();
        assert_eq!(err.code, ERR_MODEL_JSON);

        let dup = r#"{ "classes": [ { "name": "A" }, { "name": "A" } ] }"#;
        assert_eq!(ClassModel::from_json(dup).unwrap_err().code, ERR_DUPLICATE_CLASS);

        let bad = r#"{ "classes": [ { "name": "A", "fields": [ { "name": "x", "type": "List<" } ] } ] }"#;
        assert_eq!(ClassModel::from_json(bad).unwrap_err().code, ERR_BAD_TYPE);

        let model = zoo();
        let missing = model.require_class("Zoo").unwrap_err();
        assert_eq!(missing.code, ERR_UNKNOWN_ROOT);
        assert!(missing.hints.contains(&"Animal".to_string()));
    }
}
