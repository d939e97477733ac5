#[cfg(test)]
mod tests {
    use crate::bridge::{resolve_reference, resolve_template, FieldExport};
    use crate::error::{ERR_MODEL_JSON, ERR_OPTIONS_JSON, ERR_UNKNOWN_ROOT};
    use crate::test_fixtures::JUNGLE_MODEL;

    const TEMPLATE: &str = "{{#each animals}}{{animalName}} {{ranger.fullName}}{{/each}}";

    fn field(owner: &str, name: &str, declared_type: &str) -> FieldExport {
        FieldExport {
            owner: owner.to_string(),
            name: name.to_string(),
            declared_type: declared_type.to_string(),
        }
    }

    fn offset_of(needle: &str) -> usize {
        TEMPLATE.find(needle).unwrap()
    }

    #[test]
    fn test_reference_under_caret() {
        let found =
            resolve_reference(TEMPLATE, offset_of("animalName"), JUNGLE_MODEL, "Jungle", None)
                .unwrap();
        assert_eq!(found, Some(field("Animal", "animalName", "String")));

        let block_param =
            resolve_reference(TEMPLATE, offset_of("animals"), JUNGLE_MODEL, "Jungle", None)
                .unwrap();
        assert_eq!(block_param, Some(field("Jungle", "animals", "List<Animal>?")));
    }

    #[test]
    fn test_inherited_field_reports_declaring_class() {
        let found = resolve_reference(
            TEMPLATE,
            offset_of("fullName"),
            JUNGLE_MODEL,
            "Jungle",
            None,
        )
        .unwrap();
        assert_eq!(found, Some(field("Person", "fullName", "String")));
    }

    #[test]
    fn test_caret_outside_any_reference() {
        let found = resolve_reference(TEMPLATE, 0, JUNGLE_MODEL, "Jungle", None).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_blank_options_use_defaults() {
        let found = resolve_reference(
            TEMPLATE,
            offset_of("animalName"),
            JUNGLE_MODEL,
            "Jungle",
            Some("  "),
        )
        .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_options_change_scope_blocks() {
        let options = r#"{ "scopeBlocks": ["with"] }"#;
        let found = resolve_reference(
            TEMPLATE,
            offset_of("animalName"),
            JUNGLE_MODEL,
            "Jungle",
            Some(options),
        )
        .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_template_references_skip_helper_names() {
        let references = resolve_template(TEMPLATE, JUNGLE_MODEL, "Jungle", None).unwrap();
        let texts: Vec<&str> = references.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["animals", "animalName", "ranger", "fullName"]);

        let ranger = &references[2];
        assert_eq!(ranger.start as usize, offset_of("ranger"));
        assert_eq!(ranger.end as usize, offset_of("ranger") + "ranger".len());
        assert_eq!(ranger.field, Some(field("Jungle", "ranger", "Ranger")));
    }

    #[test]
    fn test_template_references_serialize_camel_case() {
        let references = resolve_template("{{title}}", JUNGLE_MODEL, "Jungle", None).unwrap();
        let json = serde_json::to_value(&references).unwrap();
        assert_eq!(json[0]["field"]["declaredType"], "String");
        assert_eq!(json[0]["start"], 2);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unknown_root_class() {
        let err = resolve_reference(TEMPLATE, 0, JUNGLE_MODEL, "Savanna", None).unwrap_err();
        assert_eq!(err.code, ERR_UNKNOWN_ROOT);
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn test_unclosed_block_still_resolves() {
        let animal_name = Some(field("Animal", "animalName", "String"));
        let typing = "{{#each animals}}{{animalName}}";
        let found = resolve_reference(typing, 19, JUNGLE_MODEL, "Jungle", None).unwrap();
        assert_eq!(found, animal_name);

        let trailing = "{{#each animals}}{{animalName}}{{";
        let found = resolve_reference(trailing, 19, JUNGLE_MODEL, "Jungle", None).unwrap();
        assert_eq!(found, animal_name);
    }

    #[test]
    fn test_empty_and_stray_mustaches_still_resolve() {
        let animal_name = Some(field("Animal", "animalName", "String"));
        let empty = "{{#each animals}}{{}}{{animalName}}{{/each}}";
        let offset = empty.find("animalName").unwrap();
        let found = resolve_reference(empty, offset, JUNGLE_MODEL, "Jungle", None).unwrap();
        assert_eq!(found, animal_name);

        let stray = "{{#each animals}}{{animalName}}{{/with}}";
        let found = resolve_reference(stray, 19, JUNGLE_MODEL, "Jungle", None).unwrap();
        assert_eq!(found, animal_name);

        let references = resolve_template(stray, JUNGLE_MODEL, "Jungle", None).unwrap();
        let texts: Vec<&str> = references.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["animals", "animalName"]);
    }

    #[test]
    fn test_bad_model_and_options() {
        let err = resolve_template("{{title}}", "{ not json", "Jungle", None).unwrap_err();
        assert_eq!(err.code, ERR_MODEL_JSON);

        let err = resolve_template("{{title}}", JUNGLE_MODEL, "Jungle", Some("[1]")).unwrap_err();
        assert_eq!(err.code, ERR_OPTIONS_JSON);
        assert!(err.to_string().starts_with("[HBS-CONFIG-001]"));
    }
}
