//! End-to-end checks over the JSON fixtures in `tests/fixtures`.

use intentlint::grammar::LanguageSources;
use intentlint::{
    lint_language, parse_intent_schemas, parse_sentence_file, LintConfig, LintError,
    ValidationErrorKind, Validator,
};

const INTENTS: &str = include_str!("fixtures/intents.json");
const NL_COMMON: &str = include_str!("fixtures/nl/_common.json");
const NL_TURN_ON: &str = include_str!("fixtures/nl/homeassistant_HassTurnOn.json");
const NL_LIGHT_SET: &str = include_str!("fixtures/nl/light_HassLightSet.json");

fn nl_sources() -> LanguageSources {
    let mut sources = LanguageSources::new("nl");
    sources.insert_json("_common.json", NL_COMMON).unwrap();
    sources
        .insert_json("homeassistant_HassTurnOn.json", NL_TURN_ON)
        .unwrap();
    sources
        .insert_json("light_HassLightSet.json", NL_LIGHT_SET)
        .unwrap();
    sources
}

fn lint_config() -> LintConfig {
    LintConfig::default().with_common_file("_common.json")
}

#[test]
fn test_fixture_language_lints_clean() {
    assert_eq!(lint_language(&nl_sources(), &lint_config()), Ok(()));
}

#[test]
fn test_fixture_language_validates() {
    let schemas = parse_intent_schemas(INTENTS).unwrap();
    let validator = Validator::new(nl_sources().grammar(), schemas);

    let report = validator.validate_language().unwrap();
    assert_eq!(report.intents, 2);
    assert_eq!(report.sentences, 5);
    assert!(validator.check_all().is_empty());
}

#[test]
fn test_fixture_sentence_slots() {
    let schemas = parse_intent_schemas(INTENTS).unwrap();
    let validator = Validator::new(nl_sources().grammar(), schemas);
    let intent = &validator.grammar().intents["HassLightSet"];

    let found: Vec<Vec<String>> = intent
        .sentences()
        .map(|sentence| {
            validator
                .validate_sentence(sentence, "HassLightSet")
                .unwrap()
                .into_iter()
                .collect()
        })
        .collect();

    assert_eq!(
        found,
        vec![
            vec!["color".to_string(), "name".to_string()],
            vec!["brightness".to_string(), "name".to_string()],
            vec!["area".to_string(), "color".to_string()],
        ]
    );
}

#[test]
fn test_sentence_with_broken_rule_fails_whole_language() {
    let mut sources = nl_sources();
    sources
        .insert_json(
            "light_HassTurnOn_extra.json",
            r#"{
                "language": "nl",
                "intents": {
                    "HassTurnOn": {
                        "data": [{
                            "sentences": [{
                                "text": "doe <lamp> aan",
                                "expression": {
                                    "type": "GROUP",
                                    "items": [
                                        {"type": "TEXT", "text": "doe "},
                                        {"type": "RULE", "rule_name": "lamp"},
                                        {"type": "TEXT", "text": " aan"}
                                    ]
                                }
                            }]
                        }]
                    }
                }
            }"#,
        )
        .unwrap();

    let schemas = parse_intent_schemas(INTENTS).unwrap();
    let validator = Validator::new(sources.grammar(), schemas);

    let err = validator.validate_language().unwrap_err();
    assert_eq!(
        err.kind,
        ValidationErrorKind::UnknownRule {
            rule_name: "lamp".into()
        }
    );
    assert_eq!(err.intent, "HassTurnOn");
    assert_eq!(err.sentence.as_deref(), Some("doe <lamp> aan"));
    assert_eq!(validator.check_all().len(), 1);
}

#[test]
fn test_recursive_common_rule_is_reported() {
    let mut sources = LanguageSources::new("nl");
    sources
        .insert_json(
            "_common.json",
            r#"{
                "language": "nl",
                "expansion_rules": {
                    "name": {
                        "type": "ALTERNATIVE",
                        "items": [
                            {"type": "LIST", "list_name": "name"},
                            {"type": "RULE", "rule_name": "naam"}
                        ]
                    },
                    "naam": {"type": "RULE", "rule_name": "name"}
                }
            }"#,
        )
        .unwrap();
    sources.insert_json("homeassistant_HassTurnOn.json", NL_TURN_ON).unwrap();

    let schemas = parse_intent_schemas(INTENTS).unwrap();
    let validator = Validator::new(sources.grammar(), schemas);

    assert_eq!(
        validator.validate_language().unwrap_err().kind,
        ValidationErrorKind::RecursiveRule {
            rule_name: "name".into()
        }
    );
}

#[test]
fn test_common_file_with_intents_fails_lint() {
    let mut common = parse_sentence_file(NL_COMMON).unwrap();
    common.intents = parse_sentence_file(NL_TURN_ON).unwrap().intents;

    let mut sources = LanguageSources::new("nl");
    sources.insert("_common.json", common).unwrap();

    assert_eq!(
        lint_language(&sources, &lint_config()),
        Err(LintError::IntentsInCommonFile {
            file: "_common.json".into()
        })
    );
}

const MIXED_COLORS: &str = r#"{
    "language": "LANG",
    "lists": {
        "color": {"values": ["red", {"in": "rood", "out": "red"}]}
    }
}"#;

fn mixed_color_sources(language: &str) -> LanguageSources {
    let mut sources = LanguageSources::new(language);
    sources
        .insert_json("_common.json", &MIXED_COLORS.replace("LANG", language))
        .unwrap();
    sources
}

#[test]
fn test_mixed_color_list_fails_lint_on_plain_value() {
    assert_eq!(
        lint_language(&mixed_color_sources("nl"), &lint_config()),
        Err(LintError::PlainListValue {
            list: "color".into(),
            value: "red".into(),
            source_language: "en".into(),
        })
    );
}

#[test]
fn test_mixed_color_list_loads_in_source_language() {
    let sources = mixed_color_sources("en");
    assert_eq!(lint_language(&sources, &lint_config()), Ok(()));

    let grammar = sources.grammar();
    let values: Vec<(&str, &str, bool)> = grammar.slot_lists["color"]
        .values
        .iter()
        .map(|value| (value.text_in(), value.value_out(), value.is_in_out()))
        .collect();
    assert_eq!(values, vec![("red", "red", false), ("rood", "red", true)]);
}
