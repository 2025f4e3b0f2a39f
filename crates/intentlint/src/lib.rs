//! Structural validation for template-based intent sentence grammars.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Option structs for the validator and the source linter.
pub mod config;

/// Sentence templates, value lists, expansion rules and their JSON sources.
///
/// This module defines the shapes every other stage reads: parsed expression
/// trees, the per-language source files they come from, and the merged
/// registry that references are resolved against.
pub mod grammar;

/// Layout checks over a language's source files.
pub mod lint;

/// Intent slot schemas.
pub mod schema;

/// Sentence validation against the grammar registry and intent schemas.
///
/// Validation protects the runtime matcher from grammars that reference
/// lists or rules that do not exist, expand forever, or produce slots the
/// intent cannot accept.
pub mod validate;

pub use config::{LintConfig, ValidatorConfig};
pub use grammar::{
    parse_expression, parse_sentence_file, Expression, GrammarError, LanguageGrammar,
    LanguageSources, Sentence, SlotList,
};
pub use lint::{lint_language, LintError};
pub use schema::{parse_intent_schemas, IntentSchema, SchemaError, SchemaIndex};
pub use validate::{
    validate, validate_sentence, ValidationContext, ValidationError, ValidationErrorKind,
    ValidationReport, Validator,
};
