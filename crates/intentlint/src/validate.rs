//! Structural validation of sentence templates against intent schemas.
//!
//! Every sentence is walked leaf by leaf. List references must name a known
//! list and a slot the intent declares; rule references must name a known
//! rule and are expanded in place, with the rule body checked under the same
//! slot accumulator. Once all leaves are checked, the slots the sentence can
//! fill are compared with the intent's required slots and, if declared, its
//! legal slot combinations.
//!
//! Validation is fail-fast: the first problem in a sentence is reported and
//! the rest of that sentence is not examined.

use std::collections::{BTreeSet, HashSet};

use crate::config::ValidatorConfig;
use crate::grammar::{Expression, LanguageGrammar, Sentence};
use crate::schema::{IntentSchema, SchemaIndex};

/// The specific structural problem found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationErrorKind {
    /// A list reference names a list absent from the grammar.
    #[error("missing slot list: {{{list_name}}}. Available lists: {}", .available.join(", "))]
    UnknownList {
        /// The referenced list.
        list_name: String,
        /// Lists the grammar does define, sorted.
        available: Vec<String>,
    },

    /// A list reference binds a slot the intent does not declare.
    #[error("unexpected slot '{slot_name}'")]
    UnexpectedSlot {
        /// The undeclared slot.
        slot_name: String,
    },

    /// A rule reference names a rule absent from the grammar.
    #[error("missing expansion rule: <{rule_name}>")]
    UnknownRule {
        /// The referenced rule.
        rule_name: String,
    },

    /// A rule is referenced again while already expanded for this sentence.
    #[error("recursive rule detected: <{rule_name}>")]
    RecursiveRule {
        /// The re-entered rule.
        rule_name: String,
    },

    /// A required slot is never filled by the sentence.
    #[error("missing required slot: '{slot_name}'")]
    MissingRequiredSlot {
        /// The required slot.
        slot_name: String,
    },

    /// The sentence's slots match none of the declared combinations.
    #[error("slot combination not matched: slots={{{}}}", .found.join(", "))]
    SlotCombination {
        /// Slots the sentence fills, sorted.
        found: Vec<String>,
    },

    /// The grammar has sentences for an intent with no schema.
    #[error("no schema declared for intent")]
    UnknownIntent,
}

/// A validation failure with the intent and sentence it occurred in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}, intent='{intent}'{}", sentence_suffix(.sentence.as_deref()))]
pub struct ValidationError {
    /// What went wrong.
    pub kind: ValidationErrorKind,

    /// The intent being validated.
    pub intent: String,

    /// Text of the offending sentence, when the failure belongs to one.
    pub sentence: Option<String>,
}

fn sentence_suffix(sentence: Option<&str>) -> String {
    sentence.map_or_else(String::new, |text| format!(", sentence='{text}'"))
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, intent: &str) -> Self {
        Self {
            kind,
            intent: intent.to_string(),
            sentence: None,
        }
    }

    fn in_sentence(mut self, sentence: &Sentence) -> Self {
        self.sentence = Some(sentence.text.clone());
        self
    }
}

/// Accumulators threaded through the validation of one sentence.
///
/// A context must not be reused across sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// Rules expanded so far in the current resolution chain.
    ///
    /// Names are never removed once added, so a rule reached twice from the
    /// same top-level leaf is reported as recursive even when the two uses
    /// sit in unrelated branches.
    pub visited_rules: HashSet<String>,

    /// Slots the sentence fills so far.
    pub found_slots: BTreeSet<String>,
}

impl ValidationContext {
    /// A fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Check one expression and, through rule references, everything it expands to.
///
/// Sequences are flattened and each leaf checked in turn under the same
/// context. Found slots are added to `ctx.found_slots` and expanded rules to
/// `ctx.visited_rules`.
///
/// # Errors
///
/// Returns the first [`ValidationErrorKind::UnknownList`],
/// [`ValidationErrorKind::UnexpectedSlot`], [`ValidationErrorKind::UnknownRule`]
/// or [`ValidationErrorKind::RecursiveRule`] encountered.
pub fn validate(
    expression: &Expression,
    grammar: &LanguageGrammar,
    intent_name: &str,
    schema: &IntentSchema,
    ctx: &mut ValidationContext,
) -> Result<(), ValidationError> {
    match expression {
        Expression::Text(_) => {}

        Expression::Sequence(_) => {
            for leaf in expression.flatten() {
                validate(leaf, grammar, intent_name, schema, ctx)?;
            }
        }

        Expression::ListReference(list_ref) => {
            if grammar.list(&list_ref.list_name).is_none() {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnknownList {
                        list_name: list_ref.list_name.clone(),
                        available: grammar
                            .list_names()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    },
                    intent_name,
                ));
            }

            if !schema.has_slot(&list_ref.slot_name) {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnexpectedSlot {
                        slot_name: list_ref.slot_name.clone(),
                    },
                    intent_name,
                ));
            }

            ctx.found_slots.insert(list_ref.slot_name.clone());
        }

        Expression::RuleReference(rule_ref) => {
            let name = &rule_ref.rule_name;
            let Some(body) = grammar.rule(name) else {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnknownRule {
                        rule_name: name.clone(),
                    },
                    intent_name,
                ));
            };

            if !ctx.visited_rules.insert(name.clone()) {
                return Err(ValidationError::new(
                    ValidationErrorKind::RecursiveRule {
                        rule_name: name.clone(),
                    },
                    intent_name,
                ));
            }

            tracing::trace!(intent = intent_name, rule = %name, "expanding rule");
            for leaf in body.flatten() {
                validate(leaf, grammar, intent_name, schema, ctx)?;
            }
        }
    }

    Ok(())
}

/// Validate one sentence of `intent_name` and return the slots it fills.
///
/// Each top-level leaf starts with no expanded rules; found slots accumulate
/// across the whole sentence. After all leaves pass, every required slot must
/// have been found, and the found set must equal one of the declared slot
/// combinations if any are declared.
///
/// # Errors
///
/// Returns the first problem found, tagged with the sentence text.
pub fn validate_sentence(
    sentence: &Sentence,
    grammar: &LanguageGrammar,
    intent_name: &str,
    schema: &IntentSchema,
) -> Result<BTreeSet<String>, ValidationError> {
    let mut ctx = ValidationContext::new();

    for leaf in sentence.expression.flatten() {
        ctx.visited_rules.clear();
        validate(leaf, grammar, intent_name, schema, &mut ctx)
            .map_err(|e| e.in_sentence(sentence))?;
    }

    for slot_name in schema.required_slots() {
        if !ctx.found_slots.contains(slot_name) {
            return Err(ValidationError::new(
                ValidationErrorKind::MissingRequiredSlot {
                    slot_name: slot_name.to_string(),
                },
                intent_name,
            )
            .in_sentence(sentence));
        }
    }

    if !schema.accepts_combination(&ctx.found_slots) {
        return Err(ValidationError::new(
            ValidationErrorKind::SlotCombination {
                found: ctx.found_slots.into_iter().collect(),
            },
            intent_name,
        )
        .in_sentence(sentence));
    }

    Ok(ctx.found_slots)
}

/// Counts from a successful [`Validator::validate_language`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Intents checked.
    pub intents: usize,

    /// Sentences checked.
    pub sentences: usize,
}

/// Validates the sentences of one language against the intent schemas.
///
/// The grammar and schemas are only read once the validator is built, so a
/// validator can be shared across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    grammar: LanguageGrammar,
    schemas: SchemaIndex,
}

impl Validator {
    /// Build a validator with the default [`ValidatorConfig`].
    #[must_use]
    pub fn new(grammar: LanguageGrammar, schemas: SchemaIndex) -> Self {
        Self::with_config(grammar, schemas, &ValidatorConfig::default())
    }

    /// Build a validator, registering the configured placeholder lists.
    #[must_use]
    pub fn with_config(
        mut grammar: LanguageGrammar,
        schemas: SchemaIndex,
        config: &ValidatorConfig,
    ) -> Self {
        for name in &config.placeholder_lists {
            grammar.add_placeholder_list(name.clone());
        }
        Self { grammar, schemas }
    }

    /// The grammar being validated, placeholders included.
    #[must_use]
    pub fn grammar(&self) -> &LanguageGrammar {
        &self.grammar
    }

    /// The intent schemas.
    #[must_use]
    pub fn schemas(&self) -> &SchemaIndex {
        &self.schemas
    }

    fn schema_for(&self, intent_name: &str) -> Result<&IntentSchema, ValidationError> {
        self.schemas.get(intent_name).ok_or_else(|| {
            ValidationError::new(ValidationErrorKind::UnknownIntent, intent_name)
        })
    }

    /// Validate one sentence as belonging to `intent_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrorKind::UnknownIntent`] if the intent has no
    /// schema, otherwise the first problem [`validate_sentence`] finds.
    pub fn validate_sentence(
        &self,
        sentence: &Sentence,
        intent_name: &str,
    ) -> Result<BTreeSet<String>, ValidationError> {
        let schema = self
            .schema_for(intent_name)
            .map_err(|e| e.in_sentence(sentence))?;
        validate_sentence(sentence, &self.grammar, intent_name, schema)
    }

    /// Validate every sentence of every intent, stopping at the first error.
    ///
    /// Intents are checked in name order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate_language(&self) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::default();

        for intent_name in self.grammar.intent_names() {
            let schema = self.schema_for(intent_name)?;
            let intent = &self.grammar.intents[intent_name];
            tracing::debug!(
                language = %self.grammar.language,
                intent = intent_name,
                "validating intent"
            );

            for sentence in intent.sentences() {
                tracing::debug!(
                    intent = intent_name,
                    sentence = %sentence.text,
                    "validating sentence"
                );
                validate_sentence(sentence, &self.grammar, intent_name, schema)?;
                report.sentences += 1;
            }
            report.intents += 1;
        }

        Ok(report)
    }

    /// Validate every sentence, collecting the first error of each failing
    /// sentence instead of stopping.
    ///
    /// An intent without a schema contributes one error and its sentences are
    /// skipped. Errors are ordered by intent name, then sentence order.
    #[must_use]
    pub fn check_all(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for intent_name in self.grammar.intent_names() {
            let schema = match self.schema_for(intent_name) {
                Ok(schema) => schema,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            errors.extend(
                self.grammar.intents[intent_name]
                    .sentences()
                    .filter_map(|sentence| {
                        validate_sentence(sentence, &self.grammar, intent_name, schema).err()
                    }),
            );
        }

        if !errors.is_empty() {
            tracing::warn!(
                language = %self.grammar.language,
                errors = errors.len(),
                "grammar has invalid sentences"
            );
        }
        errors
    }
}
