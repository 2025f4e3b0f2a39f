//! Intent slot schemas.
//!
//! Each intent declares the slots its sentences may fill, which of those are
//! required, and optionally the exact slot sets that are legal together.

use std::collections::{BTreeSet, HashMap};

use facet::Facet;

/// Possible errors raised while loading intent schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

/// Declared information about one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct SlotInfo {
    /// Whether every sentence of the intent must fill this slot.
    #[facet(default)]
    pub required: bool,

    /// Free-form description.
    #[facet(default)]
    pub description: Option<String>,
}

/// The slot schema of one intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct IntentSchema {
    /// Free-form description.
    #[facet(default)]
    pub description: Option<String>,

    /// Slots the intent accepts, by name.
    #[facet(default)]
    pub slots: HashMap<String, SlotInfo>,

    /// Named slot sets; when present, a sentence's slots must equal one of them.
    #[facet(default)]
    pub slot_combinations: Option<HashMap<String, Vec<String>>>,
}

impl IntentSchema {
    /// Returns `true` if `slot` is declared.
    #[must_use]
    pub fn has_slot(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Required slot names, sorted.
    #[must_use]
    pub fn required_slots(&self) -> Vec<&str> {
        let mut required: Vec<&str> = self
            .slots
            .iter()
            .filter(|(_, info)| info.required)
            .map(|(name, _)| name.as_str())
            .collect();
        required.sort_unstable();
        required
    }

    /// Returns `true` if `found` is exactly one of the declared combinations,
    /// or if no combinations are declared.
    ///
    /// An empty combination map counts as undeclared.
    #[must_use]
    pub fn accepts_combination(&self, found: &BTreeSet<String>) -> bool {
        let Some(combinations) = self.slot_combinations.as_ref().filter(|c| !c.is_empty()) else {
            return true;
        };
        combinations.values().any(|combo| {
            let combo: BTreeSet<&str> = combo.iter().map(String::as_str).collect();
            combo.len() == found.len() && found.iter().all(|slot| combo.contains(slot.as_str()))
        })
    }

    /// Declare a slot.
    #[must_use]
    pub fn with_slot(mut self, name: impl Into<String>, required: bool) -> Self {
        self.slots.insert(
            name.into(),
            SlotInfo {
                required,
                description: None,
            },
        );
        self
    }

    /// Declare a legal slot combination.
    #[must_use]
    pub fn with_combination<I, S>(mut self, name: impl Into<String>, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slot_combinations
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), slots.into_iter().map(Into::into).collect());
        self
    }
}

/// Intent schemas by intent name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaIndex {
    intents: HashMap<String, IntentSchema>,
}

impl SchemaIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the schema of `intent`.
    #[must_use]
    pub fn get(&self, intent: &str) -> Option<&IntentSchema> {
        self.intents.get(intent)
    }

    /// Add or replace the schema of `intent`.
    pub fn insert(&mut self, intent: impl Into<String>, schema: IntentSchema) {
        self.intents.insert(intent.into(), schema);
    }

    /// Number of intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Returns `true` if no intent is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

impl FromIterator<(String, IntentSchema)> for SchemaIndex {
    fn from_iter<T: IntoIterator<Item = (String, IntentSchema)>>(iter: T) -> Self {
        Self {
            intents: iter.into_iter().collect(),
        }
    }
}

/// Parse a JSON map of intent name to [`IntentSchema`].
///
/// # Errors
///
/// Returns [`SchemaError::JsonParse`] if the input is not valid JSON or does
/// not fit the schema format.
pub fn parse_intent_schemas(json: &str) -> Result<SchemaIndex, SchemaError> {
    let intents: HashMap<String, IntentSchema> =
        facet_json::from_str(json).map_err(|e| SchemaError::JsonParse(e.to_string()))?;
    Ok(SchemaIndex { intents })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_intent_schemas() {
        let json = r#"{
            "HassTurnOn": {
                "description": "Turns on/opens a device or entity",
                "slots": {
                    "name": {"description": "Name of a device or entity"},
                    "area": {"description": "Name of an area"},
                    "domain": {"required": false}
                },
                "slot_combinations": {
                    "name_only": ["name"],
                    "area_name": ["area", "name"]
                }
            },
            "HassLightSet": {
                "slots": {
                    "color": {"required": true}
                }
            }
        }"#;

        let index = parse_intent_schemas(json).unwrap();
        assert_eq!(index.len(), 2);

        let turn_on = index.get("HassTurnOn").unwrap();
        assert!(turn_on.required_slots().is_empty());
        assert_eq!(turn_on.slot_combinations.as_ref().unwrap().len(), 2);

        let light_set = index.get("HassLightSet").unwrap();
        assert_eq!(light_set.required_slots(), vec!["color"]);
        assert!(light_set.slot_combinations.is_none());
    }

    #[test]
    fn test_combination_requires_exact_set() {
        let schema = IntentSchema::default()
            .with_slot("a", false)
            .with_slot("b", false)
            .with_slot("c", false)
            .with_combination("combo1", ["a", "b"])
            .with_combination("combo2", ["a"]);

        assert!(schema.accepts_combination(&slots(&["a"])));
        assert!(schema.accepts_combination(&slots(&["a", "b"])));
        assert!(!schema.accepts_combination(&slots(&["a", "c"])));
        assert!(!schema.accepts_combination(&slots(&["b"])));
        assert!(!schema.accepts_combination(&slots(&[])));
    }

    #[test]
    fn test_no_combinations_accepts_anything() {
        let schema = IntentSchema::default().with_slot("a", true);
        assert!(schema.accepts_combination(&slots(&[])));
        assert!(schema.accepts_combination(&slots(&["a", "zzz"])));

        let empty = IntentSchema {
            slot_combinations: Some(HashMap::new()),
            ..IntentSchema::default()
        };
        assert!(empty.accepts_combination(&slots(&["a"])));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_intent_schemas("[1, 2"),
            Err(SchemaError::JsonParse(_))
        ));
    }
}
