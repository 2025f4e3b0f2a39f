//! Per-language grammar sources and the merged grammar registry.
//!
//! Sentence files are loaded from JSON with [`facet_json`]. Each file carries
//! some intents, value lists and expansion rules for one language;
//! [`LanguageSources`] collects the files of a language and
//! [`LanguageSources::grammar`] merges them into a [`LanguageGrammar`], the
//! read-only registry the validator resolves references against.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use facet::Facet;

pub mod expression;

pub use expression::{
    parse_expression, Expression, Flatten, ListReference, RuleReference, Sentence, Sequence,
    SequenceKind,
};

use expression::{RawExpression, RawSentence};

/// Possible errors raised while loading grammar sources.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// An expression node lacks the payload its type requires.
    #[error("malformed {node_type} expression: missing `{field}`")]
    MalformedExpression {
        /// Wire name of the node type.
        node_type: &'static str,
        /// The missing field.
        field: &'static str,
    },

    /// A list value object lacks one of its `in`/`out` keys.
    #[error("malformed value in list '{list}': missing `{field}`")]
    MalformedListValue {
        /// The list name.
        list: String,
        /// The missing key.
        field: &'static str,
    },

    /// A source file belongs to a different language than its siblings.
    #[error("file '{file}' declares language '{found}', expected '{expected}'")]
    LanguageMismatch {
        /// Name of the offending file.
        file: String,
        /// The language being assembled.
        expected: String,
        /// The language the file declares.
        found: String,
    },
}

/// A named enumeration of values a list reference can match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotList {
    /// Text values, either plain or in/out pairs.
    pub values: Vec<ListValue>,

    /// Numeric range matched instead of (or as well as) text values.
    pub range: Option<RangeList>,

    /// Whether the list matches arbitrary text.
    pub wildcard: bool,
}

/// One value of a [`SlotList`].
///
/// In the sources a plain value is a bare string and an in/out value is an
/// object, e.g. `{"in": "rood", "out": "red"}` in Dutch producing `red`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListValue {
    /// Spoken text that is also the slot value.
    Plain(String),

    /// Spoken text mapped to a different slot value.
    InOut {
        /// The text that is spoken or typed.
        value_in: String,
        /// The value placed in the slot.
        value_out: String,
    },
}

/// An inclusive numeric range list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
pub struct RangeList {
    /// First value.
    pub from: i64,

    /// Last value.
    pub to: i64,

    /// Increment between values, 1 when absent.
    #[facet(default)]
    pub step: Option<i64>,
}

impl SlotList {
    /// A list with no values, used for lists the host fills at runtime.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// A list of plain text values.
    #[must_use]
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(ListValue::plain).collect(),
            ..Self::default()
        }
    }
}

impl ListValue {
    /// A value whose spoken text is also its slot value.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self::Plain(value.into())
    }

    /// A value whose spoken text maps to a different slot value.
    #[must_use]
    pub fn in_out(value_in: impl Into<String>, value_out: impl Into<String>) -> Self {
        Self::InOut {
            value_in: value_in.into(),
            value_out: value_out.into(),
        }
    }

    /// Returns `true` if this value uses the in/out form.
    #[must_use]
    pub fn is_in_out(&self) -> bool {
        matches!(self, Self::InOut { .. })
    }

    /// The spoken text.
    #[must_use]
    pub fn text_in(&self) -> &str {
        match self {
            Self::Plain(text) | Self::InOut { value_in: text, .. } => text,
        }
    }

    /// The value placed in the slot.
    #[must_use]
    pub fn value_out(&self) -> &str {
        match self {
            Self::Plain(text) | Self::InOut { value_out: text, .. } => text,
        }
    }
}

/// Wire key that bare string values are wrapped under before parsing.
const PLAIN_VALUE_KEY: &str = "$plain";

#[derive(Debug, Clone, Facet)]
struct RawSlotList {
    #[facet(default)]
    values: Vec<RawListValue>,
    #[facet(default)]
    range: Option<RangeList>,
    #[facet(default)]
    wildcard: bool,
}

#[derive(Debug, Clone, Facet)]
struct RawListValue {
    #[facet(rename = "$plain")]
    #[facet(default)]
    plain: Option<String>,
    #[facet(rename = "in")]
    #[facet(default)]
    value_in: Option<String>,
    #[facet(rename = "out")]
    #[facet(default)]
    value_out: Option<String>,
}

impl RawSlotList {
    fn into_slot_list(self, list: &str) -> Result<SlotList, GrammarError> {
        let values = self
            .values
            .into_iter()
            .map(|value| match value {
                RawListValue { plain: Some(text), .. } => Ok(ListValue::Plain(text)),
                RawListValue {
                    value_in: Some(value_in),
                    value_out: Some(value_out),
                    ..
                } => Ok(ListValue::InOut {
                    value_in,
                    value_out,
                }),
                RawListValue { value_in, .. } => Err(GrammarError::MalformedListValue {
                    list: list.to_string(),
                    field: if value_in.is_none() { "in" } else { "out" },
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SlotList {
            values,
            range: self.range,
            wildcard: self.wildcard,
        })
    }
}

/// Rewrite the bare strings of every `"values"` array as `{"$plain": ...}`
/// objects so plain and in/out values share one wire shape.
///
/// Everything else is copied untouched, including malformed input, which is
/// left for the parser to report.
fn wrap_plain_list_values(json: &str) -> Cow<'_, str> {
    enum Frame<'a> {
        Object { key: Option<&'a str>, in_key: bool },
        Array { wrap: bool },
    }

    let bytes = json.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = string_end(bytes, i);
                match stack.last_mut() {
                    Some(Frame::Object { key, in_key: true }) => *key = Some(&json[i..end]),
                    Some(Frame::Array { wrap: true }) => {
                        out.push_str(&json[copied..i]);
                        out.push_str("{\"");
                        out.push_str(PLAIN_VALUE_KEY);
                        out.push_str("\":");
                        out.push_str(&json[i..end]);
                        out.push('}');
                        copied = end;
                    }
                    _ => {}
                }
                i = end;
                continue;
            }
            b'{' => stack.push(Frame::Object {
                key: None,
                in_key: true,
            }),
            b'[' => {
                let wrap = matches!(
                    stack.last(),
                    Some(Frame::Object { key: Some("\"values\""), in_key: false })
                );
                stack.push(Frame::Array { wrap });
            }
            b'}' | b']' => {
                stack.pop();
            }
            b':' => {
                if let Some(Frame::Object { in_key, .. }) = stack.last_mut() {
                    *in_key = false;
                }
            }
            b',' => {
                if let Some(Frame::Object { key, in_key }) = stack.last_mut() {
                    *key = None;
                    *in_key = true;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if copied == 0 {
        return Cow::Borrowed(json);
    }
    out.push_str(&json[copied..]);
    Cow::Owned(out)
}

/// Index just past the string token opening at `start`, or the input length
/// if it is unterminated.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'"' => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// The sentences declared for one intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
    /// Blocks of sentences, one per `data` entry in the sources.
    pub data: Vec<IntentData>,
}

/// A block of sentences sharing the same intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentData {
    /// The parsed sentence templates.
    pub sentences: Vec<Sentence>,
}

impl Intent {
    /// Iterates every sentence across all data blocks.
    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> + '_ {
        self.data.iter().flat_map(|data| data.sentences.iter())
    }
}

/// One parsed per-language source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceFile {
    /// Language code the file belongs to, e.g. `"nl"`.
    pub language: String,

    /// Intents declared in the file, `None` when the key is absent.
    pub intents: Option<HashMap<String, Intent>>,

    /// Value lists declared in the file.
    pub lists: HashMap<String, SlotList>,

    /// Expansion rules declared in the file.
    pub expansion_rules: HashMap<String, Expression>,
}

#[derive(Debug, Clone, Facet)]
struct RawSentenceFile {
    language: String,
    #[facet(default)]
    intents: Option<HashMap<String, RawIntent>>,
    #[facet(default)]
    lists: HashMap<String, RawSlotList>,
    #[facet(default)]
    expansion_rules: HashMap<String, RawExpression>,
}

#[derive(Debug, Clone, Facet)]
struct RawIntent {
    #[facet(default)]
    data: Vec<RawIntentData>,
}

#[derive(Debug, Clone, Facet)]
struct RawIntentData {
    #[facet(default)]
    sentences: Vec<RawSentence>,
}

impl TryFrom<RawIntent> for Intent {
    type Error = GrammarError;

    fn try_from(raw: RawIntent) -> Result<Self, Self::Error> {
        let data = raw
            .data
            .into_iter()
            .map(|block| {
                let sentences = block
                    .sentences
                    .into_iter()
                    .map(Sentence::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(IntentData { sentences })
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;
        Ok(Intent { data })
    }
}

impl TryFrom<RawSentenceFile> for SentenceFile {
    type Error = GrammarError;

    fn try_from(raw: RawSentenceFile) -> Result<Self, Self::Error> {
        let intents = raw
            .intents
            .map(|intents| {
                intents
                    .into_iter()
                    .map(|(name, intent)| Ok((name, Intent::try_from(intent)?)))
                    .collect::<Result<HashMap<_, _>, GrammarError>>()
            })
            .transpose()?;

        let lists = raw
            .lists
            .into_iter()
            .map(|(name, list)| {
                let list = list.into_slot_list(&name)?;
                Ok((name, list))
            })
            .collect::<Result<HashMap<_, _>, GrammarError>>()?;

        let expansion_rules = raw
            .expansion_rules
            .into_iter()
            .map(|(name, body)| Ok((name, Expression::try_from(body)?)))
            .collect::<Result<HashMap<_, _>, GrammarError>>()?;

        Ok(SentenceFile {
            language: raw.language,
            intents,
            lists,
            expansion_rules,
        })
    }
}

/// Parse one JSON sentence file.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the input is not valid JSON or does
/// not fit the sentence file format, [`GrammarError::MalformedExpression`]
/// if any template or rule body contains an incomplete node, and
/// [`GrammarError::MalformedListValue`] if a list value object is incomplete.
pub fn parse_sentence_file(json: &str) -> Result<SentenceFile, GrammarError> {
    let json = wrap_plain_list_values(json);
    let raw: RawSentenceFile =
        facet_json::from_str(&json).map_err(|e| GrammarError::JsonParse(e.to_string()))?;
    SentenceFile::try_from(raw)
}

/// All source files of one language, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct LanguageSources {
    language: String,
    files: BTreeMap<String, SentenceFile>,
}

impl LanguageSources {
    /// An empty collection for `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            files: BTreeMap::new(),
        }
    }

    /// The language code.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Files keyed by name, in name order.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, SentenceFile> {
        &self.files
    }

    /// Add a parsed file under `name`, replacing any file of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::LanguageMismatch`] if the file declares another
    /// language.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        file: SentenceFile,
    ) -> Result<(), GrammarError> {
        let name = name.into();
        if file.language != self.language {
            return Err(GrammarError::LanguageMismatch {
                file: name,
                expected: self.language.clone(),
                found: file.language,
            });
        }
        self.files.insert(name, file);
        Ok(())
    }

    /// Parse `json` and add it under `name`.
    ///
    /// # Errors
    ///
    /// Propagates [`parse_sentence_file`] and [`LanguageSources::insert`] errors.
    pub fn insert_json(&mut self, name: impl Into<String>, json: &str) -> Result<(), GrammarError> {
        let file = parse_sentence_file(json)?;
        self.insert(name, file)
    }

    /// Merge every file into one registry.
    ///
    /// Files are merged in name order. Sentence blocks of the same intent are
    /// appended; a list or rule defined again in a later file replaces the
    /// earlier definition.
    #[must_use]
    pub fn grammar(&self) -> LanguageGrammar {
        let mut grammar = LanguageGrammar::new(self.language.clone());

        for (file_name, file) in &self.files {
            for (name, list) in &file.lists {
                if grammar.slot_lists.insert(name.clone(), list.clone()).is_some() {
                    tracing::warn!(
                        language = %self.language,
                        file = %file_name,
                        list = %name,
                        "value list redefined, later definition wins"
                    );
                }
            }

            for (name, body) in &file.expansion_rules {
                if grammar.expansion_rules.insert(name.clone(), body.clone()).is_some() {
                    tracing::warn!(
                        language = %self.language,
                        file = %file_name,
                        rule = %name,
                        "expansion rule redefined, later definition wins"
                    );
                }
            }

            for (name, intent) in file.intents.iter().flatten() {
                grammar
                    .intents
                    .entry(name.clone())
                    .or_default()
                    .data
                    .extend(intent.data.iter().cloned());
            }
        }

        grammar
    }
}

/// The merged grammar of one language.
///
/// Rule and list names are unique keys. The registry is built once and only
/// read during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageGrammar {
    /// Language code.
    pub language: String,

    /// Intents and their sentences.
    pub intents: HashMap<String, Intent>,

    /// Expansion rule bodies by name.
    pub expansion_rules: HashMap<String, Expression>,

    /// Value lists by name.
    pub slot_lists: HashMap<String, SlotList>,
}

impl LanguageGrammar {
    /// An empty grammar for `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Look up an expansion rule body.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Expression> {
        self.expansion_rules.get(name)
    }

    /// Look up a value list.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&SlotList> {
        self.slot_lists.get(name)
    }

    /// Register an empty list under `name` unless one already exists.
    ///
    /// Used for lists whose values are only known to the host at runtime,
    /// such as area and entity names.
    pub fn add_placeholder_list(&mut self, name: impl Into<String>) {
        self.slot_lists.entry(name.into()).or_default();
    }

    /// Value list names, sorted.
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slot_lists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Intent names, sorted.
    #[must_use]
    pub fn intent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.intents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
