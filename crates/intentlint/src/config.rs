//! Options for the validator and the source linter.

/// Options for [`Validator`](crate::validate::Validator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Lists the host generates at runtime. Registered as empty placeholders
    /// before validation so references to them resolve.
    pub placeholder_lists: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            placeholder_lists: vec!["area".to_string(), "name".to_string()],
        }
    }
}

impl ValidatorConfig {
    /// Replace the placeholder lists.
    #[must_use]
    pub fn with_placeholder_lists<I, S>(mut self, lists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholder_lists = lists.into_iter().map(Into::into).collect();
        self
    }
}

/// Options for [`lint_language`](crate::lint::lint_language).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintConfig {
    /// The only file name allowed to start with `_`.
    pub common_file: String,

    /// The language other languages translate from. Its lists may use plain
    /// values, and only the common-file name check applies to it.
    pub source_language: String,

    /// Lists whose values must use the in/out form outside the source
    /// language.
    pub in_out_lists: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            common_file: "_common.yaml".to_string(),
            source_language: "en".to_string(),
            in_out_lists: vec!["color".to_string()],
        }
    }
}

impl LintConfig {
    /// Replace the common file name.
    #[must_use]
    pub fn with_common_file(mut self, name: impl Into<String>) -> Self {
        self.common_file = name.into();
        self
    }

    /// Replace the source language.
    #[must_use]
    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = language.into();
        self
    }

    /// Replace the lists that must use in/out values.
    #[must_use]
    pub fn with_in_out_lists<I, S>(mut self, lists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_out_lists = lists.into_iter().map(Into::into).collect();
        self
    }
}
