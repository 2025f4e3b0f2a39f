//! Layout checks over the source files of one language.
//!
//! These run before the files are merged: every language keeps its shared
//! lists and rules in a single common file, that file holds no intents, and
//! translated languages map certain list values back to the source language
//! with in/out pairs.

use crate::config::LintConfig;
use crate::grammar::LanguageSources;

/// A layout problem in a language's source files.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LintError {
    /// The files starting with `_` are not exactly the common file.
    #[error("only {expected} is allowed as common file, found [{}]", .found.join(", "))]
    UnexpectedCommonFiles {
        /// The configured common file name.
        expected: String,
        /// Files starting with `_`, sorted.
        found: Vec<String>,
    },

    /// A list that must translate its values has a plain value.
    #[error(
        "{list} list should use the in/out format to output {source_language} values, \
         found plain value '{value}'"
    )]
    PlainListValue {
        /// The list name.
        list: String,
        /// The offending value.
        value: String,
        /// The language values must map to.
        source_language: String,
    },

    /// The common file declares intents.
    #[error("{file} is a common file and should not contain intents")]
    IntentsInCommonFile {
        /// The common file name.
        file: String,
    },
}

/// Check the file layout of one language.
///
/// # Errors
///
/// Returns the first [`LintError`] found. The source language is only
/// checked for its common file name.
pub fn lint_language(sources: &LanguageSources, config: &LintConfig) -> Result<(), LintError> {
    let common_files: Vec<&str> = sources
        .files()
        .keys()
        .map(String::as_str)
        .filter(|name| name.starts_with('_'))
        .collect();

    if common_files != [config.common_file.as_str()] {
        return Err(LintError::UnexpectedCommonFiles {
            expected: config.common_file.clone(),
            found: common_files.into_iter().map(str::to_string).collect(),
        });
    }

    if sources.language() == config.source_language {
        return Ok(());
    }

    let Some(common) = sources.files().get(&config.common_file) else {
        return Ok(());
    };

    for list_name in &config.in_out_lists {
        let Some(list) = common.lists.get(list_name) else {
            continue;
        };
        if let Some(plain) = list.values.iter().find(|value| !value.is_in_out()) {
            return Err(LintError::PlainListValue {
                list: list_name.clone(),
                value: plain.text_in().to_string(),
                source_language: config.source_language.clone(),
            });
        }
    }

    if common.intents.is_some() {
        return Err(LintError::IntentsInCommonFile {
            file: config.common_file.clone(),
        });
    }

    tracing::debug!(language = sources.language(), "language sources pass layout checks");
    Ok(())
}
