// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Figment reports a deserialization failure with the key path it failed on.
//! [`figment_to_config_errors`] turns each failure into a [`ConfigError`] that
//! points at the offending key in the TOML text it came from, with a
//! "did you mean" hint for misspelled keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Source name used for configuration passed as a TOML string.
pub(crate) const INLINE_SOURCE: &str = "<inline>";

/// Minimum Jaro-Winkler similarity for a key to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem reported at startup.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(tally::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys accepted by the table the unknown key appeared in.
        valid_keys: &'static [&'static str],
        #[label("not a tally setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(tally::config::invalid_type), help("`{key}` takes {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `storage.wal_mode`.
        key: String,
        detail: String,
        expected: String,
        #[label("set here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value deserialized but failed semantic validation.
    #[error("validation error: {message}")]
    #[diagnostic(code(tally::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tally::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &[&str]) -> String {
    let valid = valid_keys.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid}"),
        None => format!("valid keys: {valid}"),
    }
}

/// Convert every failure held by a `figment::Error` into a diagnostic.
///
/// `toml_sources` pairs each TOML source name (a file path, or
/// `<inline>` for string input) with its text, for span lookup.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| to_config_error(&error, toml_sources))
        .collect()
}

fn to_config_error(error: &FigmentError, sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(key, valid_keys) => {
            let (span, src) = locate(error, sources, &error.path, key);
            ConfigError::UnknownKey {
                key: key.clone(),
                suggestion: suggest_key(key, valid_keys),
                valid_keys: *valid_keys,
                span,
                src,
            }
        }
        Kind::InvalidType(actual, expected) => {
            let (span, src) = match error.path.split_last() {
                Some((field, section)) => locate(error, sources, section, field),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Span of `key` inside `section` of the TOML text the error came from.
fn locate(
    error: &FigmentError,
    sources: &[(String, String)],
    section: &[String],
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => source_name(path),
        _ => INLINE_SOURCE.to_string(),
    };

    sources
        .iter()
        .find(|(name, _)| *name == origin)
        .and_then(|(name, content)| {
            let offset = find_key_offset(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Name a TOML file is registered under for span lookup.
pub(crate) fn source_name(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Byte offset of `key` where it is assigned inside the table named by
/// `section`. An empty `section` means the top-level table.
///
/// Offsets index into `content` as given, so `\r\n` line endings are counted.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    let (start, end) = table_bounds(content, section)?;
    let table = &content[start..end];

    table
        .match_indices(key)
        .map(|(at, _)| at)
        .find(|&at| {
            let line_start = table[..at].rfind('\n').map_or(0, |nl| nl + 1);
            let after = table[at + key.len()..].trim_start_matches([' ', '\t']);
            table[line_start..at].trim().is_empty() && after.starts_with('=')
        })
        .map(|at| start + at)
}

/// Byte range of a table body: from the end of its `[header]` to the next header.
fn table_bounds(content: &str, section: &[String]) -> Option<(usize, usize)> {
    let start = if section.is_empty() {
        0
    } else {
        let header = format!("[{}]", section.join("."));
        content
            .match_indices(&header)
            .map(|(at, _)| at)
            .find(|&at| at == 0 || content[..at].ends_with('\n'))?
            + header.len()
    };
    let end = content[start..]
        .find("\n[")
        .map_or(content.len(), |at| start + at + 1);
    Some((start, end))
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each diagnostic to stderr through miette's report handler.
pub fn render_errors(errors: Vec<ConfigError>) {
    for error in errors {
        eprintln!("{:?}", miette::Report::new(error));
    }
}
