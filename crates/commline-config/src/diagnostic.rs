// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich config diagnostics.
//!
//! Maps Figment deserialization failures onto miette diagnostics: each
//! unknown key is pinpointed in the TOML file it came from, listed against
//! the section's valid keys, and paired with a Jaro-Winkler "did you mean?"
//! suggestion when a close match exists.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity floor below which no correction is offered. 0.75 catches
/// common typos like `pol_interval_ms` -> `poll_interval_ms` while
/// filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
///
/// Each variant carries enough context for miette to render an Elm-style
/// error message with source spans, suggestions, and valid key listings.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(commline::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction via fuzzy matching, if any.
        suggestion: Option<String>,
        /// List of valid keys for the section.
        valid_keys: String,
        /// Source span for the offending key.
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        /// The source file content for context display.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(
        code(commline::config::invalid_type),
        help("expected {expected}")
    )]
    InvalidType {
        /// The key with the wrong type.
        key: String,
        /// Description of the type mismatch.
        detail: String,
        /// What type was expected.
        expected: String,
        /// Source span for the offending value.
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        /// The source file content.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(commline::config::missing_key),
        help("add `{key} = <value>` to your commline.toml")
    )]
    MissingKey {
        /// The missing key name.
        key: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(commline::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(commline::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may bundle several failures) into one
/// `ConfigError` per failure, attributing spans through the loaded TOML
/// sources where possible.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let index = SpanIndex {
        sources: toml_sources,
    };
    err.into_iter().map(|e| classify(e, &index)).collect()
}

fn classify(error: figment::error::Error, index: &SpanIndex<'_>) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let valid_keys: Vec<&str> = expected.to_vec();
            let suggestion = suggest_key(field, &valid_keys);
            let location = index.locate(&error, field);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion,
                valid_keys: valid_keys.join(", "),
                span: location.as_ref().map(|l| l.span),
                src: location.map(|l| l.src),
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted_path(&error),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
            span: None,
            src: None,
        },
        _ => ConfigError::Other(format!("{error}")),
    }
}

/// The error's path rendered as `section.key`.
fn dotted_path(error: &figment::error::Error) -> String {
    error
        .path
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// A resolved source location: the span of the offending key plus the file
/// it appears in, ready for miette's `#[label]` / `#[source_code]` pair.
struct SpanLocation {
    span: SourceSpan,
    src: NamedSource<String>,
}

/// Looks up error locations across the TOML files the figment was built
/// from.
struct SpanIndex<'a> {
    sources: &'a [(String, String)],
}

impl SpanIndex<'_> {
    /// Resolve the span of `key` for this error, using the error's figment
    /// metadata to pick the file and its path to pick the section.
    fn locate(&self, error: &figment::error::Error, key: &str) -> Option<SpanLocation> {
        let path = error.metadata.as_ref().and_then(|m| {
            m.source.as_ref().and_then(|s| match s {
                figment::Source::File(p) => Some(p.display().to_string()),
                _ => None,
            })
        })?;
        let (name, content) = self.sources.iter().find(|(p, _)| p == &path)?;

        let section = error.path.first().map(|s| s.to_string());
        let offset = key_offset(content, section.as_deref(), key)?;
        Some(SpanLocation {
            span: SourceSpan::new(offset.into(), key.len()),
            src: NamedSource::new(name, content.clone()),
        })
    }
}

/// Byte offset of `key` within its TOML section.
///
/// `section` of `Some("call")` restricts the search to the lines between
/// the `[call]` header and the next header; `None` means top-level keys,
/// i.e. everything before the first header. Only a key at the start of a
/// line (followed by `=` or whitespace) counts, so values and comments
/// that mention the key are skipped.
pub fn key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let (start, end) = section_bounds(content, section)?;
    let mut cursor = start;
    for line in content[start..end].lines() {
        let name = line.trim_start();
        let indent = line.len() - name.len();
        if let Some(rest) = name.strip_prefix(key) {
            if rest.trim_start().starts_with('=') || rest.is_empty() {
                return Some(cursor + indent);
            }
        }
        cursor += line.len() + 1;
    }
    None
}

/// Byte range of a section's body: from just after its `[header]` up to the
/// next section header (or end of input). `None` for the section means the
/// top-level body before the first header.
fn section_bounds(content: &str, section: Option<&str>) -> Option<(usize, usize)> {
    let start = match section {
        None => 0,
        Some(name) => {
            let header = format!("[{name}]");
            content.find(&header)? + header.len()
        }
    };
    let end = content[start..]
        .find("\n[")
        .map_or(content.len(), |rel| start + rel + 1);
    Some((start, end))
}

/// Suggest the closest valid key by Jaro-Winkler similarity, or `None`
/// when nothing clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
