//! Line filters.
//!
//! A [`Filter`] is a named regular expression paired with a [`FilterKind`]
//! that decides what happens to the lines it matches:
//!
//! - [`FilterKind::Remove`] drops every line the pattern matches (block-list)
//! - [`FilterKind::Keep`] drops every line the pattern does *not* match (allow-list)
//!
//! Matching uses "contains a match anywhere" semantics, so anchored behavior
//! needs an explicit `^` or `$` in the pattern.
//!
//! # Examples
//!
//! ```
//! use logtidy::filter::{Filter, FilterKind};
//!
//! let filter = Filter::new("drop-errors", "^ERROR", FilterKind::Remove).unwrap();
//! assert!(filter.matches("ERROR: disk full"));
//! assert!(!filter.matches("INFO: ERROR mentioned mid-line"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors raised while building or loading a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter name was empty.
    #[error("filter name cannot be empty")]
    EmptyName,
    /// The filter pattern was empty.
    #[error("filter pattern cannot be empty")]
    EmptyPattern,
    /// The pattern failed to compile as a regular expression.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// The disposition was neither `remove` nor `keep`.
    #[error("invalid filter type '{0}': must be 'remove' or 'keep'")]
    InvalidKind(String),
}

/// What a filter does with the lines it is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Drop lines that match.
    Remove,
    /// Drop lines that do not match.
    Keep,
}

impl FilterKind {
    /// Returns the persisted name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Remove => "remove",
            FilterKind::Keep => "keep",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remove" => Ok(FilterKind::Remove),
            "keep" => Ok(FilterKind::Keep),
            other => Err(FilterError::InvalidKind(other.to_string())),
        }
    }
}

/// A named, compiled line predicate.
///
/// The compiled matcher is built in [`Filter::new`] and on deserialization,
/// so a `Filter` value always holds a regex that compiled from its pattern.
/// Fields are private to keep the pattern and matcher in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FilterRecord", into = "FilterRecord")]
pub struct Filter {
    name: String,
    pattern: String,
    kind: FilterKind,
    regex: Regex,
}

impl Filter {
    /// Builds a filter, compiling `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyName`] or [`FilterError::EmptyPattern`] for
    /// empty inputs and [`FilterError::InvalidPattern`] if the regex does not
    /// compile.
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        kind: FilterKind,
    ) -> Result<Self, FilterError> {
        let name = name.into();
        let pattern = pattern.into();

        if name.is_empty() {
            return Err(FilterError::EmptyName);
        }
        if pattern.is_empty() {
            return Err(FilterError::EmptyPattern);
        }

        let regex = Regex::new(&pattern).map_err(|e| FilterError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        debug!(name = %name, pattern = %pattern, kind = %kind, "compiled filter");

        Ok(Self {
            name,
            pattern,
            kind,
            regex,
        })
    }

    /// Builds a filter from a textual disposition (`"remove"` or `"keep"`).
    ///
    /// # Errors
    ///
    /// Same as [`Filter::new`], plus [`FilterError::InvalidKind`] for an
    /// unrecognized disposition.
    pub fn parse(name: &str, pattern: &str, kind: &str) -> Result<Self, FilterError> {
        let kind = kind.parse::<FilterKind>()?;
        Self::new(name, pattern, kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Returns true if the pattern matches anywhere in `line`.
    pub fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Returns true if this filter alone would let `line` through.
    pub fn admits(&self, line: &str) -> bool {
        match self.kind {
            FilterKind::Remove => !self.matches(line),
            FilterKind::Keep => self.matches(line),
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pattern == other.pattern && self.kind == other.kind
    }
}

impl Eq for Filter {}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] /{}/", self.name, self.kind, self.pattern)
    }
}

/// Persisted form of a filter: `{ "name", "pattern", "type" }`.
///
/// `type` is kept as a raw string so an unknown value surfaces as
/// [`FilterError::InvalidKind`] rather than a generic serde error.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilterRecord {
    name: String,
    pattern: String,
    #[serde(rename = "type")]
    kind: String,
}

impl TryFrom<FilterRecord> for Filter {
    type Error = FilterError;

    fn try_from(record: FilterRecord) -> Result<Self, Self::Error> {
        Filter::parse(&record.name, &record.pattern, &record.kind)
    }
}

impl From<Filter> for FilterRecord {
    fn from(filter: Filter) -> Self {
        Self {
            name: filter.name,
            pattern: filter.pattern,
            kind: filter.kind.as_str().to_string(),
        }
    }
}
