//! Source identifiers and the range generator
//!
//! Every remote album page is addressed by a numeric identifier. A run covers
//! a half-open range `[start, end)` of identifiers, and each identifier maps to
//! exactly one URL through a [`UrlTemplate`].

mod template;

pub use template::{UrlTemplate, ID_PLACEHOLDER};

use crate::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest identifier a range may reach
///
/// Range bounds are stored in the ledger as SQLite integers, which are
/// signed 64-bit.
pub const MAX_IDENTIFIER: u64 = i64::MAX as u64;

/// Identifier of a single remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentifier(u64);

impl SourceIdentifier {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SourceIdentifier {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A half-open range of identifiers, `[start, end)`
///
/// The range itself holds no iteration state: every call to [`iter`] starts
/// again from `start`, so the sequence can be replayed as often as needed.
///
/// [`iter`]: IdentifierRange::iter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierRange {
    start: u64,
    end: u64,
}

impl IdentifierRange {
    /// Creates a range, rejecting `start >= end`
    ///
    /// # Example
    ///
    /// ```
    /// use album_harvest::source::IdentifierRange;
    ///
    /// let range = IdentifierRange::new(100, 103).unwrap();
    /// let ids: Vec<u64> = range.iter().map(|id| id.value()).collect();
    /// assert_eq!(ids, vec![100, 101, 102]);
    /// ```
    pub fn new(start: u64, end: u64) -> Result<Self, SourceError> {
        if start >= end {
            return Err(SourceError::EmptyRange { start, end });
        }
        if end > MAX_IDENTIFIER {
            return Err(SourceError::IdentifierTooLarge {
                value: end,
                max: MAX_IDENTIFIER,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of identifiers in the range
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily yields every identifier in ascending order
    pub fn iter(&self) -> impl Iterator<Item = SourceIdentifier> {
        (self.start..self.end).map(SourceIdentifier)
    }
}

impl IntoIterator for IdentifierRange {
    type Item = SourceIdentifier;
    type IntoIter = std::iter::Map<std::ops::Range<u64>, fn(u64) -> SourceIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        (self.start..self.end).map(SourceIdentifier as fn(u64) -> SourceIdentifier)
    }
}

impl fmt::Display for IdentifierRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
