//! The durable album record and its validation step
//!
//! Extraction produces a loosely-populated [`RecordDraft`]. The only way to
//! obtain a [`Record`] is [`RecordDraft::validate`], which cleans every text
//! field and either returns a complete record or a [`Rejection`] saying why
//! the page could not be used.

mod clean;

pub use clean::{dedup_styles, normalize_whitespace};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest rating a page can carry (six stars)
pub const MAX_RATING: f64 = 6.0;

/// A validated album record, keyed by `source_key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub artist: String,
    pub description: String,
    /// Ordered, duplicate-free style names
    pub styles: Vec<String>,
    pub rating_review: Option<f64>,
    pub rating_average: Option<f64>,
    pub tags: String,
    pub source_key: String,
}

/// Reasons a page is turned away before it becomes a [`Record`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("missing title")]
    MissingTitle,

    #[error("missing artist")]
    MissingArtist,

    #[error("missing source key")]
    MissingSourceKey,

    #[error("{field} rating {value} is outside 0..=6 in half steps")]
    InvalidRating { field: &'static str, value: f64 },

    #[error("description has {len} characters, {min} required")]
    DescriptionTooShort { len: usize, min: usize },
}

/// Raw extraction output; any field may be missing or untrimmed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub description: String,
    pub styles: Vec<String>,
    pub rating_review: Option<f64>,
    pub rating_average: Option<f64>,
    pub tags: String,
    pub source_key: String,
}

impl RecordDraft {
    pub fn new(source_key: impl Into<String>) -> Self {
        Self {
            source_key: source_key.into(),
            ..Self::default()
        }
    }

    /// Cleans the draft and checks the record invariants
    ///
    /// Title and artist must be non-empty after whitespace normalization,
    /// the source key must be non-empty, and ratings must lie in `[0, 6]`
    /// on a 0.5 grid.
    pub fn validate(self) -> Result<Record, Rejection> {
        let title = self
            .title
            .as_deref()
            .map(normalize_whitespace)
            .unwrap_or_default();
        if title.is_empty() {
            return Err(Rejection::MissingTitle);
        }

        let artist = self
            .artist
            .as_deref()
            .map(normalize_whitespace)
            .unwrap_or_default();
        if artist.is_empty() {
            return Err(Rejection::MissingArtist);
        }

        let source_key = self.source_key.trim().to_string();
        if source_key.is_empty() {
            return Err(Rejection::MissingSourceKey);
        }

        let rating_review = check_rating("review", self.rating_review)?;
        let rating_average = check_rating("average", self.rating_average)?;

        Ok(Record {
            title,
            artist,
            description: normalize_whitespace(&self.description),
            styles: dedup_styles(self.styles),
            rating_review,
            rating_average,
            tags: normalize_whitespace(&self.tags),
            source_key,
        })
    }
}

/// Checks that a rating sits in `[0, MAX_RATING]` on a 0.5 grid
pub fn is_valid_rating(value: f64) -> bool {
    (0.0..=MAX_RATING).contains(&value) && (value * 2.0).fract() == 0.0
}

fn check_rating(field: &'static str, value: Option<f64>) -> Result<Option<f64>, Rejection> {
    match value {
        Some(v) if !is_valid_rating(v) => Err(Rejection::InvalidRating { field, value: v }),
        other => Ok(other),
    }
}
