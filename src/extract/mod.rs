//! Page extraction boundary
//!
//! An [`Extractor`] turns the raw body of one fetched page into a validated
//! [`Record`] or a [`Rejection`]. Extractors are pure: they never touch the
//! network or the checkpoint, which keeps them swappable per source site and
//! trivially testable.

mod guts;

pub use guts::GutsExtractor;

use crate::record::{Record, Rejection};
use crate::source::SourceIdentifier;

/// Maps page content to a record, per source site
pub trait Extractor: Send + Sync {
    /// Extracts a record from `body`
    ///
    /// # Arguments
    ///
    /// * `id` - The identifier the page was fetched for
    /// * `source_key` - The URL rendered for `id`; becomes the record key
    /// * `body` - The raw page content
    fn extract(
        &self,
        id: SourceIdentifier,
        source_key: &str,
        body: &str,
    ) -> Result<Record, Rejection>;
}
