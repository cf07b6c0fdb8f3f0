//! Identifier-to-URL mapping

use crate::source::SourceIdentifier;
use crate::SourceError;
use url::Url;

/// Placeholder replaced by the identifier when rendering a template
pub const ID_PLACEHOLDER: &str = "{id}";

/// A fixed URL template such as `https://host/objet.php?objet={id}`
///
/// Templates without the `{id}` placeholder get the identifier appended,
/// so `https://host/objet.php?objet=` is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Parses a template and checks that it renders an absolute http(s) URL
    pub fn parse(template: &str) -> Result<Self, SourceError> {
        let candidate = Self {
            template: template.trim().to_string(),
        };

        let sample = candidate.render(SourceIdentifier::new(0));
        let url = Url::parse(&sample).map_err(|e| SourceError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SourceError::InvalidTemplate {
                template: template.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(candidate)
    }

    /// Renders the URL for one identifier
    ///
    /// The rendered URL doubles as the record's `source_key`.
    pub fn render(&self, id: SourceIdentifier) -> String {
        if self.template.contains(ID_PLACEHOLDER) {
            self.template.replace(ID_PLACEHOLDER, &id.to_string())
        } else {
            format!("{}{}", self.template, id)
        }
    }

    /// The template as configured, without surrounding whitespace
    pub fn as_str(&self) -> &str {
        &self.template
    }
}
