//! Extractor for Guts of Darkness album pages
//!
//! # Page layout
//!
//! | Field            | Selector                                         |
//! |------------------|--------------------------------------------------|
//! | title            | `h1 em`                                          |
//! | artist           | `h1` minus the title, else `#objetLineup p`      |
//! | description      | `div.objet-chronique p`                          |
//! | styles           | `div.objet-style a`                              |
//! | rating_review    | `div.objet-sous-chronique div.discrete-info`     |
//! | rating_average   | `div#objetVote`                                  |
//! | tags             | `div#contenuObjetTags`                           |
//!
//! Ratings are drawn as star glyphs: `span.gfxNotePleine` counts one point,
//! `span.gfxNoteDemi` half a point.

use crate::extract::Extractor;
use crate::record::{Record, RecordDraft, Rejection};
use crate::source::SourceIdentifier;
use scraper::{ElementRef, Html, Selector};

/// Extractor for the Guts of Darkness review site
#[derive(Debug, Default, Clone, Copy)]
pub struct GutsExtractor;

impl GutsExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Builds the unvalidated draft for a page
    pub fn draft(&self, source_key: &str, body: &str) -> RecordDraft {
        let document = Html::parse_document(body);

        let mut draft = RecordDraft::new(source_key);
        let (title, artist) = extract_title_and_artist(&document);
        draft.title = title;
        draft.artist = artist;
        draft.description = extract_description(&document);
        draft.styles = select_all_text(&document, "div.objet-style a");
        draft.rating_review =
            count_stars(&document, "div.objet-sous-chronique div.discrete-info");
        draft.rating_average = count_stars(&document, "div#objetVote");
        draft.tags = select_first(&document, "div#contenuObjetTags")
            .map(|el| joined_text(&el))
            .unwrap_or_default();

        draft
    }
}

impl Extractor for GutsExtractor {
    fn extract(
        &self,
        _id: SourceIdentifier,
        source_key: &str,
        body: &str,
    ) -> Result<Record, Rejection> {
        self.draft(source_key, body).validate()
    }
}

/// Title lives in `<h1><em>`; the artist is whatever else the heading says
fn extract_title_and_artist(document: &Html) -> (Option<String>, Option<String>) {
    let heading = select_first(document, "h1");

    let title = heading.and_then(|h1| {
        let em = Selector::parse("em").ok()?;
        h1.select(&em)
            .next()
            .map(|el| joined_text(&el))
            .filter(|t| !t.is_empty())
    });

    let mut artist = heading.map(|h1| {
        let full = joined_text(&h1);
        let without_title = match &title {
            Some(t) => full.replace(t.as_str(), ""),
            None => full,
        };
        without_title.replace('>', "").trim().to_string()
    });

    if artist.as_deref().map_or(true, str::is_empty) {
        if let Some(lineup) = select_first(document, "#objetLineup p") {
            artist = Some(joined_text(&lineup));
        }
    }

    (title, artist)
}

fn extract_description(document: &Html) -> String {
    let Some(review) = select_first(document, "div.objet-chronique") else {
        return String::new();
    };
    let Ok(paragraph) = Selector::parse("p") else {
        return String::new();
    };

    review
        .select(&paragraph)
        .map(|p| joined_text(&p))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Counts full and half star glyphs below the first match of `container`
fn count_stars(document: &Html, container: &str) -> Option<f64> {
    let block = select_first(document, container)?;
    let full = Selector::parse("span.gfxNotePleine").ok()?;
    let half = Selector::parse("span.gfxNoteDemi").ok()?;

    let full_count = block.select(&full).count() as f64;
    let half_count = block.select(&half).count() as f64;
    Some(full_count + 0.5 * half_count)
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn select_all_text(document: &Html, selector: &str) -> Vec<String> {
    match Selector::parse(selector) {
        Ok(selector) => document
            .select(&selector)
            .map(|el| joined_text(&el))
            .filter(|text| !text.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Joins the trimmed text nodes of an element with single spaces
fn joined_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "https://www.gutsofdarkness.com/god/objet.php?objet=42";

    fn album_page() -> &'static str {
        r#"<html><body>
            <h1>Burzum &gt; <em>Filosofem</em></h1>
            <div id="objetLineup"><p>Varg Vikernes</p></div>
            <div class="objet-style"><a>Black Metal</a><a>Ambient</a><a>Black Metal</a></div>
            <div class="objet-chronique">
                <p>Hypnotic   and cold.</p>
                <p>A landmark.</p>
            </div>
            <div class="objet-sous-chronique"><div class="discrete-info">
                <span class="gfxNotePleine"></span><span class="gfxNotePleine"></span>
                <span class="gfxNotePleine"></span><span class="gfxNotePleine"></span>
                <span class="gfxNoteDemi"></span><span class="gfxNoteVide"></span>
            </div></div>
            <div id="objetVote">
                <span class="gfxNotePleine"></span><span class="gfxNotePleine"></span>
                <span class="gfxNotePleine"></span><span class="gfxNoteVide"></span>
            </div>
            <div id="contenuObjetTags"><a>atmospheric</a> <a>1996</a></div>
        </body></html>"#
    }

    #[test]
    fn test_extract_full_page() {
        let record = GutsExtractor::new()
            .extract(SourceIdentifier::new(42), KEY, album_page())
            .unwrap();

        assert_eq!(record.title, "Filosofem");
        assert_eq!(record.artist, "Burzum");
        assert_eq!(record.description, "Hypnotic and cold. A landmark.");
        assert_eq!(record.styles, vec!["Black Metal", "Ambient"]);
        assert_eq!(record.rating_review, Some(4.5));
        assert_eq!(record.rating_average, Some(3.0));
        assert_eq!(record.tags, "atmospheric 1996");
        assert_eq!(record.source_key, KEY);
    }

    #[test]
    fn test_artist_falls_back_to_lineup() {
        let html = r#"<html><body>
            <h1><em>Untitled</em></h1>
            <div id="objetLineup"><p>Some  Collective</p></div>
        </body></html>"#;
        let record = GutsExtractor::new()
            .extract(SourceIdentifier::new(1), KEY, html)
            .unwrap();
        assert_eq!(record.title, "Untitled");
        assert_eq!(record.artist, "Some Collective");
    }

    #[test]
    fn test_page_without_heading_rejected() {
        let html = r#"<html><body><p>Cette page n'existe pas.</p></body></html>"#;
        let result = GutsExtractor::new().extract(SourceIdentifier::new(1), KEY, html);
        assert_eq!(result, Err(Rejection::MissingTitle));
    }

    #[test]
    fn test_heading_without_artist_rejected() {
        let html = r#"<html><body><h1><em>Lonely Title</em></h1></body></html>"#;
        let result = GutsExtractor::new().extract(SourceIdentifier::new(1), KEY, html);
        assert_eq!(result, Err(Rejection::MissingArtist));
    }

    #[test]
    fn test_missing_optional_blocks() {
        let html = r#"<html><body><h1>Artist <em>Album</em></h1></body></html>"#;
        let record = GutsExtractor::new()
            .extract(SourceIdentifier::new(1), KEY, html)
            .unwrap();
        assert_eq!(record.description, "");
        assert!(record.styles.is_empty());
        assert_eq!(record.rating_review, None);
        assert_eq!(record.rating_average, None);
        assert_eq!(record.tags, "");
    }

    #[test]
    fn test_too_many_stars_rejected() {
        let stars = "<span class=\"gfxNotePleine\"></span>".repeat(7);
        let html = format!(
            r#"<html><body><h1>Artist <em>Album</em></h1><div id="objetVote">{}</div></body></html>"#,
            stars
        );
        let result = GutsExtractor::new().extract(SourceIdentifier::new(1), KEY, &html);
        assert!(matches!(result, Err(Rejection::InvalidRating { .. })));
    }
}
