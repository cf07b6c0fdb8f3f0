//! Text clean-up shared by record validation and the cleaning stage

use std::collections::HashSet;

/// Replaces non-breaking spaces, collapses whitespace runs and trims
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes style names, dropping empties and repeats while keeping order
pub fn dedup_styles(styles: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    styles
        .into_iter()
        .map(|style| normalize_whitespace(&style))
        .filter(|style| !style.is_empty() && seen.insert(style.clone()))
        .collect()
}
