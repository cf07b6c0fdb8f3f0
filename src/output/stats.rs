//! Statistics over the persisted dataset and the run ledger
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics for the `--stats` mode.

use crate::record::Record;
use crate::storage::{CheckpointStore, RunLedger, RunRecord};
use crate::Result;
use std::collections::HashMap;

/// Number of styles listed by [`print_statistics`]
const TOP_STYLES: usize = 10;

/// Number of runs loaded from the ledger
const RECENT_RUNS: usize = 5;

/// Dataset statistics summary
#[derive(Debug, Clone, Default)]
pub struct DatasetStatistics {
    /// Total number of records in the dataset
    pub total_records: u64,

    /// Records carrying a reviewer rating
    pub with_review_rating: u64,

    /// Records carrying a reader average
    pub with_average_rating: u64,

    /// Mean reviewer rating over the records that have one
    pub mean_review_rating: Option<f64>,

    /// Records with an empty description
    pub empty_descriptions: u64,

    /// Most common styles, most frequent first
    pub top_styles: Vec<(String, u64)>,

    /// Keys with at least one recorded not-found answer
    pub missed_keys: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Computes the record-level part of the statistics
pub fn compute_statistics(records: &[Record]) -> DatasetStatistics {
    let mut stats = DatasetStatistics {
        total_records: records.len() as u64,
        ..DatasetStatistics::default()
    };

    let mut review_sum = 0.0;
    let mut style_counts: HashMap<&str, u64> = HashMap::new();

    for record in records {
        if let Some(rating) = record.rating_review {
            stats.with_review_rating += 1;
            review_sum += rating;
        }
        if record.rating_average.is_some() {
            stats.with_average_rating += 1;
        }
        if record.description.is_empty() {
            stats.empty_descriptions += 1;
        }
        for style in &record.styles {
            *style_counts.entry(style.as_str()).or_insert(0) += 1;
        }
    }

    if stats.with_review_rating > 0 {
        stats.mean_review_rating = Some(review_sum / stats.with_review_rating as f64);
    }

    let mut styles: Vec<_> = style_counts
        .into_iter()
        .map(|(style, count)| (style.to_string(), count))
        .collect();
    // Ties broken alphabetically so the listing is stable
    styles.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    styles.truncate(TOP_STYLES);
    stats.top_styles = styles;

    stats
}

/// Loads statistics from the checkpoint store and the ledger
pub fn load_statistics(
    store: &dyn CheckpointStore,
    ledger: &RunLedger,
) -> Result<DatasetStatistics> {
    let records = store.read_all()?;
    let mut stats = compute_statistics(&records);
    stats.missed_keys = ledger.count_misses()?;
    stats.recent_runs = ledger.recent_runs(RECENT_RUNS)?;
    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!(
        "  With reviewer rating: {} ({:.1}%)",
        stats.with_review_rating,
        percentage(stats.with_review_rating, stats.total_records)
    );
    println!(
        "  With reader average: {} ({:.1}%)",
        stats.with_average_rating,
        percentage(stats.with_average_rating, stats.total_records)
    );
    if let Some(mean) = stats.mean_review_rating {
        println!("  Mean reviewer rating: {:.2} / 6", mean);
    }
    println!("  Empty descriptions: {}", stats.empty_descriptions);
    println!();

    if !stats.top_styles.is_empty() {
        println!("Top Styles:");
        for (style, count) in &stats.top_styles {
            println!("  {}: {}", style, count);
        }
        println!();
    }

    println!("Not-found keys tracked: {}", stats.missed_keys);
    println!();

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} [{}, {}) {} attempted={} succeeded={} skipped={} started {}",
                run.id,
                run.range_start,
                run.range_end,
                run.status,
                run.attempted,
                run.succeeded,
                run.skipped,
                run.started_at
            );
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, styles: &[&str], review: Option<f64>) -> Record {
        Record {
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            description: if review.is_some() {
                "Some text".to_string()
            } else {
                String::new()
            },
            styles: styles.iter().map(|s| s.to_string()).collect(),
            rating_review: review,
            rating_average: None,
            tags: String::new(),
            source_key: key.to_string(),
        }
    }

    #[test]
    fn test_empty_dataset() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.mean_review_rating, None);
        assert!(stats.top_styles.is_empty());
    }

    #[test]
    fn test_rating_coverage_and_mean() {
        let records = vec![
            record("a", &[], Some(4.0)),
            record("b", &[], Some(5.0)),
            record("c", &[], None),
        ];
        let stats = compute_statistics(&records);

        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.with_review_rating, 2);
        assert_eq!(stats.mean_review_rating, Some(4.5));
        assert_eq!(stats.empty_descriptions, 1);
    }

    #[test]
    fn test_top_styles_sorted() {
        let records = vec![
            record("a", &["Doom", "Sludge"], None),
            record("b", &["Doom"], None),
            record("c", &["Black Metal"], None),
        ];
        let stats = compute_statistics(&records);

        assert_eq!(stats.top_styles[0], ("Doom".to_string(), 2));
        assert_eq!(stats.top_styles[1], ("Black Metal".to_string(), 1));
        assert_eq!(stats.top_styles[2], ("Sludge".to_string(), 1));
    }

    #[test]
    fn test_percentage_of_zero_total() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
