//! Merge functions - combine per-source tables and deduplicate by id
//!
//! Tables are concatenated in the order given; when an id repeats, the
//! last-seen row wins and keeps its position. No cross-source identity
//! resolution is attempted.

use crate::ingestion::types::{AuctionRecord, CanonicalListing, IngestStats, PredictedListing};
use std::collections::HashMap;
use tracing::debug;

/// A row with a source-native identifier
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for CanonicalListing {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for PredictedListing {
    fn key(&self) -> &str {
        &self.listing.id
    }
}

impl Keyed for AuctionRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Drop every row whose id appears again later. Returns the survivors and
/// the number of rows dropped.
pub fn keep_last<T: Keyed>(rows: Vec<T>) -> (Vec<T>, usize) {
    let mut last_seen: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        last_seen.insert(row.key().to_string(), idx);
    }

    let total = rows.len();
    let kept: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter(|(idx, row)| last_seen.get(row.key()) == Some(idx))
        .map(|(_, row)| row)
        .collect();

    let duplicates = total - kept.len();
    if duplicates > 0 {
        debug!("Dropped {} duplicate rows", duplicates);
    }
    (kept, duplicates)
}

/// Concatenate per-source tables in ingestion order, then keep the last row per id
pub fn merge_tables<T: Keyed>(tables: Vec<Vec<T>>) -> (Vec<T>, IngestStats) {
    let rows: Vec<T> = tables.into_iter().flatten().collect();
    let read = rows.len();
    let (kept, duplicates) = keep_last(rows);

    let stats = IngestStats {
        read,
        kept: kept.len(),
        dropped: 0,
        duplicates,
    };
    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::{mock_listing, Source};

    fn listing(id: &str, price: f64) -> CanonicalListing {
        CanonicalListing {
            id: id.to_string(),
            price,
            ..mock_listing()
        }
    }

    #[test]
    fn test_later_row_wins() {
        let first = vec![listing("A1", 50_000.0), listing("B2", 20_000.0)];
        let second = vec![CanonicalListing {
            source: Source::Dubicars,
            ..listing("A1", 48_000.0)
        }];

        let (merged, stats) = merge_tables(vec![first, second]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "B2");
        assert_eq!(merged[1].id, "A1");
        assert_eq!(merged[1].price, 48_000.0);
        assert_eq!(merged[1].source, Source::Dubicars);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.read, 3);
    }

    #[test]
    fn test_order_is_stable_without_duplicates() {
        let rows = vec![listing("C", 1.0), listing("A", 2.0), listing("B", 3.0)];
        let (kept, duplicates) = keep_last(rows);

        let ids: Vec<&str> = kept.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(duplicates, 0);
    }
}
