//! Comparable listings for a make / model / year

use crate::ingestion::types::CanonicalListing;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparables {
    pub active: Vec<CanonicalListing>,
    pub sold_out: Vec<CanonicalListing>,
}

fn matching(rows: &[CanonicalListing], make: &str, model: &str, year: i32) -> Vec<CanonicalListing> {
    rows.iter()
        .filter(|r| r.make == make && r.model == model && r.year == year)
        .cloned()
        .collect()
}

/// Exact match on all three fields, in both tables
pub fn list_comparables(
    active: &[CanonicalListing],
    sold_out: &[CanonicalListing],
    make: &str,
    model: &str,
    year: i32,
) -> Comparables {
    Comparables {
        active: matching(active, make, model, year),
        sold_out: matching(sold_out, make, model, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::mock_listing;

    #[test]
    fn test_exact_match_only() {
        let active = vec![
            mock_listing(),
            CanonicalListing { year: 2020, ..mock_listing() },
            CanonicalListing { model: "Camry Hybrid".to_string(), ..mock_listing() },
        ];
        let sold = vec![CanonicalListing { id: "S1".to_string(), ..mock_listing() }];

        let found = list_comparables(&active, &sold, "Toyota", "Camry", 2019);

        assert_eq!(found.active.len(), 1);
        assert_eq!(found.sold_out[0].id, "S1");
        let none = list_comparables(&active, &sold, "toyota", "Camry", 2019);
        assert!(none.active.is_empty() && none.sold_out.is_empty());
    }
}
