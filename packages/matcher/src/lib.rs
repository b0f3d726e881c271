#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fuzzy address similarity scoring.
//!
//! Scores how textually close a destination address is to a carpark's
//! registered address on a 0-100 scale, using normalized Levenshtein
//! similarity over the case-folded strings. This is a coarse relevance
//! prefilter: a high score means the two addresses share street or
//! district names, not that the carpark is close by road.

/// Default minimum similarity for a carpark to stay in the candidate set.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 40.0;

/// Similarity between two addresses, from 0 (nothing in common) to 100
/// (identical after case-folding).
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    strsim::normalized_levenshtein(&a, &b) * 100.0
}

/// Whether `candidate` is similar enough to `destination` to be kept.
#[must_use]
pub fn is_similar(destination: &str, candidate: &str, threshold: f64) -> bool {
    similarity(destination, candidate) >= threshold
}

/// Keeps the items whose address is at least `threshold` similar to
/// `destination`, preserving input order.
pub fn retain_similar<T, F>(items: Vec<T>, destination: &str, threshold: f64, address: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let destination = destination.to_lowercase();
    items
        .into_iter()
        .filter(|item| is_similar(&destination, address(item), threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_addresses_score_100() {
        assert!((similarity("BLK 1 ORCHARD ROAD", "blk 1 orchard road") - 100.0).abs() < f64::EPSILON);
        assert!((similarity("", "") - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_symmetric_and_bounded() {
        let pairs = [
            ("Orchard Road", "orchard rd car park"),
            ("Jurong East", "BLK 270 JURONG EAST ST 21"),
            ("", "tampines"),
            ("Bukit Timah", "Bukit Batok"),
        ];
        for (a, b) in pairs {
            let forward = similarity(a, b);
            let backward = similarity(b, a);
            assert!((forward - backward).abs() < 1e-9, "{a} / {b}");
            assert!((0.0..=100.0).contains(&forward), "{a} / {b}: {forward}");
        }
    }

    #[test]
    fn same_street_passes_default_threshold() {
        assert!(is_similar(
            "Orchard Road",
            "orchard rd car park",
            DEFAULT_SIMILARITY_THRESHOLD
        ));
    }

    #[test]
    fn unrelated_district_fails_default_threshold() {
        assert!(!is_similar(
            "Jurong East",
            "orchard rd car park",
            DEFAULT_SIMILARITY_THRESHOLD
        ));
    }

    #[test]
    fn retain_similar_preserves_order() {
        let addresses = vec![
            "orchard rd car park",
            "jurong east st 13",
            "orchard road basement",
        ];
        let kept = retain_similar(addresses, "Orchard Road", 40.0, |a| *a);
        assert_eq!(kept, vec!["orchard rd car park", "orchard road basement"]);
    }
}
