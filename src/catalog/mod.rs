//! Browsing and curation operations over the two libraries
//!
//! Read operations take record slices. Mutating operations take the store,
//! apply the change in memory and save the whole file once.

pub mod influences;
pub mod prompts;

use std::cmp::Ordering;

/// Order identifiers numerically; anything that does not parse sorts as 0,
/// with ties broken by the raw text.
pub fn numeric_id_order(a: &str, b: &str) -> Ordering {
    let key = |id: &str| id.trim().parse::<u64>().unwrap_or(0);
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_order_puts_legacy_ids_first() {
        let mut ids = vec!["10", "BONUS-1", "2", "1"];
        ids.sort_by(|a, b| numeric_id_order(a, b));
        assert_eq!(ids, vec!["BONUS-1", "1", "2", "10"]);
    }
}
