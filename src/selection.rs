//! Parent and mutation-candidate selection
//!
//! A prompt is a parent when its free-text rating contains one of the
//! configured quality markers. Matching is a case-insensitive substring test,
//! so "Excellent - sax texture perfect! ⭐" and "very good" both qualify.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::store::{InfluenceRecord, InfluenceStatus, PromptRecord};

/// Set of rating substrings that mark a prompt as desirable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTiers {
    markers: Vec<String>,
}

impl QualityTiers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Excellent, star and very good: the strictest tier.
    pub fn top() -> Self {
        Self::new(["excellent", "⭐", "very good"])
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn qualifies(&self, rating: &str) -> bool {
        if rating.trim().is_empty() {
            return false;
        }
        let lower = rating.to_lowercase();
        self.markers.iter().any(|m| lower.contains(m.as_str()))
    }
}

impl Default for QualityTiers {
    fn default() -> Self {
        Self::top()
    }
}

/// Qualifying prompts in `group_key`, in store order.
pub fn find_parents<'a>(
    prompts: &'a [PromptRecord],
    group_key: &str,
    tiers: &QualityTiers,
) -> Vec<&'a PromptRecord> {
    let parents: Vec<_> = prompts
        .iter()
        .filter(|p| p.time_block == group_key && tiers.qualifies(&p.rating))
        .collect();
    debug!("{} parent(s) for '{}'", parents.len(), group_key);
    parents
}

/// Qualifying prompts across every group key, in store order.
pub fn find_global_parents<'a>(
    prompts: &'a [PromptRecord],
    tiers: &QualityTiers,
) -> Vec<&'a PromptRecord> {
    prompts
        .iter()
        .filter(|p| tiers.qualifies(&p.rating))
        .collect()
}

/// Influences still marked Unexplored, optionally limited to one category
/// (compared case-insensitively).
pub fn unexplored_influences<'a>(
    influences: &'a [InfluenceRecord],
    category: Option<&str>,
) -> Vec<&'a InfluenceRecord> {
    influences
        .iter()
        .filter(|inf| inf.status == InfluenceStatus::Unexplored)
        .filter(|inf| category.is_none_or(|c| inf.category.eq_ignore_ascii_case(c)))
        .collect()
}

/// Distinct non-empty group keys with their prompt counts, sorted by key.
pub fn list_group_keys(prompts: &[PromptRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for p in prompts {
        if p.time_block.trim().is_empty() {
            continue;
        }
        *counts.entry(p.time_block.clone()).or_insert(0) += 1;
    }
    counts
}
