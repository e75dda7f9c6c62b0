use rand::Rng;
use rand::seq::index;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::numeric_id_order;
use crate::error::{LibraryError, Result};
use crate::ids::next_id;
use crate::selection::unexplored_influences;
use crate::store::{InfluencePatch, InfluenceRecord, InfluenceStatus, InfluenceStore, split_list};

/// Influences grouped by category, each group sorted by numeric id.
pub fn list<'a>(
    influences: &'a [InfluenceRecord],
    category: Option<&str>,
    status: Option<InfluenceStatus>,
) -> BTreeMap<String, Vec<&'a InfluenceRecord>> {
    let mut groups: BTreeMap<String, Vec<&InfluenceRecord>> = BTreeMap::new();
    for inf in influences {
        if category.is_some_and(|c| !inf.category.eq_ignore_ascii_case(c)) {
            continue;
        }
        if status.is_some_and(|s| inf.status != s) {
            continue;
        }
        groups.entry(inf.category.clone()).or_default().push(inf);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| numeric_id_order(&a.id, &b.id));
    }
    groups
}

/// Case-insensitive match on name, elements to use and adaptation notes.
pub fn search<'a>(influences: &'a [InfluenceRecord], text: &str) -> Vec<&'a InfluenceRecord> {
    let needle = text.to_lowercase();
    influences
        .iter()
        .filter(|inf| {
            [&inf.name, &inf.elements_to_use, &inf.adaptation_notes]
                .iter()
                .any(|v| v.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn get<'a>(store: &'a InfluenceStore, id: &str) -> Result<&'a InfluenceRecord> {
    store.find_by_id(id).ok_or_else(|| LibraryError::NotFound {
        kind: "Influence",
        id: id.to_string(),
    })
}

/// Fields supplied when registering a new influence.
#[derive(Debug, Clone, Default)]
pub struct NewInfluence {
    pub category: String,
    pub name: String,
    pub elements_to_use: String,
    pub elements_to_avoid: String,
    pub adaptation_notes: String,
}

/// Append a new Unexplored influence with the next free id and save.
pub fn add(store: &mut InfluenceStore, new: NewInfluence) -> Result<InfluenceRecord> {
    if new.name.trim().is_empty() || new.category.trim().is_empty() {
        return Err(LibraryError::Validation {
            message: "Influence name and category must not be empty".to_string(),
        });
    }
    let record = InfluenceRecord {
        id: next_id(store.records())?.to_string(),
        category: new.category.trim().to_string(),
        name: new.name.trim().to_string(),
        elements_to_use: new.elements_to_use,
        elements_to_avoid: new.elements_to_avoid,
        adaptation_notes: new.adaptation_notes,
        used_in_prompts: String::new(),
        status: InfluenceStatus::Unexplored,
    };
    store.append(record.clone())?;
    store.save()?;
    info!("Added influence #{}: {}", record.id, record.name);
    Ok(record)
}

/// Union of an existing usage column and new prompt ids, ordered numerically
/// and joined with ", ".
pub fn merge_usage(existing: &str, new_ids: &[String]) -> String {
    let mut ids: BTreeSet<&str> = split_list(existing).into_iter().collect();
    ids.extend(new_ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()));
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_by(|a, b| numeric_id_order(a, b));
    ids.join(", ")
}

/// Record that `prompt_ids` used influence `id`. Returns the merged list.
pub fn mark_used(store: &mut InfluenceStore, id: &str, prompt_ids: &[String]) -> Result<String> {
    let merged = merge_usage(&get(store, id)?.used_in_prompts, prompt_ids);
    store.update_fields(
        id,
        InfluencePatch {
            used_in_prompts: Some(merged.clone()),
            ..Default::default()
        },
    )?;
    store.save()?;
    info!("Influence #{} used in: {}", id, merged);
    Ok(merged)
}

pub fn set_status(store: &mut InfluenceStore, id: &str, status: InfluenceStatus) -> Result<()> {
    store.update_fields(
        id,
        InfluencePatch {
            status: Some(status),
            ..Default::default()
        },
    )?;
    store.save()?;
    info!("Influence #{} status set to {}", id, status);
    Ok(())
}

/// Up to `k` random unexplored influences, optionally from one category.
pub fn suggest<'a, R: Rng + ?Sized>(
    influences: &'a [InfluenceRecord],
    k: usize,
    category: Option<&str>,
    rng: &mut R,
) -> Vec<&'a InfluenceRecord> {
    let pool = unexplored_influences(influences, category);
    let amount = k.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfluenceStats {
    pub total: usize,
    pub used: usize,
    pub by_status: BTreeMap<InfluenceStatus, usize>,
    pub by_category: BTreeMap<String, usize>,
}

pub fn stats(influences: &[InfluenceRecord]) -> InfluenceStats {
    let mut stats = InfluenceStats {
        total: influences.len(),
        by_status: InfluenceStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
        ..Default::default()
    };
    for inf in influences {
        if inf.is_used() {
            stats.used += 1;
        }
        *stats.by_status.entry(inf.status).or_insert(0) += 1;
        *stats.by_category.entry(inf.category.clone()).or_insert(0) += 1;
    }
    stats
}
