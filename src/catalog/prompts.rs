use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::info;

use crate::error::{LibraryError, Result};
use crate::store::{PromptPatch, PromptRecord, PromptStore};

/// Criteria for [`find`]; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    pub time_block: Option<String>,
    pub bpm: Option<u32>,
    pub generated: Option<bool>,
    pub rated: Option<bool>,
    /// Only prompts whose rating carries a star.
    pub excellent: bool,
}

impl PromptFilter {
    pub fn matches(&self, prompt: &PromptRecord) -> bool {
        if let Some(block) = &self.time_block {
            if !prompt.time_block.eq_ignore_ascii_case(block) {
                return false;
            }
        }
        if let Some(bpm) = self.bpm {
            if prompt.bpm_value() != Some(bpm) {
                return false;
            }
        }
        if let Some(generated) = self.generated {
            if prompt.is_generated() != generated {
                return false;
            }
        }
        if let Some(rated) = self.rated {
            if prompt.is_rated() != rated {
                return false;
            }
        }
        !self.excellent || is_starred(prompt)
    }
}

fn is_starred(prompt: &PromptRecord) -> bool {
    prompt.rating.contains('⭐')
}

pub fn find<'a>(prompts: &'a [PromptRecord], filter: &PromptFilter) -> Vec<&'a PromptRecord> {
    prompts.iter().filter(|p| filter.matches(p)).collect()
}

/// Text columns a search can be limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    TimeBlock,
    Genres,
    Instruments,
    Mood,
    ShortPrompt,
    FullPrompt,
    Notes,
    Rating,
}

impl SearchField {
    pub const ALL: [SearchField; 8] = [
        SearchField::TimeBlock,
        SearchField::Genres,
        SearchField::Instruments,
        SearchField::Mood,
        SearchField::ShortPrompt,
        SearchField::FullPrompt,
        SearchField::Notes,
        SearchField::Rating,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SearchField::TimeBlock => "time_block",
            SearchField::Genres => "genres",
            SearchField::Instruments => "instruments",
            SearchField::Mood => "mood",
            SearchField::ShortPrompt => "short_prompt",
            SearchField::FullPrompt => "full_prompt",
            SearchField::Notes => "notes",
            SearchField::Rating => "rating",
        }
    }

    fn value<'a>(&self, prompt: &'a PromptRecord) -> &'a str {
        match self {
            SearchField::TimeBlock => &prompt.time_block,
            SearchField::Genres => &prompt.genres,
            SearchField::Instruments => &prompt.instruments,
            SearchField::Mood => &prompt.mood,
            SearchField::ShortPrompt => &prompt.short_prompt,
            SearchField::FullPrompt => &prompt.full_prompt,
            SearchField::Notes => &prompt.notes,
            SearchField::Rating => &prompt.rating,
        }
    }
}

impl FromStr for SearchField {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|f| f.name()).collect();
                LibraryError::Validation {
                    message: format!(
                        "Unknown search field '{}'. Valid fields: {}",
                        s,
                        names.join(", ")
                    ),
                }
            })
    }
}

/// Case-insensitive substring search. An empty `fields` slice searches all
/// text columns.
pub fn search<'a>(
    prompts: &'a [PromptRecord],
    text: &str,
    fields: &[SearchField],
) -> Vec<&'a PromptRecord> {
    let needle = text.to_lowercase();
    let fields = if fields.is_empty() {
        &SearchField::ALL[..]
    } else {
        fields
    };
    prompts
        .iter()
        .filter(|p| {
            fields
                .iter()
                .any(|f| f.value(p).to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn get<'a>(store: &'a PromptStore, id: &str) -> Result<&'a PromptRecord> {
    store.find_by_id(id).ok_or_else(|| LibraryError::NotFound {
        kind: "Prompt",
        id: id.to_string(),
    })
}

/// Set the rating of one prompt and save.
pub fn rate(store: &mut PromptStore, id: &str, rating: &str) -> Result<()> {
    store.update_fields(id, PromptPatch::rating(rating))?;
    store.save()?;
    info!("Rated prompt {}: {}", id, rating);
    Ok(())
}

/// Flag the given prompts as generated. Every id must exist; if one does not,
/// nothing changes.
pub fn mark_generated(store: &mut PromptStore, ids: &[String]) -> Result<usize> {
    for id in ids {
        get(store, id)?;
    }
    for id in ids {
        store.update_fields(id, PromptPatch::generated())?;
    }
    if !ids.is_empty() {
        store.save()?;
    }
    info!("Marked {} prompt(s) as generated", ids.len());
    Ok(ids.len())
}

/// Flag every prompt not yet generated. Returns how many changed.
pub fn mark_all_generated(store: &mut PromptStore) -> Result<usize> {
    let mut changed = 0;
    for prompt in store.records_mut() {
        if !prompt.is_generated() {
            prompt.generated = "Yes".to_string();
            changed += 1;
        }
    }
    if changed > 0 {
        store.save()?;
    }
    info!("Marked {} prompt(s) as generated", changed);
    Ok(changed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptStats {
    pub total: usize,
    pub generated: usize,
    pub rated: usize,
    pub excellent: usize,
    pub by_time_block: BTreeMap<String, usize>,
}

pub fn stats(prompts: &[PromptRecord]) -> PromptStats {
    let mut stats = PromptStats {
        total: prompts.len(),
        ..Default::default()
    };
    for p in prompts {
        if p.is_generated() {
            stats.generated += 1;
        }
        if p.is_rated() {
            stats.rated += 1;
        }
        if is_starred(p) {
            stats.excellent += 1;
        }
        let block = if p.time_block.trim().is_empty() {
            "Unknown".to_string()
        } else {
            p.time_block.clone()
        };
        *stats.by_time_block.entry(block).or_insert(0) += 1;
    }
    stats
}
