use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Record;
use crate::error::LibraryError;

/// Column layout of the prompt library file, in write order.
pub const PROMPT_HEADERS: &[&str] = &[
    "Prompt_ID",
    "Time_Block",
    "BPM",
    "Brain_Wave_Target",
    "Duration_Type",
    "Primary_Genres",
    "Key_Instruments",
    "Mood_Keywords",
    "Suno_Short_Prompt",
    "Full_Prompt",
    "Notes",
    "Generated",
    "Suno_Refined",
    "Rating",
];

/// Column layout of the influence library file, in write order.
pub const INFLUENCE_HEADERS: &[&str] = &[
    "Influence_ID",
    "Category",
    "Name",
    "Elements_To_Use",
    "Elements_To_Avoid",
    "Adaptation_Notes",
    "Used_In_Prompts",
    "Status",
];

/// One row of the prompt library.
///
/// Field order matches [`PROMPT_HEADERS`]; the writer relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    #[serde(rename = "Prompt_ID")]
    pub id: String,
    #[serde(rename = "Time_Block")]
    pub time_block: String,
    /// Kept as text so blank or legacy values survive a round trip.
    #[serde(rename = "BPM")]
    pub bpm: String,
    #[serde(rename = "Brain_Wave_Target")]
    pub brain_wave_target: String,
    #[serde(rename = "Duration_Type")]
    pub duration_type: String,
    #[serde(rename = "Primary_Genres")]
    pub genres: String,
    #[serde(rename = "Key_Instruments")]
    pub instruments: String,
    #[serde(rename = "Mood_Keywords")]
    pub mood: String,
    #[serde(rename = "Suno_Short_Prompt")]
    pub short_prompt: String,
    #[serde(rename = "Full_Prompt")]
    pub full_prompt: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Generated")]
    pub generated: String,
    #[serde(rename = "Suno_Refined")]
    pub refined: String,
    #[serde(rename = "Rating")]
    pub rating: String,
}

impl PromptRecord {
    /// Numeric tempo, if the BPM column holds one.
    pub fn bpm_value(&self) -> Option<u32> {
        self.bpm.trim().parse().ok()
    }

    pub fn is_generated(&self) -> bool {
        self.generated.trim().eq_ignore_ascii_case("yes")
    }

    pub fn is_rated(&self) -> bool {
        !self.rating.trim().is_empty()
    }

    /// Comma-separated genre tokens, trimmed, empties dropped.
    pub fn genre_tokens(&self) -> Vec<&str> {
        split_list(&self.genres)
    }

    /// Comma-separated instrument tokens, trimmed, empties dropped.
    pub fn instrument_tokens(&self) -> Vec<&str> {
        split_list(&self.instruments)
    }
}

/// Partial update for a prompt; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PromptPatch {
    pub time_block: Option<String>,
    pub bpm: Option<String>,
    pub brain_wave_target: Option<String>,
    pub duration_type: Option<String>,
    pub genres: Option<String>,
    pub instruments: Option<String>,
    pub mood: Option<String>,
    pub short_prompt: Option<String>,
    pub full_prompt: Option<String>,
    pub notes: Option<String>,
    pub generated: Option<String>,
    pub refined: Option<String>,
    pub rating: Option<String>,
}

impl PromptPatch {
    pub fn rating(rating: impl Into<String>) -> Self {
        Self {
            rating: Some(rating.into()),
            ..Default::default()
        }
    }

    pub fn generated() -> Self {
        Self {
            generated: Some("Yes".to_string()),
            ..Default::default()
        }
    }
}

impl Record for PromptRecord {
    type Patch = PromptPatch;
    const KIND: &'static str = "Prompt";
    const HEADERS: &'static [&'static str] = PROMPT_HEADERS;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: PromptPatch) {
        let PromptPatch {
            time_block,
            bpm,
            brain_wave_target,
            duration_type,
            genres,
            instruments,
            mood,
            short_prompt,
            full_prompt,
            notes,
            generated,
            refined,
            rating,
        } = patch;
        assign(&mut self.time_block, time_block);
        assign(&mut self.bpm, bpm);
        assign(&mut self.brain_wave_target, brain_wave_target);
        assign(&mut self.duration_type, duration_type);
        assign(&mut self.genres, genres);
        assign(&mut self.instruments, instruments);
        assign(&mut self.mood, mood);
        assign(&mut self.short_prompt, short_prompt);
        assign(&mut self.full_prompt, full_prompt);
        assign(&mut self.notes, notes);
        assign(&mut self.generated, generated);
        assign(&mut self.refined, refined);
        assign(&mut self.rating, rating);
    }
}

/// Exploration status of an influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InfluenceStatus {
    Unexplored,
    Tested,
    Proven,
    Avoid,
}

impl InfluenceStatus {
    pub const ALL: [InfluenceStatus; 4] = [
        InfluenceStatus::Unexplored,
        InfluenceStatus::Tested,
        InfluenceStatus::Proven,
        InfluenceStatus::Avoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InfluenceStatus::Unexplored => "Unexplored",
            InfluenceStatus::Tested => "Tested",
            InfluenceStatus::Proven => "Proven",
            InfluenceStatus::Avoid => "Avoid",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            InfluenceStatus::Unexplored => "○",
            InfluenceStatus::Tested => "◐",
            InfluenceStatus::Proven => "✓",
            InfluenceStatus::Avoid => "✗",
        }
    }
}

impl fmt::Display for InfluenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfluenceStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LibraryError::Validation {
                message: format!(
                    "Invalid status '{}'. Must be one of: Unexplored, Tested, Proven, Avoid",
                    wanted
                ),
            })
    }
}

/// One row of the influence library.
///
/// Field order matches [`INFLUENCE_HEADERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceRecord {
    #[serde(rename = "Influence_ID")]
    pub id: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Elements_To_Use")]
    pub elements_to_use: String,
    #[serde(rename = "Elements_To_Avoid")]
    pub elements_to_avoid: String,
    #[serde(rename = "Adaptation_Notes")]
    pub adaptation_notes: String,
    #[serde(rename = "Used_In_Prompts")]
    pub used_in_prompts: String,
    #[serde(rename = "Status")]
    pub status: InfluenceStatus,
}

impl InfluenceRecord {
    pub fn used_ids(&self) -> Vec<&str> {
        split_list(&self.used_in_prompts)
    }

    pub fn is_used(&self) -> bool {
        !self.used_in_prompts.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InfluencePatch {
    pub category: Option<String>,
    pub name: Option<String>,
    pub elements_to_use: Option<String>,
    pub elements_to_avoid: Option<String>,
    pub adaptation_notes: Option<String>,
    pub used_in_prompts: Option<String>,
    pub status: Option<InfluenceStatus>,
}

impl Record for InfluenceRecord {
    type Patch = InfluencePatch;
    const KIND: &'static str = "Influence";
    const HEADERS: &'static [&'static str] = INFLUENCE_HEADERS;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: InfluencePatch) {
        assign(&mut self.category, patch.category);
        assign(&mut self.name, patch.name);
        assign(&mut self.elements_to_use, patch.elements_to_use);
        assign(&mut self.elements_to_avoid, patch.elements_to_avoid);
        assign(&mut self.adaptation_notes, patch.adaptation_notes);
        assign(&mut self.used_in_prompts, patch.used_in_prompts);
        assign(&mut self.status, patch.status);
    }
}

fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Split a comma-joined list column into trimmed, non-empty tokens.
pub fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(
            "proven".parse::<InfluenceStatus>().unwrap(),
            InfluenceStatus::Proven
        );
        assert_eq!(
            " AVOID ".parse::<InfluenceStatus>().unwrap(),
            InfluenceStatus::Avoid
        );
        assert!("done".parse::<InfluenceStatus>().is_err());
    }

    #[test]
    fn test_status_icons() {
        let icons: Vec<_> = InfluenceStatus::ALL.iter().map(|s| s.icon()).collect();
        assert_eq!(icons, vec!["○", "◐", "✓", "✗"]);
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(
            split_list(" rhodes,, upright bass ,"),
            vec!["rhodes", "upright bass"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut inf = InfluenceRecord {
            id: "1".into(),
            category: "Acoustic Instruments".into(),
            name: "Kalimba".into(),
            elements_to_use: "plucked tines".into(),
            elements_to_avoid: "fast runs".into(),
            adaptation_notes: "".into(),
            used_in_prompts: "".into(),
            status: InfluenceStatus::Unexplored,
        };
        inf.apply(InfluencePatch {
            status: Some(InfluenceStatus::Tested),
            ..Default::default()
        });
        assert_eq!(inf.status, InfluenceStatus::Tested);
        assert_eq!(inf.name, "Kalimba");
        assert_eq!(inf.elements_to_use, "plucked tines");
    }
}
