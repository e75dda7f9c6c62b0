//! Generation planner
//!
//! New prompts are bred from the library in three cohorts:
//! - clones: a parent's DNA reused with a fresh tempo
//! - hybrids: a local parent crossed with a parent from any time block
//! - mutations: a local parent with an unexplored influence injected
//!
//! Planning and materialisation are separate steps. A [`GenerationPlan`] is
//! plain data (it serialises to JSON for downstream text synthesis) and
//! [`materialize`] turns it into records without touching any store.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::influences::merge_usage;
use crate::config::Config;
use crate::error::{LibraryError, Result};
use crate::ids::next_id;
use crate::selection::{QualityTiers, find_global_parents, find_parents};
use crate::store::{InfluencePatch, InfluenceRecord, InfluenceStore, PromptRecord, PromptStore};
use crate::weighting::{CandidateSource, mutation_candidates};

/// How a requested count is divided between the three cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CohortSplit {
    pub clones: usize,
    pub hybrids: usize,
    pub mutations: usize,
}

impl CohortSplit {
    /// `clones = floor(total * clone_ratio)`, `hybrids = floor(total * hybrid_ratio)`,
    /// mutations absorb the remainder.
    pub fn new(total: usize, clone_ratio: f64, hybrid_ratio: f64) -> Self {
        // Nudge before flooring so 0.3 * 10 lands on 3, not 2.9999...
        let share = |ratio: f64| ((total as f64) * ratio + 1e-9).floor() as usize;
        let clones = share(clone_ratio).min(total);
        let hybrids = share(hybrid_ratio).min(total - clones);
        Self {
            clones,
            hybrids,
            mutations: total - clones - hybrids,
        }
    }

    /// The 50 / 30 / 20 split.
    pub fn standard(total: usize) -> Self {
        Self::new(total, 0.5, 0.3)
    }

    pub fn total(&self) -> usize {
        self.clones + self.hybrids + self.mutations
    }
}

/// Knobs the planner needs, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub clone_ratio: f64,
    pub hybrid_ratio: f64,
    pub weighted_share: f64,
    pub candidate_buffer: usize,
    pub default_tempo: (u32, u32),
    pub parent_tiers: QualityTiers,
    pub top_tiers: QualityTiers,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GenerationSettings {
    fn from(config: &Config) -> Self {
        let g = &config.generation;
        Self {
            clone_ratio: g.clone_ratio,
            hybrid_ratio: g.hybrid_ratio,
            weighted_share: g.weighted_share,
            candidate_buffer: g.candidate_buffer.max(1),
            default_tempo: (g.default_tempo_min, g.default_tempo_max),
            parent_tiers: config.tiers.parents(),
            top_tiers: config.tiers.top(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    Clone,
    Hybrid,
    Mutation,
}

/// One record to be synthesised, with everything needed to build it.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedItem {
    pub id: u64,
    pub cohort: Cohort,
    pub tempo: u32,
    pub parent: PromptRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<PromptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence: Option<InfluenceRecord>,
    /// Which pool a mutation's influence was drawn from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CandidateSource>,
}

impl PlannedItem {
    fn new(id: u64, cohort: Cohort, tempo: u32, parent: &PromptRecord) -> Self {
        Self {
            id,
            cohort,
            tempo,
            parent: parent.clone(),
            partner: None,
            influence: None,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationPlan {
    pub time_block: String,
    pub requested: usize,
    pub split: CohortSplit,
    pub parent_count: usize,
    /// Only one parent was available; every item descends from it.
    pub low_diversity: bool,
    pub tempo_range: (u32, u32),
    pub created_at: DateTime<Utc>,
    pub items: Vec<PlannedItem>,
}

impl GenerationPlan {
    /// Mutation slots that could not be filled for lack of candidates.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.items.len())
    }

    pub fn count(&self, cohort: Cohort) -> usize {
        self.items.iter().filter(|i| i.cohort == cohort).count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Lowest and highest numeric tempo among prompts in `time_block`.
pub fn observed_tempo_range(prompts: &[PromptRecord], time_block: &str) -> Option<(u32, u32)> {
    let mut tempos = prompts
        .iter()
        .filter(|p| p.time_block == time_block)
        .filter_map(PromptRecord::bpm_value);
    let first = tempos.next()?;
    Some(tempos.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

fn pick<'p, R: Rng + ?Sized>(pool: &[&'p PromptRecord], rng: &mut R) -> &'p PromptRecord {
    pool[rng.random_range(0..pool.len())]
}

/// Plan `count` new prompts for `time_block`.
///
/// Fails with [`LibraryError::NoEligibleParent`] when the block has no
/// qualifying parent. When the influence pool runs dry the plan simply holds
/// fewer mutation items than the split asked for.
pub fn plan_generation<R: Rng + ?Sized>(
    prompts: &[PromptRecord],
    influences: &[InfluenceRecord],
    time_block: &str,
    count: usize,
    settings: &GenerationSettings,
    rng: &mut R,
) -> Result<GenerationPlan> {
    let parents = find_parents(prompts, time_block, &settings.parent_tiers);
    if parents.is_empty() {
        return Err(LibraryError::NoEligibleParent {
            group_key: time_block.to_string(),
        });
    }
    let partners = find_global_parents(prompts, &settings.parent_tiers);

    let split = CohortSplit::new(count, settings.clone_ratio, settings.hybrid_ratio);
    let (lo, hi) = observed_tempo_range(prompts, time_block).unwrap_or(settings.default_tempo);

    let candidates = if split.mutations > 0 {
        mutation_candidates(
            prompts,
            influences,
            &settings.top_tiers,
            split.mutations,
            settings.weighted_share,
            settings.candidate_buffer,
            rng,
        )
    } else {
        Vec::new()
    };

    let first_id = next_id(prompts)?;
    if first_id.checked_add((count as u64).saturating_sub(1)).is_none() {
        return Err(LibraryError::Validation {
            message: format!("Cannot allocate {} identifiers after {}", count, first_id - 1),
        });
    }
    let mut next = first_id;
    let mut items = Vec::with_capacity(count);

    for _ in 0..split.clones {
        let parent = pick(&parents, rng);
        let tempo = rng.random_range(lo..=hi);
        items.push(PlannedItem::new(next, Cohort::Clone, tempo, parent));
        next += 1;
    }

    for _ in 0..split.hybrids {
        let parent = pick(&parents, rng);
        let others: Vec<&PromptRecord> = partners
            .iter()
            .copied()
            .filter(|p| p.id != parent.id)
            .collect();
        let partner = if others.is_empty() {
            parent
        } else {
            pick(&others, rng)
        };
        let tempo = rng.random_range(lo..=hi);
        items.push(PlannedItem {
            partner: Some(partner.clone()),
            ..PlannedItem::new(next, Cohort::Hybrid, tempo, parent)
        });
        next += 1;
    }

    for candidate in &candidates {
        let parent = pick(&parents, rng);
        let tempo = rng.random_range(lo..=hi);
        items.push(PlannedItem {
            influence: Some(candidate.influence.clone()),
            source: Some(candidate.source),
            ..PlannedItem::new(next, Cohort::Mutation, tempo, parent)
        });
        next += 1;
    }

    let plan = GenerationPlan {
        time_block: time_block.to_string(),
        requested: count,
        split,
        parent_count: parents.len(),
        low_diversity: parents.len() == 1,
        tempo_range: (lo, hi),
        created_at: Utc::now(),
        items,
    };

    info!(
        "Planned {} prompt(s) for '{}': {} clones, {} hybrids, {} mutations",
        plan.items.len(),
        time_block,
        plan.count(Cohort::Clone),
        plan.count(Cohort::Hybrid),
        plan.count(Cohort::Mutation)
    );
    if plan.low_diversity {
        warn!("Only one parent for '{}'; generated prompts will lack diversity", time_block);
    }
    if plan.shortfall() > 0 {
        warn!(
            "Mutation shortfall: {} of {} mutation slot(s) unfilled",
            plan.shortfall(),
            split.mutations
        );
    }

    Ok(plan)
}

/// Build the prompt records a plan describes.
pub fn materialize(plan: &GenerationPlan) -> Vec<PromptRecord> {
    plan.items
        .iter()
        .map(|item| synthesize(item, &plan.time_block))
        .collect()
}

fn synthesize(item: &PlannedItem, time_block: &str) -> PromptRecord {
    let parent = &item.parent;
    let tempo = item.tempo.to_string();

    let mut record = PromptRecord {
        id: item.id.to_string(),
        time_block: time_block.to_string(),
        bpm: tempo,
        brain_wave_target: parent.brain_wave_target.clone(),
        duration_type: parent.duration_type.clone(),
        genres: parent.genres.clone(),
        instruments: parent.instruments.clone(),
        mood: parent.mood.clone(),
        short_prompt: parent.short_prompt.clone(),
        full_prompt: parent.full_prompt.clone(),
        notes: String::new(),
        generated: String::new(),
        refined: String::new(),
        rating: String::new(),
    };

    match item.cohort {
        Cohort::Clone => {
            record.notes = format!("Parent DNA: clone of prompt {}", parent.id);
        }
        Cohort::Hybrid => {
            let partner = item.partner.as_ref().unwrap_or(parent);
            let genres: Vec<&str> = [parent, partner]
                .into_iter()
                .filter_map(|p| p.genre_tokens().first().copied())
                .collect();
            let instruments: Vec<&str> = [parent, partner]
                .into_iter()
                .flat_map(|p| p.instrument_tokens().into_iter().take(2))
                .collect();
            record.genres = genres.join(", ");
            record.instruments = instruments.join(", ");
            record.short_prompt = short_prompt(&record, item.tempo);
            record.full_prompt = format!(
                "{} hybrid at {} BPM built on {}. Mood: {}.",
                record.genres, item.tempo, record.instruments, record.mood
            );
            record.notes = format!("Hybrid: prompt {} x prompt {}", parent.id, partner.id);
        }
        Cohort::Mutation => {
            let mut instruments: Vec<String> = parent
                .instrument_tokens()
                .into_iter()
                .take(2)
                .map(str::to_string)
                .collect();
            if let Some(influence) = &item.influence {
                instruments.push(influence.name.clone());
                record.instruments = instruments.join(", ");
                record.short_prompt = short_prompt(&record, item.tempo);
                record.full_prompt = format!(
                    "{} at {} BPM built on {}. Use: {}. Avoid: {}.",
                    record.genres,
                    item.tempo,
                    record.instruments,
                    influence.elements_to_use,
                    influence.elements_to_avoid
                );
                record.notes = format!(
                    "Mutation: prompt {} + influence #{} ({})",
                    parent.id, influence.id, influence.name
                );
            } else {
                record.instruments = instruments.join(", ");
                record.short_prompt = short_prompt(&record, item.tempo);
                record.notes = format!("Mutation: prompt {}", parent.id);
            }
        }
    }

    record
}

fn short_prompt(record: &PromptRecord, tempo: u32) -> String {
    let tempo = format!("{} BPM", tempo);
    [
        record.genres.as_str(),
        record.instruments.as_str(),
        record.mood.as_str(),
        tempo.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Outcome of a non-interactive generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub time_block: String,
    pub requested: usize,
    pub generated: usize,
    pub split: CohortSplit,
    pub shortfall: usize,
    pub low_diversity: bool,
    pub new_ids: Vec<String>,
    pub influences_used: Vec<String>,
}

/// Plan, materialise and persist new prompts in one pass.
///
/// Both stores are read once. New records and influence usage are applied in
/// memory first, then the prompt file and the influence file are saved back
/// to back. The two files are not committed together: if the influence save
/// fails, the new prompts are already on disk without their usage recorded.
/// Nothing is written if planning fails.
pub fn generate<R: Rng + ?Sized>(
    prompts: &mut PromptStore,
    influences: &mut InfluenceStore,
    time_block: &str,
    count: usize,
    settings: &GenerationSettings,
    rng: &mut R,
) -> Result<GenerationReport> {
    let plan = plan_generation(
        prompts.records(),
        influences.records(),
        time_block,
        count,
        settings,
        rng,
    )?;
    let records = materialize(&plan);

    let new_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    for record in records {
        prompts.append(record)?;
    }

    let mut influences_used = Vec::new();
    for item in plan.items.iter().filter(|i| i.cohort == Cohort::Mutation) {
        let Some(influence) = &item.influence else {
            continue;
        };
        let current = influences
            .find_by_id(&influence.id)
            .map(|inf| inf.used_in_prompts.clone())
            .unwrap_or_default();
        let merged = merge_usage(&current, &[item.id.to_string()]);
        influences.update_fields(
            &influence.id,
            InfluencePatch {
                used_in_prompts: Some(merged),
                ..Default::default()
            },
        )?;
        influences_used.push(influence.id.clone());
    }

    if !new_ids.is_empty() {
        prompts.save()?;
    }
    if !influences_used.is_empty() {
        influences.save()?;
    }

    Ok(GenerationReport {
        time_block: plan.time_block.clone(),
        requested: plan.requested,
        generated: new_ids.len(),
        split: plan.split,
        shortfall: plan.shortfall(),
        low_diversity: plan.low_diversity,
        new_ids,
        influences_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InfluenceStatus;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn prompt(id: &str, block: &str, bpm: &str, rating: &str) -> PromptRecord {
        PromptRecord {
            id: id.into(),
            time_block: block.into(),
            bpm: bpm.into(),
            brain_wave_target: "Alpha".into(),
            duration_type: "Long".into(),
            genres: format!("genre{id}, ambient"),
            instruments: format!("inst{id}a, inst{id}b, inst{id}c"),
            mood: "calm".into(),
            short_prompt: "short".into(),
            full_prompt: "full".into(),
            notes: "hand written".into(),
            generated: "Yes".into(),
            refined: "Yes".into(),
            rating: rating.into(),
        }
    }

    fn influence(id: &str, name: &str) -> InfluenceRecord {
        InfluenceRecord {
            id: id.into(),
            category: "Instruments".into(),
            name: name.into(),
            elements_to_use: "tape warmth".into(),
            elements_to_avoid: "vocals".into(),
            adaptation_notes: String::new(),
            used_in_prompts: String::new(),
            status: InfluenceStatus::Unexplored,
        }
    }

    fn library() -> (Vec<PromptRecord>, Vec<InfluenceRecord>) {
        let prompts = vec![
            prompt("1", "Midday", "90", "Excellent ⭐"),
            prompt("2", "Midday", "100", "very good"),
            prompt("3", "Midday", "120", "meh"),
            prompt("4", "Evening", "70", "excellent"),
            prompt("BONUS-1", "Evening", "", ""),
        ];
        let influences = (1..=10)
            .map(|i| influence(&i.to_string(), &format!("Influence {i}")))
            .collect();
        (prompts, influences)
    }

    #[test]
    fn test_split_sums_and_floors() {
        for n in 0..=200 {
            let split = CohortSplit::standard(n);
            assert_eq!(split.total(), n);
            assert_eq!(split.clones, n * 5 / 10, "clones for {n}");
            assert_eq!(split.hybrids, n * 3 / 10, "hybrids for {n}");
        }
    }

    #[test]
    fn test_tempo_range_ignores_other_blocks_and_blanks() {
        let (prompts, _) = library();
        assert_eq!(observed_tempo_range(&prompts, "Midday"), Some((90, 120)));
        assert_eq!(observed_tempo_range(&prompts, "Evening"), Some((70, 70)));
        assert_eq!(observed_tempo_range(&prompts, "Night"), None);
    }

    #[test]
    fn test_plan_assigns_contiguous_ids_in_cohort_order() {
        let (prompts, influences) = library();
        let mut rng = StdRng::seed_from_u64(11);
        let plan = plan_generation(
            &prompts,
            &influences,
            "Midday",
            10,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(plan.items.len(), 10);
        let ids: Vec<u64> = plan.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, (5..15).collect::<Vec<_>>());
        let cohorts: Vec<Cohort> = plan.items.iter().map(|i| i.cohort).collect();
        assert!(cohorts[..5].iter().all(|c| *c == Cohort::Clone));
        assert!(cohorts[5..8].iter().all(|c| *c == Cohort::Hybrid));
        assert!(cohorts[8..].iter().all(|c| *c == Cohort::Mutation));
        assert!(!plan.low_diversity);
        assert_eq!(plan.parent_count, 2);
    }

    #[test]
    fn test_plan_uses_local_parents_and_observed_tempo() {
        let (prompts, influences) = library();
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_generation(
            &prompts,
            &influences,
            "Midday",
            20,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap();
        for item in &plan.items {
            assert!(item.parent.id == "1" || item.parent.id == "2");
            assert!((90..=120).contains(&item.tempo));
        }
    }

    #[test]
    fn test_no_parents_is_an_error() {
        let (prompts, influences) = library();
        let mut rng = StdRng::seed_from_u64(0);
        let err = plan_generation(
            &prompts,
            &influences,
            "Night",
            5,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, LibraryError::NoEligibleParent { .. }));
    }

    #[test]
    fn test_single_parent_flags_low_diversity() {
        let (prompts, influences) = library();
        let mut rng = StdRng::seed_from_u64(9);
        let plan = plan_generation(
            &prompts,
            &influences,
            "Evening",
            4,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap();
        assert!(plan.low_diversity);
        assert_eq!(plan.items.len(), 4);
        assert!(plan.items.iter().all(|i| i.tempo == 70));
    }

    #[test]
    fn test_mutation_shortfall_trims_output() {
        let (prompts, _) = library();
        let influences = vec![influence("1", "Kalimba")];
        let mut rng = StdRng::seed_from_u64(2);
        let plan = plan_generation(
            &prompts,
            &influences,
            "Midday",
            20,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(plan.split.mutations, 4);
        assert_eq!(plan.count(Cohort::Mutation), 1);
        assert_eq!(plan.items.len(), 17);
        assert_eq!(plan.shortfall(), 3);
    }

    #[test]
    fn test_hybrid_combines_primary_genres_and_two_instruments_each() {
        let item = PlannedItem {
            id: 50,
            cohort: Cohort::Hybrid,
            tempo: 95,
            parent: prompt("1", "Midday", "90", "Excellent"),
            partner: Some(prompt("4", "Evening", "70", "Excellent")),
            influence: None,
            source: None,
        };
        let record = synthesize(&item, "Midday");
        assert_eq!(record.genres, "genre1, genre4");
        assert_eq!(record.instruments, "inst1a, inst1b, inst4a, inst4b");
        assert_eq!(record.bpm, "95");
        assert_eq!(record.time_block, "Midday");
        assert!(record.rating.is_empty());
        assert!(record.generated.is_empty());
        assert!(record.refined.is_empty());
    }

    #[test]
    fn test_mutation_injects_influence_name() {
        let item = PlannedItem {
            id: 51,
            cohort: Cohort::Mutation,
            tempo: 88,
            parent: prompt("2", "Midday", "100", "very good"),
            partner: None,
            influence: Some(influence("7", "Kalimba")),
            source: Some(CandidateSource::Exploration),
        };
        let record = synthesize(&item, "Midday");
        assert_eq!(record.instruments, "inst2a, inst2b, Kalimba");
        assert_eq!(record.genres, "genre2, ambient");
        assert!(record.full_prompt.contains("tape warmth"));
        assert!(record.full_prompt.contains("vocals"));
        assert!(record.notes.contains("#7"));
    }

    #[test]
    fn test_clone_copies_descriptive_fields() {
        let parent = prompt("1", "Midday", "90", "Excellent");
        let item = PlannedItem {
            id: 52,
            cohort: Cohort::Clone,
            tempo: 101,
            parent: parent.clone(),
            partner: None,
            influence: None,
            source: None,
        };
        let record = synthesize(&item, "Midday");
        assert_eq!(record.genres, parent.genres);
        assert_eq!(record.instruments, parent.instruments);
        assert_eq!(record.mood, parent.mood);
        assert_eq!(record.short_prompt, parent.short_prompt);
        assert_eq!(record.full_prompt, parent.full_prompt);
        assert_eq!(record.brain_wave_target, parent.brain_wave_target);
        assert_eq!(record.bpm, "101");
        assert_eq!(record.id, "52");
    }

    #[test]
    fn test_mutations_follow_weighted_share() {
        let mut prompts = vec![
            prompt("1", "Midday", "90", "Excellent"),
            prompt("2", "Midday", "100", "Excellent"),
        ];
        for p in &mut prompts {
            p.instruments = "Rhodes, upright bass".into();
        }
        let influences: Vec<_> = (1..=40)
            .map(|i| {
                let name = if i <= 20 {
                    format!("Rhodes {i}")
                } else {
                    format!("Zither {i}")
                };
                influence(&i.to_string(), &name)
            })
            .collect();

        let mut zither = 0;
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_generation(
                &prompts,
                &influences,
                "Midday",
                20,
                &GenerationSettings::default(),
                &mut rng,
            )
            .unwrap();
            let mutations: Vec<_> = plan
                .items
                .iter()
                .filter(|i| i.cohort == Cohort::Mutation)
                .collect();
            assert_eq!(mutations.len(), 4);
            let weighted: Vec<_> = mutations
                .iter()
                .filter(|i| i.source == Some(CandidateSource::Weighted))
                .filter_map(|i| i.influence.as_ref())
                .collect();
            assert_eq!(weighted.len(), 3, "seed {seed}");
            assert!(weighted.iter().all(|inf| inf.name.starts_with("Rhodes")));
            zither += mutations
                .iter()
                .filter_map(|i| i.influence.as_ref())
                .filter(|inf| inf.name.starts_with("Zither"))
                .count();
        }
        assert!(zither > 0);
    }

    #[test]
    fn test_exhausted_id_space_is_an_error() {
        let (_, influences) = library();
        let prompts = vec![prompt("18446744073709551614", "Midday", "90", "Excellent")];
        let mut rng = StdRng::seed_from_u64(0);
        let err = plan_generation(
            &prompts,
            &influences,
            "Midday",
            3,
            &GenerationSettings::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, LibraryError::Validation { .. }));
    }
}
