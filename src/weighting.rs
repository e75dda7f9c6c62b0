//! Rating-weighted selection of mutation influences
//!
//! Instruments that keep showing up in top-rated prompts are a signal of what
//! works. Unexplored influences whose name overlaps one of those instruments
//! get a score, and most mutation slots are drawn from the scored pool. The
//! rest are drawn from everything still unexplored so the library keeps
//! wandering into new territory.

use rand::Rng;
use rand::seq::index;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::selection::{QualityTiers, unexplored_influences};
use crate::store::{InfluenceRecord, PromptRecord};

/// Default fraction of picks drawn from the scored pool.
pub const DEFAULT_WEIGHTED_SHARE: f64 = 0.7;

/// An unexplored influence with its overlap score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredInfluence<'a> {
    pub influence: &'a InfluenceRecord,
    pub score: usize,
}

/// Which pool a pick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Weighted,
    Exploration,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Candidate<'a> {
    pub influence: &'a InfluenceRecord,
    pub score: usize,
    pub source: CandidateSource,
}

/// Count lower-cased instrument tokens across every top-tier prompt.
///
/// A token repeated inside one prompt's list counts each time.
pub fn instrument_frequencies(
    prompts: &[PromptRecord],
    top: &QualityTiers,
) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for p in prompts.iter().filter(|p| top.qualifies(&p.rating)) {
        for token in p.instrument_tokens() {
            *freq.entry(token.to_lowercase()).or_insert(0) += 1;
        }
    }
    freq
}

/// Bidirectional substring overlap between an influence name and the
/// instrument vocabulary. Loose on purpose: "Rhodes" matches "fender rhodes".
pub fn match_score(name: &str, freq: &HashMap<String, usize>) -> usize {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return 0;
    }
    freq.iter()
        .filter(|(token, _)| token.contains(&name) || name.contains(token.as_str()))
        .map(|(_, count)| *count)
        .sum()
}

/// Score every unexplored influence, highest first. Ties keep store order.
pub fn score_influences<'a>(
    influences: &'a [InfluenceRecord],
    freq: &HashMap<String, usize>,
) -> Vec<ScoredInfluence<'a>> {
    let mut scored: Vec<_> = unexplored_influences(influences, None)
        .into_iter()
        .map(|influence| ScoredInfluence {
            influence,
            score: match_score(&influence.name, freq),
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Draw up to `k` distinct candidates from `scored`.
///
/// `round(k * weighted_share)` come uniformly from the positively scored
/// pool, the remainder uniformly from whatever has not been picked yet.
/// Either pool running dry is covered by the other; if both are exhausted
/// fewer than `k` are returned.
pub fn select_candidates<'a, R: Rng + ?Sized>(
    scored: &[ScoredInfluence<'a>],
    k: usize,
    weighted_share: f64,
    rng: &mut R,
) -> Vec<Candidate<'a>> {
    let quota = ((k as f64) * weighted_share.clamp(0.0, 1.0)).round() as usize;
    let quota = quota.min(k);

    let positive: Vec<usize> = (0..scored.len()).filter(|&i| scored[i].score > 0).collect();
    let mut taken = vec![false; scored.len()];
    let mut picks = Vec::with_capacity(k.min(scored.len()));

    let weighted = quota.min(positive.len());
    for i in index::sample(rng, positive.len(), weighted) {
        let pos = positive[i];
        taken[pos] = true;
        picks.push(Candidate {
            influence: scored[pos].influence,
            score: scored[pos].score,
            source: CandidateSource::Weighted,
        });
    }

    let rest: Vec<usize> = (0..scored.len()).filter(|&i| !taken[i]).collect();
    let exploratory = (k - picks.len()).min(rest.len());
    for i in index::sample(rng, rest.len(), exploratory) {
        let pos = rest[i];
        picks.push(Candidate {
            influence: scored[pos].influence,
            score: scored[pos].score,
            source: CandidateSource::Exploration,
        });
    }

    debug!(
        "Selected {} mutation candidate(s): {} weighted, {} exploratory (pool {} / {} scored)",
        picks.len(),
        weighted,
        exploratory,
        scored.len(),
        positive.len()
    );
    picks
}

/// Full pipeline: vocabulary from top-tier prompts, scoring, then selection.
pub fn weighted_mutation_influences<'a, R: Rng + ?Sized>(
    prompts: &[PromptRecord],
    influences: &'a [InfluenceRecord],
    top: &QualityTiers,
    k: usize,
    weighted_share: f64,
    rng: &mut R,
) -> Vec<Candidate<'a>> {
    let freq = instrument_frequencies(prompts, top);
    let scored = score_influences(influences, &freq);
    select_candidates(&scored, k, weighted_share, rng)
}

/// Draw the influences for `k` mutation slots.
///
/// The weighted/exploration split is applied to the `k` picks themselves.
/// A pick with a blank name cannot seed a mutation; such slots are refilled
/// from a backup draw of `k * (buffer - 1)` further candidates. Fewer than
/// `k` come back only when the unexplored pool is exhausted.
pub fn mutation_candidates<'a, R: Rng + ?Sized>(
    prompts: &[PromptRecord],
    influences: &'a [InfluenceRecord],
    top: &QualityTiers,
    k: usize,
    weighted_share: f64,
    buffer: usize,
    rng: &mut R,
) -> Vec<Candidate<'a>> {
    let freq = instrument_frequencies(prompts, top);
    let scored = score_influences(influences, &freq);

    let mut picks: Vec<Candidate<'a>> = select_candidates(&scored, k, weighted_share, rng)
        .into_iter()
        .filter(is_usable)
        .collect();

    let missing = k - picks.len();
    if missing > 0 {
        let rest: Vec<ScoredInfluence<'a>> = scored
            .iter()
            .copied()
            .filter(|s| !s.influence.name.trim().is_empty())
            .filter(|s| !picks.iter().any(|p| p.influence.id == s.influence.id))
            .collect();
        let backups = select_candidates(&rest, k * buffer.saturating_sub(1), weighted_share, rng);
        debug!(
            "Refilling {} mutation slot(s) from {} backup candidate(s)",
            missing,
            backups.len()
        );
        picks.extend(backups.into_iter().filter(is_usable).take(missing));
    }
    picks
}

fn is_usable(candidate: &Candidate<'_>) -> bool {
    !candidate.influence.name.trim().is_empty()
}
