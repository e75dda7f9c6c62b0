use anyhow::Result;
use prettytable::{Table, row};
use rand::Rng;

use crate::catalog::{influences, prompts};
use crate::planner::{self, GenerationSettings};
use crate::selection::{QualityTiers, find_parents, list_group_keys};
use crate::store::{InfluenceRecord, InfluenceStatus, InfluenceStore, PromptRecord, PromptStore};
use crate::utils::{resolve_group_key, truncate};
use crate::weighting::{CandidateSource, weighted_mutation_influences};

fn resolve_block(prompts: &[PromptRecord], input: &str) -> Result<String> {
    let keys: Vec<String> = list_group_keys(prompts).into_keys().collect();
    Ok(resolve_group_key(&keys, input)?)
}

fn prompt_table(records: &[&PromptRecord]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["ID", "Time Block", "BPM", "Genres", "Instruments", "Gen", "Rating"]);
    for p in records {
        table.add_row(row![
            p.id,
            p.time_block,
            p.bpm,
            truncate(&p.genres, 30),
            truncate(&p.instruments, 40),
            if p.is_generated() { "✓" } else { "" },
            truncate(&p.rating, 30)
        ]);
    }
    table
}

fn influence_table(records: &[&InfluenceRecord]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["", "ID", "Name", "Category", "Elements To Use", "Used In"]);
    for inf in records {
        table.add_row(row![
            inf.status.icon(),
            inf.id,
            inf.name,
            inf.category,
            truncate(&inf.elements_to_use, 50),
            inf.used_in_prompts
        ]);
    }
    table
}

/// Generate new prompts for a time block, or print the plan as JSON.
pub fn generate<R: Rng + ?Sized>(
    prompt_store: &mut PromptStore,
    influence_store: &mut InfluenceStore,
    settings: &GenerationSettings,
    time_block: &str,
    count: usize,
    plan_only: bool,
    rng: &mut R,
) -> Result<()> {
    let time_block = resolve_block(prompt_store.records(), time_block)?;

    if plan_only {
        let plan = planner::plan_generation(
            prompt_store.records(),
            influence_store.records(),
            &time_block,
            count,
            settings,
            rng,
        )?;
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    let report = planner::generate(
        prompt_store,
        influence_store,
        &time_block,
        count,
        settings,
        rng,
    )?;

    println!(
        "✅ Generated {} prompt(s) for '{}' ({} clones, {} hybrids, {} mutations requested)",
        report.generated,
        report.time_block,
        report.split.clones,
        report.split.hybrids,
        report.split.mutations
    );
    if let (Some(first), Some(last)) = (report.new_ids.first(), report.new_ids.last()) {
        println!("   New IDs: {} - {}", first, last);
    }
    if !report.influences_used.is_empty() {
        println!("   Influences used: {}", report.influences_used.join(", "));
    }
    if report.shortfall > 0 {
        println!(
            "⚠️  Only {} of {} requested: ran out of unexplored influences for {} mutation(s)",
            report.generated, report.requested, report.shortfall
        );
    }
    if report.low_diversity {
        println!(
            "⚠️  Only one parent in '{}'; rate more prompts for variety",
            report.time_block
        );
    }
    Ok(())
}

pub fn list_blocks(prompt_store: &PromptStore, tiers: &QualityTiers) -> Result<()> {
    let records = prompt_store.records();
    let mut table = Table::new();
    table.add_row(row!["Time Block", "Prompts", "Parents"]);
    for (block, count) in list_group_keys(records) {
        let parents = find_parents(records, &block, tiers).len();
        table.add_row(row![block, count, parents]);
    }
    table.printstd();
    Ok(())
}

pub fn show_parents(
    prompt_store: &PromptStore,
    time_block: &str,
    tiers: &QualityTiers,
) -> Result<()> {
    let records = prompt_store.records();
    let time_block = resolve_block(records, time_block)?;
    let parents = find_parents(records, &time_block, tiers);
    if parents.is_empty() {
        println!("No parent prompts in '{}'", time_block);
        return Ok(());
    }
    println!("Parents for '{}':", time_block);
    prompt_table(&parents).printstd();
    Ok(())
}

pub fn show_prompt(prompt_store: &PromptStore, id: &str, verbose: bool) -> Result<()> {
    let p = prompts::get(prompt_store, id)?;
    println!("Prompt #{} ({})", p.id, p.time_block);
    println!("  BPM:         {}", p.bpm);
    println!("  Brain wave:  {}", p.brain_wave_target);
    println!("  Duration:    {}", p.duration_type);
    println!("  Genres:      {}", p.genres);
    println!("  Instruments: {}", p.instruments);
    println!("  Generated:   {}", if p.is_generated() { "Yes" } else { "No" });
    println!("  Refined:     {}", p.refined);
    println!("  Rating:      {}", p.rating);
    if verbose {
        println!("  Mood:        {}", p.mood);
        println!("  Short:       {}", p.short_prompt);
        println!("  Full:        {}", p.full_prompt);
        println!("  Notes:       {}", p.notes);
    }
    Ok(())
}

pub fn find_prompts(prompt_store: &PromptStore, filter: &prompts::PromptFilter) -> Result<()> {
    let found = prompts::find(prompt_store.records(), filter);
    print_prompt_results(&found);
    Ok(())
}

pub fn search_prompts(
    prompt_store: &PromptStore,
    text: &str,
    fields: &[prompts::SearchField],
) -> Result<()> {
    let found = prompts::search(prompt_store.records(), text, fields);
    print_prompt_results(&found);
    Ok(())
}

fn print_prompt_results(found: &[&PromptRecord]) {
    if found.is_empty() {
        println!("No matching prompts");
        return;
    }
    prompt_table(found).printstd();
    println!("{} prompt(s)", found.len());
}

pub fn rate_prompt(prompt_store: &mut PromptStore, id: &str, rating: &str) -> Result<()> {
    prompts::rate(prompt_store, id, rating)?;
    println!("✅ Prompt {} rated: {}", id, rating);
    Ok(())
}

pub fn mark_generated(prompt_store: &mut PromptStore, ids: &[String], all: bool) -> Result<()> {
    let changed = if all {
        prompts::mark_all_generated(prompt_store)?
    } else {
        prompts::mark_generated(prompt_store, ids)?
    };
    println!("✅ Marked {} prompt(s) as generated", changed);
    Ok(())
}

pub fn prompt_stats(prompt_store: &PromptStore) -> Result<()> {
    let stats = prompts::stats(prompt_store.records());
    println!("Total prompts:  {}", stats.total);
    println!("Generated:      {}", stats.generated);
    println!("Rated:          {}", stats.rated);
    println!("Excellent (⭐): {}", stats.excellent);

    let mut table = Table::new();
    table.add_row(row!["Time Block", "Prompts"]);
    for (block, count) in &stats.by_time_block {
        table.add_row(row![block, count]);
    }
    table.printstd();
    Ok(())
}

pub fn influence_list(
    influence_store: &InfluenceStore,
    category: Option<&str>,
    status: Option<InfluenceStatus>,
) -> Result<()> {
    let groups = influences::list(influence_store.records(), category, status);
    if groups.is_empty() {
        println!("No matching influences");
        return Ok(());
    }
    for (category, records) in &groups {
        println!("{} ({})", category, records.len());
        influence_table(records).printstd();
    }
    Ok(())
}

pub fn influence_search(influence_store: &InfluenceStore, text: &str) -> Result<()> {
    let found = influences::search(influence_store.records(), text);
    if found.is_empty() {
        println!("No matching influences");
        return Ok(());
    }
    influence_table(&found).printstd();
    Ok(())
}

pub fn influence_show(influence_store: &InfluenceStore, id: &str) -> Result<()> {
    let inf = influences::get(influence_store, id)?;
    println!("{} #{} {} ({})", inf.status.icon(), inf.id, inf.name, inf.category);
    println!("  Status:  {}", inf.status);
    println!("  Use:     {}", inf.elements_to_use);
    println!("  Avoid:   {}", inf.elements_to_avoid);
    println!("  Notes:   {}", inf.adaptation_notes);
    let used = if inf.is_used() {
        inf.used_in_prompts.as_str()
    } else {
        "-"
    };
    println!("  Used in: {}", used);
    Ok(())
}

pub fn influence_add(
    influence_store: &mut InfluenceStore,
    new: influences::NewInfluence,
) -> Result<()> {
    let record = influences::add(influence_store, new)?;
    println!("✅ Added influence #{}: {}", record.id, record.name);
    Ok(())
}

pub fn influence_mark_used(
    influence_store: &mut InfluenceStore,
    id: &str,
    prompt_ids: &[String],
) -> Result<()> {
    let merged = influences::mark_used(influence_store, id, prompt_ids)?;
    println!("✅ Influence #{} used in: {}", id, merged);
    Ok(())
}

pub fn influence_set_status(
    influence_store: &mut InfluenceStore,
    id: &str,
    status: InfluenceStatus,
) -> Result<()> {
    influences::set_status(influence_store, id, status)?;
    println!("✅ Influence #{} status set to {} {}", id, status.icon(), status);
    Ok(())
}

pub fn influence_suggest<R: Rng + ?Sized>(
    influence_store: &InfluenceStore,
    count: usize,
    category: Option<&str>,
    rng: &mut R,
) -> Result<()> {
    let picks = influences::suggest(influence_store.records(), count, category, rng);
    if picks.is_empty() {
        println!("No unexplored influences left");
        return Ok(());
    }
    influence_table(&picks).printstd();
    Ok(())
}

/// Preview the mutation candidates the generator would draw.
pub fn influence_weighted<R: Rng + ?Sized>(
    prompt_store: &PromptStore,
    influence_store: &InfluenceStore,
    settings: &GenerationSettings,
    count: usize,
    rng: &mut R,
) -> Result<()> {
    let picks = weighted_mutation_influences(
        prompt_store.records(),
        influence_store.records(),
        &settings.top_tiers,
        count,
        settings.weighted_share,
        rng,
    );
    if picks.is_empty() {
        println!("No unexplored influences left");
        return Ok(());
    }
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Category", "Score", "Source"]);
    for c in &picks {
        let source = match c.source {
            CandidateSource::Weighted => "weighted",
            CandidateSource::Exploration => "exploration",
        };
        table.add_row(row![
            c.influence.id,
            c.influence.name,
            c.influence.category,
            c.score,
            source
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn influence_stats(influence_store: &InfluenceStore) -> Result<()> {
    let stats = influences::stats(influence_store.records());
    println!("Total influences: {}", stats.total);
    println!("Used:             {}", stats.used);
    for (status, count) in &stats.by_status {
        println!("  {} {:<11} {}", status.icon(), status.as_str(), count);
    }

    let mut table = Table::new();
    table.add_row(row!["Category", "Influences"]);
    for (category, count) in &stats.by_category {
        table.add_row(row![category, count]);
    }
    table.printstd();
    Ok(())
}
