#![allow(dead_code)]

use prompt_library::store::{InfluenceRecord, InfluenceStatus, PromptRecord, save_records};
use std::path::{Path, PathBuf};

pub fn prompt(id: &str, block: &str, bpm: &str, instruments: &str, rating: &str) -> PromptRecord {
    PromptRecord {
        id: id.into(),
        time_block: block.into(),
        bpm: bpm.into(),
        brain_wave_target: "Alpha (8-12 Hz)".into(),
        duration_type: "Extended".into(),
        genres: "lounge jazz, downtempo".into(),
        instruments: instruments.into(),
        mood: "warm, focused".into(),
        short_prompt: "lounge jazz, rhodes, 90 BPM".into(),
        full_prompt: "Mellow lounge jazz with \"brushed\" drums".into(),
        notes: String::new(),
        generated: "Yes".into(),
        refined: "Yes".into(),
        rating: rating.into(),
    }
}

pub fn influence(id: &str, category: &str, name: &str) -> InfluenceRecord {
    InfluenceRecord {
        id: id.into(),
        category: category.into(),
        name: name.into(),
        elements_to_use: "warm saturation".into(),
        elements_to_avoid: "vocals".into(),
        adaptation_notes: String::new(),
        used_in_prompts: String::new(),
        status: InfluenceStatus::Unexplored,
    }
}

pub fn sample_prompts() -> Vec<PromptRecord> {
    vec![
        prompt("1", "Midday Refresh", "92", "Rhodes, upright bass, brushed drums", "Excellent ⭐"),
        prompt("2", "Midday Refresh", "104", "Vibraphone, rhodes", "very good"),
        prompt("3", "Midday Refresh", "98", "Synth pad", "Okay"),
        prompt("4", "Deep Focus", "70", "Cello, rhodes", "Excellent"),
        prompt("BONUS-1", "Deep Focus", "", "Piano", ""),
        prompt("5", "Evening Wind Down", "65", "Harp", ""),
    ]
}

pub fn sample_influences() -> Vec<InfluenceRecord> {
    vec![
        influence("1", "Instruments", "Rhodes Mark I"),
        influence("2", "Instruments", "Kalimba"),
        influence("3", "Artists", "Nujabes"),
        influence("4", "Artists", "Bonobo"),
        influence("5", "Production", "Tape saturation"),
        influence("6", "Instruments", "Upright Bass"),
        influence("7", "Genres", "Bossa nova"),
        influence("8", "Genres", "Dub"),
    ]
}

/// Write both sample libraries into `dir` and return their paths.
pub fn write_library(dir: &Path) -> (PathBuf, PathBuf) {
    let prompts = dir.join("programming_music_prompts.csv");
    let influences = dir.join("influences_library.csv");
    save_records(&prompts, &sample_prompts()).unwrap();
    save_records(&influences, &sample_influences()).unwrap();
    (prompts, influences)
}
