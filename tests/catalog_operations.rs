mod common;

use prompt_library::catalog::{influences, prompts};
use prompt_library::store::{InfluenceStatus, InfluenceStore, PromptStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

use common::write_library;

#[test]
fn test_add_influence_assigns_next_id_and_persists() {
    let dir = tempdir().unwrap();
    let (_, influences_path) = write_library(dir.path());
    let mut store = InfluenceStore::open(&influences_path).unwrap();

    let added = influences::add(
        &mut store,
        influences::NewInfluence {
            category: "Instruments".into(),
            name: "Hang drum".into(),
            elements_to_use: "soft overtones".into(),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(added.id, "9");
    assert_eq!(added.status, InfluenceStatus::Unexplored);

    let reopened = InfluenceStore::open(&influences_path).unwrap();
    assert_eq!(reopened.find_by_id("9").unwrap().name, "Hang drum");
}

#[test]
fn test_mark_used_merges_across_calls() {
    let dir = tempdir().unwrap();
    let (_, influences_path) = write_library(dir.path());
    let mut store = InfluenceStore::open(&influences_path).unwrap();

    influences::mark_used(&mut store, "2", &["12".to_string(), "3".to_string()]).unwrap();
    let merged =
        influences::mark_used(&mut store, "2", &["3".to_string(), "101".to_string()]).unwrap();
    assert_eq!(merged, "3, 12, 101");

    let reopened = InfluenceStore::open(&influences_path).unwrap();
    assert_eq!(reopened.find_by_id("2").unwrap().used_in_prompts, "3, 12, 101");
}

#[test]
fn test_set_status_and_suggest() {
    let dir = tempdir().unwrap();
    let (_, influences_path) = write_library(dir.path());
    let mut store = InfluenceStore::open(&influences_path).unwrap();

    for id in ["1", "2", "6"] {
        influences::set_status(&mut store, id, InfluenceStatus::Tested).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(21);
    let picks = influences::suggest(store.records(), 10, Some("instruments"), &mut rng);
    assert!(picks.is_empty());

    let err = influences::set_status(&mut store, "404", InfluenceStatus::Proven).unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[test]
fn test_rate_and_mark_all_generated() {
    let dir = tempdir().unwrap();
    let (prompts_path, _) = write_library(dir.path());
    let mut store = PromptStore::open(&prompts_path).unwrap();

    prompts::rate(&mut store, "5", "Excellent ⭐ calm and airy").unwrap();
    let mut cleared = store.records().to_vec();
    for p in &mut cleared {
        p.generated.clear();
    }
    let mut store = PromptStore::from_records(&prompts_path, cleared).unwrap();
    let changed = prompts::mark_all_generated(&mut store).unwrap();
    assert_eq!(changed, 6);

    let reopened = PromptStore::open(&prompts_path).unwrap();
    let stats = prompts::stats(reopened.records());
    assert_eq!(stats.generated, 6);
    assert_eq!(stats.excellent, 2);
    assert_eq!(stats.by_time_block["Midday Refresh"], 3);
}
