mod support;

use std::fs;
use std::path::Path;

use dsforge::config::{CreateConfig, parse_create_config};
use dsforge::dataset::pipeline::{COMPLETE_DIR, SPLITS_DIR, TEST_DIR};
use dsforge::dataset::{
    CreateInput, CreateOutput, Dataset, DatasetError, Stage, assemble, process_result,
};
use dsforge::interaction::{BatchInteraction, ScriptedAnswer, ScriptedInteraction};
use dsforge::local_cache::LocalCache;
use dsforge::plugins::copy::{CopyPlugin, INDEX_FILE_NAME, LABELS_FILE_NAME, TaggedRecord};
use dsforge::store::{ArtifactKind, ImagesetStore, LocalDirStore};
use support::dsforge_env::DsforgeEnvGuard;
use support::imagesets::{ImagesetBuilder, count_with_suffix, read_lines};
use tempfile::tempdir;

fn config(extra: &str) -> CreateConfig {
    let text = format!(
        r#"
dataset_name = "orbit_v1"
imageset = ["orbit"]
upload = false
delete_local = false
{extra}

[metadata]
created_by = "A. Tester"
comments = "fixture run"

[plugin]
"#
    );
    parse_create_config(&text).expect("parse config")
}

fn batch_input(
    config: CreateConfig,
    cache: &LocalCache,
    store: &dyn ImagesetStore,
) -> Result<CreateInput, DatasetError> {
    CreateInput::new(config, "copy", cache, store, &mut BatchInteraction)
}

fn run_copy(input: &CreateInput) -> Result<dsforge::dataset::PipelineReport, DatasetError> {
    let plugin = CopyPlugin::from_table(&input.plugin_config)?;
    assemble(plugin, input, &mut BatchInteraction)
}

#[test]
fn ten_records_produce_two_two_six_layout() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit").numbered(10, "earth");
    let store = LocalDirStore::new(&store_root);
    let cache = LocalCache::new(dir.path().join("cache"));

    let input = batch_input(config(""), &cache, &store).unwrap();
    let report = run_copy(&input).unwrap();
    let root = input.dataset_root();
    assert_eq!(report.dataset_root, root);
    assert_eq!(report.discovered, 10);
    assert_eq!(report.selected, 10);

    assert_eq!(count_with_suffix(&root.join(TEST_DIR), ".json"), 2);
    let complete = root.join(SPLITS_DIR).join(COMPLETE_DIR);
    let dev_test = read_lines(&complete.join("test").join(INDEX_FILE_NAME));
    let dev_train = read_lines(&complete.join("train").join(INDEX_FILE_NAME));
    assert_eq!(dev_test.len(), 2);
    assert_eq!(dev_train.len(), 6);
    assert_eq!(count_with_suffix(&complete.join("train"), ".png"), 6);

    let first: TaggedRecord = serde_json::from_str(&dev_train[0]).unwrap();
    assert_eq!(first.image_id, "0004");
    assert_eq!(first.tags, vec!["earth".to_string()]);

    let dataset = Dataset::open(root.clone()).unwrap();
    assert_eq!(dataset.name, "orbit_v1");
    let ids: Vec<&str> = dataset.metadata.image_ids.iter().map(|(_, id)| id.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|idx| format!("{idx:04}")).collect();
    assert_eq!(ids, expected);
    assert!(dataset.metadata.image_ids.iter().all(|(label, _)| label == "orbit"));
    assert_eq!(dataset.metadata.training_type, "copy");
    assert_eq!(dataset.metadata.test_percent, None);
    assert_eq!(fs::read_to_string(root.join(LABELS_FILE_NAME)).unwrap(), "earth\n");

    let output = CreateOutput::decide(&input, &mut BatchInteraction).unwrap();
    let processed = process_result(&output, &store).unwrap();
    assert_eq!(processed.local_path, Some(root));
}

#[test]
fn out_of_range_test_percent_creates_nothing() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit").numbered(3, "earth");
    let target = dir.path().join("datasets");
    let cache = LocalCache::new(dir.path().join("cache"));
    let config = config(&format!(
        "test_percent = 1.5\ndataset_path = {:?}",
        target.display().to_string()
    ));

    let err = CreateInput::new(
        config,
        "copy",
        &cache,
        &LocalDirStore::new(&store_root),
        &mut BatchInteraction,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DatasetError::Configuration { ref field, .. } if field == "test_percent"
    ));
    assert!(!target.exists());
    assert!(!cache.exists());
}

#[test]
fn empty_selection_fails_before_any_copy() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit")
        .record("a", &["earth"])
        .record("b", &["moon"]);
    let cache = LocalCache::new(dir.path().join("cache"));
    let config = config(
        r#"
[[filter.groups]]
name = "both"
[[filter.groups.filters]]
type = "AND"
tags = ["earth", "moon"]
"#,
    );
    let input = batch_input(config, &cache, &LocalDirStore::new(&store_root)).unwrap();

    let err = run_copy(&input).unwrap_err();
    assert!(matches!(err, DatasetError::EmptyDataset { stage: Stage::Materialize }));
    assert!(!input.scratch_dir.exists());
    assert!(!input.dataset_root().exists());
}

#[test]
fn configured_groups_are_recorded_in_metadata() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit")
        .record("01", &["earth", "dark"])
        .record("02", &["earth"])
        .record("03", &["moon"])
        .record("04", &[])
        .record("05", &["earth", "moon"]);
    let cache = LocalCache::new(dir.path().join("cache"));
    let config = config(
        r#"
test_percent = 0.0
kfolds = 3

[[filter.groups]]
name = "earthish"
take = 2
[[filter.groups.filters]]
type = "OR"
tags = ["earth"]

[[filter.groups]]
name = "blank"
[[filter.groups.filters]]
type = "AND"
tags = ["untagged"]
"#,
    );
    let input = batch_input(config, &cache, &LocalDirStore::new(&store_root)).unwrap();
    let report = run_copy(&input).unwrap();
    assert_eq!(report.selected, 3);
    assert_eq!(report.split.test, 0);
    assert_eq!(report.split.dev_train, 3);

    let metadata = Dataset::open(input.dataset_root()).unwrap().metadata;
    let ids: Vec<&str> = metadata.image_ids.iter().map(|(_, id)| id.as_str()).collect();
    assert_eq!(ids, vec!["01", "02", "04"]);
    assert_eq!(metadata.kfolds, Some(3));
    assert_eq!(metadata.test_percent, Some(0.0));
    let groups: Vec<(&str, usize)> = metadata
        .filters
        .groups
        .iter()
        .map(|group| (group.name.as_str(), group.number_included))
        .collect();
    assert_eq!(groups, vec![("earthish", 2), ("blank", 1)]);

    let labels = read_lines(&input.dataset_root().join(LABELS_FILE_NAME));
    assert_eq!(labels, vec!["dark", "earth", "untagged"]);
}

#[test]
fn interactive_filter_runs_through_the_oracle() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit")
        .record("1", &["earth"])
        .record("2", &["moon"])
        .record("3", &["earth", "moon"]);
    let cache = LocalCache::new(dir.path().join("cache"));
    let config = config("[filter]\ninteractive = true");
    let input = batch_input(config, &cache, &LocalDirStore::new(&store_root)).unwrap();

    let mut oracle = ScriptedInteraction::new([
        ScriptedAnswer::ChooseMany(vec!["moon".into()]),
        ScriptedAnswer::Choose("OR (union)".into()),
        ScriptedAnswer::Confirm(false),
        ScriptedAnswer::Text("moons".into()),
        ScriptedAnswer::Confirm(false),
        ScriptedAnswer::Text(String::new()),
    ]);
    let plugin = CopyPlugin::from_table(&input.plugin_config).unwrap();
    let report = assemble(plugin, &input, &mut oracle).unwrap();
    assert_eq!(oracle.remaining(), 0);
    assert_eq!(report.selected, 2);

    let metadata = Dataset::open(input.dataset_root()).unwrap().metadata;
    assert_eq!(metadata.filters.groups[0].name, "moons");
    assert_eq!(metadata.filters.groups[0].image_ids.len(), 2);
}

#[test]
fn batch_mode_cannot_answer_interactive_filter() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit").numbered(2, "earth");
    let cache = LocalCache::new(dir.path().join("cache"));
    let input = CreateInput::new(
        config("[filter]\ninteractive = true"),
        "copy",
        &cache,
        &LocalDirStore::new(&store_root),
        &mut BatchInteraction,
    )
    .unwrap();
    let err = run_copy(&input).unwrap_err();
    assert!(matches!(err, DatasetError::Configuration { ref field, .. } if field == "prompt"));
}

#[test]
fn rerun_replaces_previous_output() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    let imageset = ImagesetBuilder::new(&store_root, "orbit").numbered(5, "earth");
    let cache = LocalCache::new(dir.path().join("cache"));
    let store = LocalDirStore::new(&store_root);

    let first = batch_input(config(""), &cache, &store).unwrap();
    run_copy(&first).unwrap();
    fs::remove_file(imageset.path().join("meta_0004.json")).unwrap();

    let second = batch_input(config(""), &cache, &store).unwrap();
    let report = run_copy(&second).unwrap();
    assert_eq!(report.discovered, 4);
    assert_eq!(count_with_suffix(&second.scratch_dir, ".json"), 4);
    let metadata = Dataset::open(second.dataset_root()).unwrap().metadata;
    assert_eq!(metadata.image_ids.len(), 4);
}

#[test]
fn upload_then_delete_moves_dataset_into_store() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit").numbered(5, "earth");
    let store = LocalDirStore::new(&store_root);
    let cache = LocalCache::new(dir.path().join("cache"));
    let config = CreateConfig {
        upload: Some(true),
        delete_local: Some(true),
        ..config("")
    };

    let input = CreateInput::new(config, "copy", &cache, &store, &mut BatchInteraction).unwrap();
    run_copy(&input).unwrap();
    let output = CreateOutput::decide(&input, &mut BatchInteraction).unwrap();
    let processed = process_result(&output, &store).unwrap();

    assert!(processed.uploaded);
    assert!(!input.dataset_root().exists());
    assert_eq!(
        store.list_available(ArtifactKind::Dataset).unwrap(),
        vec!["orbit_v1".to_string()]
    );
    let uploaded = Dataset::open(store_root.join("datasets/orbit_v1")).unwrap();
    assert_eq!(uploaded.metadata.image_ids.len(), 5);
}

#[test]
fn plugin_cache_lives_under_dsforge_home() {
    let dir = tempdir().unwrap();
    let _env = DsforgeEnvGuard::set_home(dir.path().join("home"));
    let cache = LocalCache::for_plugin("copy").unwrap();
    assert_eq!(cache.path(), dir.path().join("home/.dsforge/copy"));

    let store_root = dir.path().join("store");
    ImagesetBuilder::new(&store_root, "orbit").numbered(5, "earth");
    let input = CreateInput::new(
        config(""),
        "copy",
        &cache,
        &LocalDirStore::new(&store_root),
        &mut BatchInteraction,
    )
    .unwrap();
    assert!(input.in_cache);
    assert!(input.dataset_root().starts_with(cache.path()));
    run_copy(&input).unwrap();
    assert!(input.dataset_root().join("metadata.json").is_file());
    assert!(Path::new(&input.scratch_dir).starts_with(cache.path()));
}
