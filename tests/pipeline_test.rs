//! End-to-end tests: corpus on disk -> split manifest -> token model ->
//! loaded folds -> batches, through the library and through the binary.
//!
//! Each test builds its own corpus in a temp directory.

use glice::dataset::{generate_split, StratumKey, SPLIT_FILE_NAME};
use glice::{DataFold, DatasetConfig, JoernDataset};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const KINDS: [(&str, &str); 6] = [
    ("METHOD", "main"),
    ("CALL", "strcpy(buf, src)"),
    ("IDENTIFIER", "buf"),
    ("LITERAL", "0"),
    ("RETURN", "return 0;"),
    ("CALL", "query(sql)"),
];

/// Graph with `n` nodes drawn from a small descriptor set, a chain of AST
/// edges and a few CFG / reaching-def edges
fn graph_json(file_path: &str, label: &str, cwe: u32, n: usize) -> String {
    let nodes: Vec<String> = (0..n)
        .map(|i| {
            let (kind, value) = KINDS[i % KINDS.len()];
            format!(r#"{{"nodeType": "{}", "value": "{}"}}"#, kind, value)
        })
        .collect();
    let chain: Vec<String> = (1..n)
        .map(|i| format!(r#"{{"from": {}, "to": {}}}"#, i - 1, i))
        .collect();
    let skip: Vec<String> = (2..n)
        .step_by(2)
        .map(|i| format!(r#"{{"from": {}, "to": {}}}"#, i - 2, i))
        .collect();

    format!(
        r#"{{"filePath": "{}", "label": "{}", "cwe": {}, "nodes": [{}],
            "astEdges": [{}], "cfgEdges": [{}], "reachingDefEdges": [{}], "cdgEdges": []}}"#,
        file_path,
        label,
        cwe,
        nodes.join(", "),
        chain.join(", "),
        skip.join(", "),
        skip.join(", ")
    )
}

/// Two strata (CWE-476 in C, CWE-89 in Java), each 6 safe / 12 unsafe
fn create_corpus() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("graphs");
    std::fs::create_dir(&data).unwrap();

    let mut index = 0;
    for (cwe, ext) in [(476, "c"), (89, "java")] {
        for i in 0..18 {
            let label = if i < 6 { "good" } else { "bad" };
            let content = graph_json(
                &format!("testcases/CWE{}_{}.{}", cwe, i, ext),
                label,
                cwe,
                3 + (i % 6),
            );
            std::fs::write(data.join(format!("sample_{:03}.json", index)), content).unwrap();
            index += 1;
        }
    }
    (dir, data)
}

fn small_config() -> DatasetConfig {
    DatasetConfig::default()
        .with_overrides(
            r#"{"w2v_vector_size": 8, "w2v_min_count": 1, "w2v_epochs": 1, "max_nodes_per_batch": 20}"#,
        )
        .unwrap()
}

fn open_dataset(root: &Path, data: &Path) -> JoernDataset {
    JoernDataset::new(0, data, data, root.join("cache"), small_config())
        .unwrap()
        .with_manifest(root.join(SPLIT_FILE_NAME))
}

#[test]
fn test_full_pipeline() {
    let (dir, data) = create_corpus();
    let manifest = generate_split(&data, &dir.path().join(SPLIT_FILE_NAME), 4, 42).unwrap();

    let mut dataset = open_dataset(dir.path(), &data);
    dataset.load_data(None).unwrap();

    // Token model persisted under its parameter key
    assert!(dir.path().join("cache/word2vec_vs8_w5.model").exists());
    assert_eq!(dataset.node_feature_shape(), [8]);
    assert_eq!(dataset.num_edge_types(), 11);

    // Evaluation folds are loaded as listed in the manifest
    for fold in [DataFold::Validation, DataFold::Test] {
        let listed = manifest.filenames(0, fold);
        let loaded: Vec<String> = dataset
            .filenames(fold)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(loaded, listed);
    }

    // Training fold is balanced in every stratum
    let mut strata: HashMap<StratumKey, (usize, usize)> = HashMap::new();
    for record in dataset.records(DataFold::Train).unwrap() {
        let counts = strata
            .entry(StratumKey::of(&record.meta, &dataset.config().stratify_by))
            .or_default();
        if record.is_safe() {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
    }
    assert_eq!(strata.len(), 2);
    for (key, (safe, unsafe_)) in &strata {
        assert_eq!(safe, unsafe_, "stratum {key} is unbalanced");
    }

    // Batches cover every training graph and respect the node ceiling
    let records = dataset.records(DataFold::Train).unwrap();
    let mut graphs = 0;
    for batch in dataset.batches(DataFold::Train).unwrap() {
        graphs += batch.num_graphs_in_batch;
        assert!(batch.num_nodes() <= 20);
        assert_eq!(batch.adjacency_lists.len(), 11);
        assert_eq!(batch.flat_node_features().len(), batch.num_nodes() * 8);
    }
    assert_eq!(graphs, records.len());
}

#[test]
fn test_shuffle_is_seeded_and_preserves_records() {
    let (dir, data) = create_corpus();
    generate_split(&data, &dir.path().join(SPLIT_FILE_NAME), 4, 42).unwrap();

    let mut first = open_dataset(dir.path(), &data);
    first.load_data(Some(&[DataFold::Test])).unwrap();
    let original: Vec<String> = first
        .filenames(DataFold::Test)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    first.shuffle(DataFold::Test).unwrap();
    let shuffled: Vec<String> = first
        .filenames(DataFold::Test)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();

    let mut sorted_a = original.clone();
    let mut sorted_b = shuffled.clone();
    sorted_a.sort();
    sorted_b.sort();
    assert_eq!(sorted_a, sorted_b);

    // Same seed, same permutation; model is reused from the cache
    let mut second = open_dataset(dir.path(), &data);
    second.load_data(Some(&[DataFold::Test])).unwrap();
    second.shuffle(DataFold::Test).unwrap();
    let again: Vec<&str> = second.filenames(DataFold::Test).unwrap();
    assert_eq!(again, shuffled.iter().map(String::as_str).collect::<Vec<_>>());

    assert!(!second.is_loaded(DataFold::Train));
    assert!(second.batches(DataFold::Train).is_err());
}

#[test]
fn test_malformed_graph_fails_the_load() {
    let (dir, data) = create_corpus();
    generate_split(&data, &dir.path().join(SPLIT_FILE_NAME), 4, 42).unwrap();

    // Train the model first, then corrupt a file listed in the test fold
    let mut dataset = open_dataset(dir.path(), &data);
    dataset.load_data(Some(&[DataFold::Test])).unwrap();
    let victim = dataset.filenames(DataFold::Test).unwrap()[0].to_string();
    std::fs::write(data.join(&victim), r#"{"label": "good", "nodes": []}"#).unwrap();

    let mut dataset = open_dataset(dir.path(), &data);
    let err = dataset.load_data(Some(&[DataFold::Test])).unwrap_err();
    assert!(err.to_string().contains("astEdges"), "{err}");
}

#[test]
fn test_binary_split_then_batches() {
    let (dir, data) = create_corpus();
    let bin = env!("CARGO_BIN_EXE_glice");

    let split = Command::new(bin)
        .current_dir(dir.path())
        .args(["split", data.to_str().unwrap(), "--n-splits", "3"])
        .output()
        .unwrap();
    assert!(split.status.success(), "{}", String::from_utf8_lossy(&split.stderr));
    assert!(dir.path().join(SPLIT_FILE_NAME).exists());

    let batches = Command::new(bin)
        .current_dir(dir.path())
        .args([
            "--cache-dir",
            "cache",
            "--data-params-override",
            r#"{"w2v_vector_size": 8, "w2v_min_count": 1, "w2v_epochs": 1, "max_nodes_per_batch": 20}"#,
            "batches",
            data.to_str().unwrap(),
            "--split-index",
            "1",
            "--fold",
            "valid",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(
        batches.status.success(),
        "{}",
        String::from_utf8_lossy(&batches.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&batches.stdout).unwrap();
    assert_eq!(summary["split_index"], 1);
    assert_eq!(summary["fold"], "VALIDATION");
    assert_eq!(summary["num_edge_types"], 11);
    assert_eq!(summary["node_feature_shape"][0], 8);

    let graphs: u64 = summary["batches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["graphs"].as_u64().unwrap())
        .sum();
    assert_eq!(graphs, summary["graphs"].as_u64().unwrap());
}

#[test]
fn test_binary_reports_missing_manifest() {
    let (dir, data) = create_corpus();
    let output = Command::new(env!("CARGO_BIN_EXE_glice"))
        .current_dir(dir.path())
        .args(["--cache-dir", "cache", "batches", data.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("split manifest"), "{stderr}");
}
