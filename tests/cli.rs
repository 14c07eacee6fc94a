use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use tempfile::TempDir;

use postcard_periods::aggregate::aggregate;
use postcard_periods::dating::PeriodClassifier;
use postcard_periods::models::{RawRecord, RecordHeader};
use postcard_periods::store::{self, RunOutput};
use postcard_periods::transform::transform_batch;
use postcard_periods::xml::XmlElement;

fn pcx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pcx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[source]
base_url = "https://oai.example.org/provider"

[harvest]
max_retries = 2
retry_delay_ms = 10

[output]
dir = "{}/data"
chunk_size = 2
"#,
        root.display()
    );

    let config_path = config_dir.join("pcx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn raw(id: &str, date: &str, subjects: &[&str]) -> RawRecord {
    let mut cho = XmlElement::new("edm:ProvidedCHO")
        .with_child(XmlElement::new("dc:title").with_text(format!("Kaart {}", id)))
        .with_child(XmlElement::new("dc:date").with_text(date))
        .with_child(
            XmlElement::new("edm:isShownAt")
                .with_attr("rdf:resource", format!("https://muis.example/{}", id)),
        )
        .with_child(
            XmlElement::new("edm:isShownBy")
                .with_attr("rdf:resource", format!("https://muis.example/{}.jpg", id)),
        );
    for subject in subjects {
        cho = cho.with_child(
            XmlElement::new("dc:subject")
                .with_attr("xml:lang", "et")
                .with_text(*subject),
        );
    }
    RawRecord {
        header: RecordHeader {
            identifier: Some(format!("oai:{}", id)),
            datestamp: None,
            set_specs: vec!["postcards".into()],
            deleted: false,
        },
        metadata: Some(XmlElement::new("rdf:RDF").with_child(cho)),
    }
}

/// Persist a previous run directly through the library.
fn seed_output(dir: &Path) {
    let raw = vec![
        raw("1", "1912", &["linnavaated"]),
        raw("2", "1975", &["portreed", "fotod"]),
        raw("3", "[193-?]", &[]),
    ];
    let outcome = transform_batch(&raw);
    let index = aggregate(&outcome.records, &PeriodClassifier::new(), Utc::now());
    store::write_run(
        dir,
        2,
        &RunOutput {
            raw: &raw,
            normalized: &outcome.records,
            index: &index,
        },
    )
    .unwrap();
}

fn run_pcx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pcx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pcx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_map_date_without_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_pcx(&missing, &["map-date", "1941-1943"]);
    assert!(success, "map-date failed: stderr={}", stderr);
    let mapping: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(mapping["rawDate"], "1941-1943");
    assert_eq!(mapping["mappedPeriod"], "WARTIME");
    assert_eq!(mapping["potentialPeriods"], serde_json::json!(["WARTIME"]));
    assert_eq!(mapping["confidence"], "medium");
}

#[test]
fn test_map_date_exact_year_is_high() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_pcx(&config_path, &["map-date", "1905"]);
    assert!(success);
    let mapping: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(mapping["mappedPeriod"], "TSARIST_ERA");
    assert_eq!(mapping["confidence"], "high");
    assert!(mapping.get("visualVerification").is_none());
}

#[test]
fn test_rebuild_from_raw_archive() {
    let (tmp, config_path) = setup_test_env();
    seed_output(&tmp.path().join("data"));

    let (stdout, stderr, success) = run_pcx(&config_path, &["rebuild"]);
    assert!(success, "rebuild failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("harvested: 3"));
    assert!(stdout.contains("transformed: 3"));
    assert!(stdout.contains("TSARIST_ERA: 1"));
    assert!(stdout.contains("STAGNATION_ERA: 1"));
    assert!(stdout.contains("ERA_OF_SILENCE: 1"));
    assert!(stdout.trim_end().ends_with("ok"));

    let manifest = store::load_manifest(&tmp.path().join("data")).unwrap();
    assert_eq!(manifest.chunk_count, 2);
}

#[test]
fn test_rebuild_without_archive_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_pcx(&config_path, &["rebuild"]);
    assert!(!success);
    assert!(stderr.contains("manifest.json"), "stderr={}", stderr);
}

#[test]
fn test_stats_summarizes_index() {
    let (tmp, config_path) = setup_test_env();
    seed_output(&tmp.path().join("data"));

    let (stdout, stderr, success) = run_pcx(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Records:     3"));
    assert!(stdout.contains("high 2"));
    assert!(stdout.contains("low 1"));
    assert!(stdout.contains("portrait_photo"));
    assert!(stdout.contains("STAGNATION_ERA"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("pcx.toml");
    fs::write(
        &config_path,
        "[source]\nbase_url = \"ftp://nope\"\n[output]\ndir = \"d\"\n",
    )
    .unwrap();
    let (_, stderr, success) = run_pcx(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("base_url"), "stderr={}", stderr);
}

#[test]
fn test_unknown_progress_mode_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_pcx(&config_path, &["sync", "--progress", "loud"]);
    assert!(!success);
    assert!(stderr.contains("Unknown progress mode"), "stderr={}", stderr);
}

#[test]
fn test_zero_limit_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_pcx(&config_path, &["sync", "--limit", "0", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("--limit must be >= 1"), "stderr={}", stderr);
}

#[test]
fn test_stats_warns_on_corrupt_manifest() {
    let (tmp, config_path) = setup_test_env();
    let data = tmp.path().join("data");
    seed_output(&data);
    fs::write(data.join("manifest.json"), "{ not json").unwrap();

    let (stdout, stderr, success) = run_pcx(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Records:     3"));
    assert!(!stdout.contains("Archived:"));
    assert!(stderr.contains("could not read manifest"), "stderr={}", stderr);
}
