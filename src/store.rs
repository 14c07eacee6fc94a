//! On-disk output of a pipeline run.
//!
//! Layout under `output.dir`:
//!
//! ```text
//! index.json                  PeriodMappedData
//! manifest.json               run id, counts, chunk checksums
//! raw/chunk-0000.json         RawRecord[]
//! normalized/chunk-0000.json  NormalizedRecord[]
//! ```
//!
//! A run is written whole into a sibling staging directory and swapped
//! into place at the end. A failure part-way leaves the previous output
//! as it was.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::PeriodMappedData;
use crate::models::{NormalizedRecord, RawRecord};

pub const INDEX_FILE: &str = "index.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const RAW_DIR: &str = "raw";
pub const NORMALIZED_DIR: &str = "normalized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    /// Number of raw chunk files.
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub normalized_records: usize,
    /// Every chunk file written, raw first, paths relative to the output dir.
    pub chunks: Vec<ChunkEntry>,
}

impl Manifest {
    pub fn raw_chunks(&self) -> impl Iterator<Item = &ChunkEntry> {
        let prefix = format!("{}/", RAW_DIR);
        self.chunks
            .iter()
            .filter(move |c| c.file.starts_with(&prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub file: String,
    pub records: usize,
    pub sha256: String,
}

/// Everything one run persists.
pub struct RunOutput<'a> {
    pub raw: &'a [RawRecord],
    pub normalized: &'a [NormalizedRecord],
    pub index: &'a PeriodMappedData,
}

/// Write a complete run into `dir`, replacing whatever was there.
pub fn write_run(dir: &Path, chunk_size: usize, output: &RunOutput<'_>) -> Result<Manifest> {
    if chunk_size == 0 {
        bail!("chunk_size must be >= 1");
    }
    let run_id = Uuid::new_v4().to_string();
    let staging = sibling(dir, &format!("staging-{}", run_id))?;
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("Failed to clear staging dir: {}", staging.display()))?;
    }

    let manifest = match write_tree(&staging, &run_id, chunk_size, output) {
        Ok(manifest) => manifest,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    swap_into_place(&staging, dir, &run_id)?;
    info!(
        dir = %dir.display(),
        run_id = %manifest.run_id,
        records = manifest.total_records,
        chunks = manifest.chunk_count,
        "output written"
    );
    Ok(manifest)
}

fn write_tree(
    root: &Path,
    run_id: &str,
    chunk_size: usize,
    output: &RunOutput<'_>,
) -> Result<Manifest> {
    fs::create_dir_all(root.join(RAW_DIR))
        .with_context(|| format!("Failed to create {}", root.display()))?;
    fs::create_dir_all(root.join(NORMALIZED_DIR))?;

    let mut chunks = write_chunks(root, RAW_DIR, output.raw, chunk_size)?;
    let chunk_count = chunks.len();
    chunks.extend(write_chunks(
        root,
        NORMALIZED_DIR,
        output.normalized,
        chunk_size,
    )?);

    write_json(&root.join(INDEX_FILE), output.index)?;

    let manifest = Manifest {
        run_id: run_id.to_string(),
        generated_at: output.index.metadata.generated_at,
        total_records: output.raw.len(),
        chunk_count,
        chunk_size,
        normalized_records: output.normalized.len(),
        chunks,
    };
    write_json(&root.join(MANIFEST_FILE), &manifest)?;
    Ok(manifest)
}

fn write_chunks<T: Serialize>(
    root: &Path,
    subdir: &str,
    items: &[T],
    chunk_size: usize,
) -> Result<Vec<ChunkEntry>> {
    let mut entries = Vec::new();
    for (i, chunk) in items.chunks(chunk_size).enumerate() {
        let file = format!("{}/chunk-{:04}.json", subdir, i);
        let bytes = serde_json::to_vec_pretty(chunk)?;
        fs::write(root.join(&file), &bytes)
            .with_context(|| format!("Failed to write chunk: {}", file))?;
        debug!(file = %file, records = chunk.len(), "chunk written");
        entries.push(ChunkEntry {
            file,
            records: chunk.len(),
            sha256: sha256_hex(&bytes),
        });
    }
    Ok(entries)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Move `staging` to `dir`, keeping the old tree until the move succeeded.
fn swap_into_place(staging: &Path, dir: &Path, run_id: &str) -> Result<()> {
    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let previous = sibling(dir, &format!("previous-{}", run_id))?;
    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, &previous).with_context(|| {
            format!("Failed to move previous output aside: {}", dir.display())
        })?;
    }

    if let Err(e) = fs::rename(staging, dir) {
        if had_previous {
            let _ = fs::rename(&previous, dir);
        }
        let _ = fs::remove_dir_all(staging);
        return Err(e).with_context(|| format!("Failed to move output into {}", dir.display()));
    }

    if had_previous {
        fs::remove_dir_all(&previous)
            .with_context(|| format!("Failed to remove {}", previous.display()))?;
    }
    Ok(())
}

/// `<parent>/.<name>.<suffix>` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .with_context(|| format!("Output dir has no final component: {}", dir.display()))?;
    Ok(dir.with_file_name(format!(".{}.{}", name.to_string_lossy(), suffix)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    read_json(&dir.join(MANIFEST_FILE))
}

pub fn load_index(dir: &Path) -> Result<PeriodMappedData> {
    read_json(&dir.join(INDEX_FILE))
}

/// Read every raw chunk listed in the manifest, verifying checksums.
pub fn load_raw_records(dir: &Path) -> Result<Vec<RawRecord>> {
    let manifest = load_manifest(dir)?;
    let mut records: Vec<RawRecord> = Vec::with_capacity(manifest.total_records);
    for entry in manifest.raw_chunks() {
        let path = dir.join(&entry.file);
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read chunk: {}", path.display()))?;
        let actual = sha256_hex(&bytes);
        if actual != entry.sha256 {
            bail!(
                "Checksum mismatch for {}: manifest {}, file {}",
                entry.file,
                entry.sha256,
                actual
            );
        }
        let chunk: Vec<RawRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse chunk: {}", entry.file))?;
        records.extend(chunk);
    }
    if records.len() != manifest.total_records {
        bail!(
            "Raw archive holds {} records, manifest says {}",
            records.len(),
            manifest.total_records
        );
    }
    Ok(records)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::dating::PeriodClassifier;
    use crate::models::RecordHeader;
    use crate::periods::PeriodTable;
    use crate::transform::transform_batch;
    use crate::xml::XmlElement;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn raw(id: &str) -> RawRecord {
        let metadata = XmlElement::new("rdf:RDF").with_child(
            XmlElement::new("edm:ProvidedCHO")
                .with_child(XmlElement::new("dc:title").with_text(format!("Kaart {}", id)))
                .with_child(XmlElement::new("dc:date").with_text("1912"))
                .with_child(
                    XmlElement::new("edm:isShownAt")
                        .with_attr("rdf:resource", format!("https://example.org/{}", id)),
                )
                .with_child(
                    XmlElement::new("edm:isShownBy")
                        .with_attr("rdf:resource", format!("https://example.org/{}.jpg", id)),
                ),
        );
        RawRecord {
            header: RecordHeader {
                identifier: Some(id.to_string()),
                datestamp: None,
                set_specs: vec!["postcards".into()],
                deleted: false,
            },
            metadata: Some(metadata),
        }
    }

    fn run(dir: &Path, ids: &[&str], chunk_size: usize) -> Manifest {
        let raw: Vec<RawRecord> = ids.iter().map(|id| raw(id)).collect();
        let outcome = transform_batch(&raw);
        let classifier = PeriodClassifier::with_table(PeriodTable::standard(), 2024);
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let index = aggregate(&outcome.records, &classifier, generated_at);
        write_run(
            dir,
            chunk_size,
            &RunOutput {
                raw: &raw,
                normalized: &outcome.records,
                index: &index,
            },
        )
        .unwrap()
    }

    #[test]
    fn writes_chunked_archives_and_manifest() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data");
        let manifest = run(&out, &["a", "b", "c"], 2);

        assert_eq!(manifest.total_records, 3);
        assert_eq!(manifest.normalized_records, 3);
        assert_eq!(manifest.chunk_count, 2);
        assert_eq!(manifest.chunk_size, 2);
        assert_eq!(manifest.chunks.len(), 4);
        assert!(out.join("raw/chunk-0000.json").exists());
        assert!(out.join("raw/chunk-0001.json").exists());
        assert!(out.join("normalized/chunk-0001.json").exists());
        assert!(out.join(INDEX_FILE).exists());

        assert_eq!(load_manifest(&out).unwrap(), manifest);
        let index = load_index(&out).unwrap();
        assert_eq!(index.metadata.total_records, 3);

        let records = load_raw_records(&out).unwrap();
        let ids: Vec<_> = records
            .iter()
            .filter_map(|r| r.header.identifier.as_deref())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn manifest_uses_camel_case() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data");
        run(&out, &["a"], 100);
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        for key in [
            "runId",
            "generatedAt",
            "totalRecords",
            "chunkCount",
            "chunkSize",
            "normalizedRecords",
            "chunks",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn rerun_replaces_previous_output_and_leaves_no_staging() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data");
        run(&out, &["a", "b", "c"], 1);
        let second = run(&out, &["d"], 1);

        assert!(!out.join("raw/chunk-0001.json").exists());
        assert_eq!(load_manifest(&out).unwrap().run_id, second.run_id);
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["data"]);
    }

    #[test]
    fn tampered_chunk_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data");
        run(&out, &["a"], 10);
        fs::write(out.join("raw/chunk-0000.json"), "[]").unwrap();
        let err = load_raw_records(&out).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn empty_run_writes_zero_chunks() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("data");
        let manifest = run(&out, &[], 10);
        assert_eq!(manifest.chunk_count, 0);
        assert!(manifest.chunks.is_empty());
        assert!(load_raw_records(&out).unwrap().is_empty());
        assert_eq!(load_index(&out).unwrap().periods.len(), 12);
    }

    #[test]
    fn missing_output_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_index(&tmp.path().join("nope")).is_err());
    }
}
