//! JSONL import/export: one JSON document per line.
//!
//! Import skips blank lines and reports malformed lines with their 1-based
//! line number instead of aborting the batch. Export writes to a `.tmp`
//! sibling and renames it into place so readers never see a partial file.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::errors::{AgdError, Result};
use crate::store::sqlite::DocumentStore;

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: u64,
    pub skipped_blank: u64,
    pub rejected: Vec<RejectedLine>,
}

/// A line that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    pub line: u64,
    pub reason: String,
}

/// Import every line of `path` into `collection`.
///
/// An `_id` (plain string or `{"$oid": ...}`) is kept as the document id and
/// removed from the body; other documents get a fresh id.
pub fn import_file(store: &DocumentStore, collection: &str, path: &Path) -> Result<ImportReport> {
    let file = File::open(path).map_err(|source| AgdError::io(path, source))?;
    let mut report = ImportReport::default();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line.map_err(|source| AgdError::io(path, source))?;
        if line.trim().is_empty() {
            report.skipped_blank += 1;
            continue;
        }
        match import_line(store, collection, &line) {
            Ok(()) => report.imported += 1,
            Err(error) => report.rejected.push(RejectedLine {
                line: line_no,
                reason: error.to_string(),
            }),
        }
    }

    tracing::info!(
        collection,
        imported = report.imported,
        rejected = report.rejected.len(),
        "jsonl import finished"
    );
    Ok(report)
}

fn import_line(store: &DocumentStore, collection: &str, line: &str) -> Result<()> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(mut body) = value else {
        return Err(AgdError::InvalidDocument {
            details: "line is not a JSON object".to_string(),
        });
    };
    match take_id(&mut body) {
        Some(id) => store.insert_with_id(collection, &id, &Value::Object(body))?,
        None => store.insert(collection, &Value::Object(body))?,
    };
    Ok(())
}

fn take_id(body: &mut Map<String, Value>) -> Option<String> {
    let id = match body.get("_id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Object(inner) => inner.get("$oid")?.as_str()?.trim().to_string(),
        _ => return None,
    };
    body.remove("_id");
    (!id.is_empty()).then_some(id)
}

/// Write the newest `limit` documents of `collection` to `path`, each body
/// carrying its `_id`. Lines are in insertion order (oldest first), so
/// [`import_file`] replays them with the same recency order. Returns the
/// number of lines written.
pub fn export_file(
    store: &DocumentStore,
    collection: &str,
    limit: u32,
    path: &Path,
) -> Result<u64> {
    let docs = store.list_recent(collection, limit)?;
    let tmp_path = path.with_extension("jsonl.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AgdError::io(parent, source))?;
    }

    let result = (|| -> Result<u64> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|source| AgdError::io(&tmp_path, source))?;
        let mut writer = BufWriter::new(file);
        let mut written = 0_u64;
        for doc in docs.into_iter().rev() {
            let mut body = match doc.body {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            body.insert("_id".to_string(), Value::String(doc.id));
            let mut line = serde_json::to_string(&Value::Object(body))?;
            line.push('\n');
            writer
                .write_all(line.as_bytes())
                .map_err(|source| AgdError::io(&tmp_path, source))?;
            written += 1;
        }
        let file = writer
            .into_inner()
            .map_err(|error| AgdError::io(&tmp_path, error.into_error()))?;
        file.sync_all()
            .map_err(|source| AgdError::io(&tmp_path, source))?;
        fs::rename(&tmp_path, path).map_err(|source| AgdError::io(path, source))?;
        Ok(written)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store(dir: &tempfile::TempDir) -> DocumentStore {
        DocumentStore::open(&dir.path().join("docs.sqlite3")).unwrap()
    }

    #[test]
    fn import_skips_blanks_and_reports_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let input = dir.path().join("logs.jsonl");
        fs::write(
            &input,
            "{\"currentDate\": \"2024-03-15\"}\n\n   \nnot json\n[1,2]\n{\"_id\": \"65f0aaaa0000000000000001\", \"ExecutionTime\": 5}\n",
        )
        .unwrap();

        let report = import_file(&store, "logs", &input).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped_blank, 2);
        let lines: Vec<u64> = report.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, [4, 5]);

        let kept = store
            .get("logs", "65f0aaaa0000000000000001")
            .unwrap()
            .unwrap();
        assert_eq!(kept.body, json!({"ExecutionTime": 5}));
    }

    #[test]
    fn extended_json_ids_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let input = dir.path().join("equipment.jsonl");
        fs::write(&input, "{\"_id\": {\"$oid\": \"abc123\"}, \"name\": \"Router\"}\n").unwrap();
        import_file(&store, "equipment", &input).unwrap();
        assert!(store.get("equipment", "abc123").unwrap().is_some());
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let err = import_file(&store, "logs", &dir.path().join("absent.jsonl")).unwrap_err();
        assert_eq!(err.code(), "AGD-3002");
    }

    fn ns(docs: &[crate::store::StoredDocument]) -> Vec<i64> {
        docs.iter().filter_map(|d| d.body["n"].as_i64()).collect()
    }

    #[test]
    fn export_writes_atomically_and_reimports() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        for n in 1..=3 {
            store.insert("logs", &json!({"n": n})).unwrap();
        }
        let before = store.list_recent("logs", 100).unwrap();
        assert_eq!(ns(&before), [3, 2, 1]);

        let out = dir.path().join("out").join("logs.jsonl");
        let written = export_file(&store, "logs", 100, &out).unwrap();
        assert_eq!(written, 3);
        assert!(!out.with_extension("jsonl.tmp").exists());

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l["_id"].is_string()));
        let file_order: Vec<i64> = lines.iter().filter_map(|l| l["n"].as_i64()).collect();
        assert_eq!(file_order, [1, 2, 3]);

        let other = tempfile::tempdir().unwrap();
        let copy = temp_store(&other);
        let report = import_file(&copy, "logs", &out).unwrap();
        assert_eq!(report.imported, 3);
        assert!(report.rejected.is_empty());

        let after = copy.list_recent("logs", 100).unwrap();
        assert_eq!(ns(&after), ns(&before));
        let ids = |docs: &[crate::store::StoredDocument]| -> Vec<String> {
            docs.iter().map(|d| d.id.clone()).collect()
        };
        assert_eq!(ids(&after[..]), ids(&before[..]));
        assert_eq!(ns(&copy.list_recent("logs", 1).unwrap()), [3]);
    }

    #[test]
    fn limited_export_keeps_the_newest_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        for n in 1..=5 {
            store.insert("logs", &json!({"n": n})).unwrap();
        }

        let out = dir.path().join("recent.jsonl");
        assert_eq!(export_file(&store, "logs", 2, &out).unwrap(), 2);

        let other = tempfile::tempdir().unwrap();
        let copy = temp_store(&other);
        import_file(&copy, "logs", &out).unwrap();
        assert_eq!(ns(&copy.list_recent("logs", 10).unwrap()), [5, 4]);
    }
}
