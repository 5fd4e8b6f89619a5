//! Situation sources: the ingestion collaborator behind the store.
//!
//! A source hands over the full ordered list of situation records on every
//! fetch. The file source is the detector's `memory.json`; the HTTP source is
//! an upstream service serving the same records.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::UpstreamFetchError;
use crate::models::{Label, SituationRecord};
use crate::Config;

// ---

#[derive(Debug, Clone)]
pub enum SituationSource {
    /// JSON array of records on disk.
    File(PathBuf),
    /// Upstream endpoint returning a JSON array, or an object with `results`.
    Http { client: reqwest::Client, url: String },
}

impl SituationSource {
    // ---
    pub fn from_config(cfg: &Config) -> Self {
        match &cfg.api_url {
            Some(url) => SituationSource::http(url.clone()),
            None => SituationSource::File(cfg.memory_file.clone()),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        SituationSource::Http {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SituationSource::File(path) => format!("file {}", path.display()),
            SituationSource::Http { url, .. } => format!("http {url}"),
        }
    }

    /// Fetch the current records, each paired with its position in the
    /// source document. Items that do not parse are skipped.
    pub async fn fetch(&self) -> Result<Vec<(usize, SituationRecord)>, UpstreamFetchError> {
        // ---
        let document = match self {
            SituationSource::File(path) => read_file(path).await?,
            SituationSource::Http { client, url } => {
                debug!("Fetching situations from: {}", url);
                client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await?
            }
        };

        let records = parse_records(document)?;
        debug!("Fetched {} situations from {}", records.len(), self.describe());
        Ok(records)
    }

    /// Write a label change back to the entry at `position`.
    ///
    /// Only that entry's `estimate` key is rewritten; every other entry and
    /// key in the document is kept as found, including items the store could
    /// not load. The HTTP source has no write path; the store keeps its
    /// labels instead.
    pub async fn persist_label(
        &self,
        position: usize,
        label: Label,
    ) -> Result<(), UpstreamFetchError> {
        // ---
        match self {
            SituationSource::File(path) => {
                let mut document = read_file(path).await?;
                let entry = entries_mut(&mut document)
                    .and_then(|items| items.get_mut(position))
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| {
                        UpstreamFetchError::UnexpectedShape(format!(
                            "no situation object at position {position}"
                        ))
                    })?;
                entry.insert("estimate".to_string(), Value::from(label.as_str()));

                let body = serde_json::to_vec_pretty(&document)?;
                tokio::fs::write(path, body).await?;
                info!(
                    "Set estimate={} on situation {} in {}",
                    label.as_str(),
                    position,
                    path.display()
                );
                Ok(())
            }
            SituationSource::Http { .. } => Ok(()),
        }
    }
}

/// Read the situation file, creating it as an empty array when missing.
async fn read_file(path: &Path) -> Result<Value, UpstreamFetchError> {
    // ---
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, b"[]").await?;
            info!("Created empty situation file {}", path.display());
            Ok(Value::Array(Vec::new()))
        }
        Err(e) => Err(e.into()),
    }
}

/// The record list of a document: a bare array or a `results` envelope.
fn entries_mut(document: &mut Value) -> Option<&mut Vec<Value>> {
    match document {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get_mut("results").and_then(Value::as_array_mut),
        _ => None,
    }
}

fn parse_records(
    document: Value,
) -> Result<Vec<(usize, SituationRecord)>, UpstreamFetchError> {
    // ---
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(UpstreamFetchError::UnexpectedShape(
                    "object without a 'results' array".to_string(),
                ))
            }
        },
        other => {
            return Err(UpstreamFetchError::UnexpectedShape(format!(
                "expected an array, got {}",
                json_type(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<SituationRecord>(item) {
            Ok(record) => records.push((i, record)),
            Err(e) => debug!("Failed to parse situation {}: {}", i, e),
        }
    }
    Ok(records)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::anomaly::Severity;
    use serde_json::json;

    fn sample() -> Value {
        // ---
        json!([
            {
                "situation": {
                    "situation_description": "Kitchen humidity",
                    "result": "normal",
                    "start_timestamp": 1740987196,
                    "end_timestamp": 1740987196,
                    "details": [
                        "{\"timestamp\": 1740987196, \"datetime\": \"Mon Mar 03 2025 07:33:16\", \"room\": \"kitchen\", \"nodeId\": 6, \"endpointId\": 6, \"attribute\": {\"RelativeHumidityMeasurement\": {\"MeasuredValue\": 5390}}}"
                    ]
                },
                "estimate": "anomalous"
            },
            { "situation": "not an object", "estimate": "normal" }
        ])
    }

    fn entry(description: &str, start: i64, end: i64, extra: Value) -> Value {
        // ---
        let mut entry = json!({
            "situation": {
                "situation_description": description,
                "result": "normal",
                "start_timestamp": start,
                "end_timestamp": end,
                "details": []
            },
            "estimate": "normal"
        });
        if let (Some(map), Value::Object(extra)) = (entry.as_object_mut(), extra) {
            map.extend(extra);
        }
        entry
    }

    #[test]
    fn test_parse_skips_bad_items() {
        // ---
        let records = parse_records(sample()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, 0);
        assert_eq!(records[0].1.estimate, Label::Anomalous);
        assert_eq!(records[0].1.situation.details.len(), 1);
    }

    #[test]
    fn test_parse_keeps_document_positions() {
        // ---
        let document = json!(["garbage", entry("a", 1, 2, json!({})), 7, entry("b", 3, 4, json!({}))]);
        let positions: Vec<usize> = parse_records(document)
            .unwrap()
            .into_iter()
            .map(|(position, _)| position)
            .collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn test_parse_results_envelope() {
        // ---
        let records = parse_records(json!({ "results": sample() })).unwrap();
        assert_eq!(records.len(), 1);

        assert!(matches!(
            parse_records(json!({ "items": [] })),
            Err(UpstreamFetchError::UnexpectedShape(_))
        ));
        assert!(matches!(
            parse_records(json!(42)),
            Err(UpstreamFetchError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_loose_severity_and_confidence_keep_the_situation() {
        // ---
        let document = json!([
            entry("float", 1, 2, json!({"confidence": 82.5, "severity": "HIGH"})),
            entry("over", 1, 2, json!({"confidence": 300, "severity": "severe"})),
            entry("negative", 1, 2, json!({"confidence": -1, "severity": 3})),
            entry("text", 1, 2, json!({"confidence": "high", "severity": null})),
            entry("numeric text", 1, 2, json!({"confidence": " 64 "})),
        ]);
        let records: Vec<SituationRecord> = parse_records(document)
            .unwrap()
            .into_iter()
            .map(|(_, record)| record)
            .collect();

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].confidence, Some(83));
        assert_eq!(records[0].severity, Some(Severity::High));
        assert_eq!(records[1].confidence, Some(100));
        assert_eq!(records[1].severity, None);
        assert_eq!(records[2].confidence, Some(0));
        assert_eq!(records[2].severity, None);
        assert_eq!(records[3].confidence, None);
        assert_eq!(records[3].severity, None);
        assert_eq!(records[4].confidence, Some(64));
    }

    #[test]
    fn test_file_source_creates_missing_file() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("memory.json");
        let source = SituationSource::File(path.clone());

        let records = tokio_test::block_on(source.fetch()).unwrap();
        assert!(records.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_persist_label_touches_only_the_estimate() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let document = json!([
            entry("a", 1, 2, json!({"anomalyId": "log-17"})),
            "not a situation",
            entry("inverted", 9, 2, json!({})),
        ]);
        std::fs::write(&path, document.to_string()).unwrap();
        let source = SituationSource::File(path.clone());

        tokio_test::block_on(source.persist_label(0, Label::Anomalous)).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let mut expected = document;
        expected[0]["estimate"] = json!("anomalous");
        assert_eq!(written, expected);

        assert!(matches!(
            tokio_test::block_on(source.persist_label(1, Label::Normal)),
            Err(UpstreamFetchError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_persist_label_in_results_envelope() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, json!({ "results": sample(), "page": 1 }).to_string()).unwrap();
        let source = SituationSource::File(path.clone());

        tokio_test::block_on(source.persist_label(0, Label::Normal)).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["results"][0]["estimate"], "normal");
        assert_eq!(written["results"][1]["situation"], "not an object");
        assert_eq!(written["page"], 1);

        assert!(matches!(
            tokio_test::block_on(source.persist_label(5, Label::Normal)),
            Err(UpstreamFetchError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = tokio_test::block_on(SituationSource::File(path).fetch());
        assert!(matches!(result, Err(UpstreamFetchError::Json(_))));
    }
}
