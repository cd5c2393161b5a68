use crate::error::RecordError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Which half of a round trip a timing refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Compression,
    Decompression,
}

impl Direction {
    pub fn all() -> &'static [Direction] {
        &[Direction::Compression, Direction::Decompression]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Compression => "compression",
            Direction::Decompression => "decompression",
        }
    }
}

/// Timing statistics for compression or decompression operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingStats {
    /// Average time in milliseconds
    #[serde(alias = "avg_time_ms")]
    pub avg_ms: f64,
    /// Standard deviation of time in milliseconds
    #[serde(alias = "std_time_ms")]
    pub std_ms: f64,
    /// Average throughput in MB/s, measured against the record's own uncompressed bytes
    pub throughput_mbps: f64,
    /// Standard deviation of throughput in MB/s
    pub throughput_std_mbps: f64,
}

impl TimingStats {
    pub fn new(avg_ms: f64, std_ms: f64, throughput_mbps: f64, throughput_std_mbps: f64) -> Self {
        Self {
            avg_ms,
            std_ms,
            throughput_mbps,
            throughput_std_mbps,
        }
    }
}

/// Outcome of applying one compression algorithm to one record's payloads
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmResult {
    pub compressed_bytes: u64,
    /// Own uncompressed bytes over compressed bytes
    pub compression_ratio: f64,
    /// `None` when the benchmark did not report timings for this direction
    pub compression: Option<TimingStats>,
    pub decompression: Option<TimingStats>,
}

impl AlgorithmResult {
    /// Build a result whose ratio is derived from the two sizes
    pub fn from_sizes(uncompressed_bytes: u64, compressed_bytes: u64) -> Self {
        Self {
            compressed_bytes,
            compression_ratio: derived_ratio(uncompressed_bytes, compressed_bytes),
            compression: None,
            decompression: None,
        }
    }

    pub fn with_stats(mut self, direction: Direction, stats: TimingStats) -> Self {
        match direction {
            Direction::Compression => self.compression = Some(stats),
            Direction::Decompression => self.decompression = Some(stats),
        }
        self
    }

    pub fn stats(&self, direction: Direction) -> Option<&TimingStats> {
        match direction {
            Direction::Compression => self.compression.as_ref(),
            Direction::Decompression => self.decompression.as_ref(),
        }
    }
}

fn derived_ratio(uncompressed_bytes: u64, compressed_bytes: u64) -> f64 {
    if compressed_bytes > 0 {
        uncompressed_bytes as f64 / compressed_bytes as f64
    } else {
        0.0
    }
}

/// One raw measurement: a format variant of a dataset at one batch size
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub dataset: String,
    pub batch_size: u64,
    /// Encoding family, written as `compressor` by the benchmark tool
    pub variant: String,
    /// Size of this variant's encoding before any general-purpose compression
    pub uncompressed_bytes: u64,
    pub algorithm_results: BTreeMap<String, AlgorithmResult>,
    pub num_payloads: Option<u64>,
    pub total_data_points: Option<u64>,
    pub iterations: Option<u64>,
    pub zstd_level: Option<i32>,
}

impl Record {
    pub fn new(
        dataset: impl Into<String>,
        batch_size: u64,
        variant: impl Into<String>,
        uncompressed_bytes: u64,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            batch_size,
            variant: variant.into(),
            uncompressed_bytes,
            algorithm_results: BTreeMap::new(),
            num_payloads: None,
            total_data_points: None,
            iterations: None,
            zstd_level: None,
        }
    }

    pub fn with_result(mut self, algorithm: impl Into<String>, result: AlgorithmResult) -> Self {
        self.algorithm_results.insert(algorithm.into(), result);
        self
    }

    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmResult> {
        self.algorithm_results.get(name)
    }
}

#[derive(Deserialize)]
struct RawAlgorithmResult {
    #[serde(alias = "compressed_bytes")]
    total_bytes: u64,
    compression_ratio: Option<f64>,
    #[serde(default, alias = "compression_stats")]
    compression: Option<TimingStats>,
    #[serde(default, alias = "decompression_stats")]
    decompression: Option<TimingStats>,
}

const DATASET_KEYS: &[&str] = &["dataset"];
const BATCH_SIZE_KEYS: &[&str] = &["batch_size"];
const VARIANT_KEYS: &[&str] = &["compressor", "format", "variant"];
const UNCOMPRESSED_KEYS: &[&str] = &["total_uncompressed_bytes", "uncompressed_bytes"];

/// Keys of a record object that never hold an algorithm result
const METADATA_KEYS: &[&str] = &[
    "dataset",
    "batch_size",
    "compressor",
    "format",
    "variant",
    "total_uncompressed_bytes",
    "uncompressed_bytes",
    "num_payloads",
    "total_data_points",
    "iterations",
    "zstd_level",
    "algorithm_results",
];

/// Parse a results document shaped either as a bare array of records or as
/// an object holding them under `results`.
pub fn parse_records(document: Value) -> Result<Vec<Record>, RecordError> {
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(RecordError::UnexpectedShape(json_kind(&other))),
            None => return Err(RecordError::UnexpectedShape("an object without `results`")),
        },
        other => return Err(RecordError::UnexpectedShape(json_kind(&other))),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => parse_record(index, map),
            _ => Err(RecordError::NotAnObject { index }),
        })
        .collect()
}

pub fn records_from_str(json: &str) -> Result<Vec<Record>, RecordError> {
    parse_records(serde_json::from_str(json)?)
}

/// Read and parse a results file
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = records_from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(records)
}

fn parse_record(index: usize, mut map: Map<String, Value>) -> Result<Record, RecordError> {
    let dataset = required_str(&map, index, DATASET_KEYS)?;
    let batch_size = required_u64(&map, index, BATCH_SIZE_KEYS)?;
    let variant = required_str(&map, index, VARIANT_KEYS)?;
    let uncompressed_bytes = required_u64(&map, index, UNCOMPRESSED_KEYS)?;

    let mut record = Record::new(dataset, batch_size, variant, uncompressed_bytes);
    record.num_payloads = map.get("num_payloads").and_then(Value::as_u64);
    record.total_data_points = map.get("total_data_points").and_then(Value::as_u64);
    record.iterations = map.get("iterations").and_then(Value::as_u64);
    record.zstd_level = map
        .get("zstd_level")
        .and_then(Value::as_i64)
        .and_then(|level| i32::try_from(level).ok());

    let mut candidates: Vec<(String, Value)> = Vec::new();
    match map.remove("algorithm_results") {
        Some(Value::Object(nested)) => candidates.extend(nested),
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(RecordError::InvalidField {
                index,
                field: "algorithm_results".to_string(),
                reason: format!("expected an object, found {}", json_kind(&other)),
            })
        }
    }
    candidates.extend(
        map.into_iter()
            .filter(|(key, value)| !METADATA_KEYS.contains(&key.as_str()) && is_algorithm(value)),
    );

    for (name, value) in candidates {
        // `"openzl": null` marks an algorithm that was not run for this format
        if value.is_null() {
            continue;
        }
        let raw: RawAlgorithmResult =
            serde_json::from_value(value).map_err(|e| RecordError::InvalidField {
                index,
                field: name.clone(),
                reason: e.to_string(),
            })?;
        let compression_ratio = raw
            .compression_ratio
            .unwrap_or_else(|| derived_ratio(uncompressed_bytes, raw.total_bytes));
        record.algorithm_results.insert(
            name,
            AlgorithmResult {
                compressed_bytes: raw.total_bytes,
                compression_ratio,
                compression: raw.compression,
                decompression: raw.decompression,
            },
        );
    }

    Ok(record)
}

fn is_algorithm(value: &Value) -> bool {
    match value {
        Value::Object(fields) => {
            fields.contains_key("total_bytes") || fields.contains_key("compressed_bytes")
        }
        Value::Null => true,
        _ => false,
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key)).filter(|v| !v.is_null())
}

fn required_str(
    map: &Map<String, Value>,
    index: usize,
    keys: &[&'static str],
) -> Result<String, RecordError> {
    let value = lookup(map, keys).ok_or(RecordError::MissingField {
        index,
        field: keys[0],
    })?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RecordError::InvalidField {
            index,
            field: keys[0].to_string(),
            reason: format!("expected a string, found {}", json_kind(value)),
        })
}

fn required_u64(
    map: &Map<String, Value>,
    index: usize,
    keys: &[&'static str],
) -> Result<u64, RecordError> {
    let value = lookup(map, keys).ok_or(RecordError::MissingField {
        index,
        field: keys[0],
    })?;
    // Python writers sometimes emit whole numbers as `100.0`
    let whole_float = || {
        value
            .as_f64()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
            .map(|v| v as u64)
    };
    value.as_u64().or_else(whole_float).ok_or_else(|| RecordError::InvalidField {
        index,
        field: keys[0].to_string(),
        reason: format!("expected a non-negative integer, found {}", value),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
