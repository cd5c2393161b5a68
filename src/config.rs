//! Lookup tables consumed by the analysis: which format variants act as the
//! baseline for a data family, and how variant/algorithm pairs map to the
//! labels shown to readers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A data family and the format variants measured for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatFamily {
    pub name: String,
    /// Row-oriented encodings that serve as the yardstick for every ratio
    pub reference: Vec<String>,
    /// Re-encodings expressed relative to the reference bytes
    #[serde(default)]
    pub derived: Vec<String>,
}

impl FormatFamily {
    pub fn new(name: &str, reference: &[&str], derived: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            reference: reference.iter().map(|v| v.to_string()).collect(),
            derived: derived.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn is_reference(&self, variant: &str) -> bool {
        self.reference.iter().any(|v| v == variant)
    }

    pub fn is_derived(&self, variant: &str) -> bool {
        self.derived.iter().any(|v| v == variant)
    }
}

/// How a variant relates to its family's baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariantRole<'a> {
    Reference(&'a FormatFamily),
    Derived(&'a FormatFamily),
    /// Not listed in any family; measured only against itself
    Unlisted,
}

impl<'a> VariantRole<'a> {
    pub fn family(&self) -> Option<&'a FormatFamily> {
        match self {
            VariantRole::Reference(family) | VariantRole::Derived(family) => Some(family),
            VariantRole::Unlisted => None,
        }
    }
}

/// Ordered set of format families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyTable {
    pub families: Vec<FormatFamily>,
}

impl FamilyTable {
    pub fn new(families: Vec<FormatFamily>) -> Self {
        Self { families }
    }

    /// Load a table from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let table: FamilyTable = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(table)
    }

    /// Classify a variant; the first family that lists it wins
    pub fn role(&self, variant: &str) -> VariantRole<'_> {
        for family in &self.families {
            if family.is_reference(variant) {
                return VariantRole::Reference(family);
            }
            if family.is_derived(variant) {
                return VariantRole::Derived(family);
            }
        }
        VariantRole::Unlisted
    }

    pub fn family(&self, name: &str) -> Option<&FormatFamily> {
        self.families.iter().find(|f| f.name == name)
    }
}

impl Default for FamilyTable {
    fn default() -> Self {
        Self::new(vec![
            FormatFamily::new(
                "otel",
                &["otlp_metrics", "otlp_traces"],
                &[
                    "otap",
                    "otapnodict",
                    "otapdictperfile",
                    "otlpmetricsdict",
                    "otlptracesdict",
                ],
            ),
            FormatFamily::new(
                "tpch",
                &["tpch_proto"],
                &["arrow", "arrownodict", "arrowdictperfile"],
            ),
        ])
    }
}

/// One candidate source for a labelled series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub label: String,
    pub variant: String,
    pub algorithm: String,
}

impl SeriesConfig {
    pub fn new(label: &str, variant: &str, algorithm: &str) -> Self {
        Self {
            label: label.to_string(),
            variant: variant.to_string(),
            algorithm: algorithm.to_string(),
        }
    }
}

/// Series shown for OpenTelemetry datasets.
///
/// Metrics and traces share the "Proto" labels; a dataset only ever has one
/// of the two reference variants, so whichever yields data owns the label.
pub fn otel_series() -> Vec<SeriesConfig> {
    vec![
        SeriesConfig::new("Proto + OpenZL", "otlp_metrics", "openzl"),
        SeriesConfig::new("Proto + OpenZL", "otlp_traces", "openzl"),
        SeriesConfig::new("Proto + zstd", "otlp_metrics", "zstd"),
        SeriesConfig::new("Proto + zstd", "otlp_traces", "zstd"),
        SeriesConfig::new("Arrow + zstd", "otap", "zstd"),
        SeriesConfig::new("Arrow (No Dict) + zstd", "otapnodict", "zstd"),
    ]
}

/// Series shown for TPC-H tables
pub fn tpch_series() -> Vec<SeriesConfig> {
    vec![
        SeriesConfig::new("Proto + OpenZL", "tpch_proto", "openzl"),
        SeriesConfig::new("Proto + zstd", "tpch_proto", "zstd"),
        SeriesConfig::new("Arrow + zstd", "arrow", "zstd"),
        SeriesConfig::new("Arrow (No Dict) + zstd", "arrownodict", "zstd"),
    ]
}

/// Pick the preset whose variants appear in the given family
pub fn series_for_family(family: &str) -> Vec<SeriesConfig> {
    match family {
        "tpch" => tpch_series(),
        _ => otel_series(),
    }
}
