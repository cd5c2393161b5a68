//! Splits an end-to-end compression ratio into the part won by re-encoding
//! the data and the part won by the compressor:
//!
//! ```text
//! final = baseline / compressed
//!       = (baseline / uncompressed) * (uncompressed / compressed)
//!       = format_efficiency * algorithm_effectiveness
//! ```

use crate::baseline::Baseline;
use crate::config::FamilyTable;
use crate::extract::{select, Point, SeriesKey};
use crate::record::Record;
use tracing::warn;

/// One of the three quantities produced by the decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    /// Reference bytes over the variant's own bytes, before compression
    FormatEfficiency,
    /// The variant's own bytes over its compressed bytes
    AlgorithmEffectiveness,
    /// Reference bytes over compressed bytes
    FinalRatio,
}

impl Factor {
    pub fn all() -> &'static [Factor] {
        &[
            Factor::FormatEfficiency,
            Factor::AlgorithmEffectiveness,
            Factor::FinalRatio,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Factor::FormatEfficiency => "format_efficiency",
            Factor::AlgorithmEffectiveness => "algorithm_effectiveness",
            Factor::FinalRatio => "final_ratio",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Factor::FormatEfficiency => "Format Efficiency (reference raw / format raw)",
            Factor::AlgorithmEffectiveness => "Algorithm Effectiveness (format raw / compressed)",
            Factor::FinalRatio => "Compression Ratio (reference raw / compressed)",
        }
    }
}

/// The three factor series for one (dataset, variant, algorithm)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decomposition {
    pub format_efficiency: Vec<Point>,
    pub algorithm_effectiveness: Vec<Point>,
    pub final_ratio: Vec<Point>,
    complete: Vec<DecomposedPoint>,
}

/// All three factors at one batch size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedPoint {
    pub batch_size: u64,
    pub format_efficiency: f64,
    pub algorithm_effectiveness: f64,
    pub final_ratio: f64,
}

impl DecomposedPoint {
    /// Relative gap between `final_ratio` and the product of the two factors
    pub fn identity_error(&self) -> f64 {
        let product = self.format_efficiency * self.algorithm_effectiveness;
        if self.final_ratio == 0.0 {
            return product.abs();
        }
        ((self.final_ratio - product) / self.final_ratio).abs()
    }
}

impl Decomposition {
    pub fn is_empty(&self) -> bool {
        self.format_efficiency.is_empty()
            && self.algorithm_effectiveness.is_empty()
            && self.final_ratio.is_empty()
    }

    pub fn series(&self, factor: Factor) -> &[Point] {
        match factor {
            Factor::FormatEfficiency => &self.format_efficiency,
            Factor::AlgorithmEffectiveness => &self.algorithm_effectiveness,
            Factor::FinalRatio => &self.final_ratio,
        }
    }

    /// Records that produced all three factors, in batch size order
    pub fn points(&self) -> &[DecomposedPoint] {
        &self.complete
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Decomposer<'a> {
    records: &'a [Record],
    families: &'a FamilyTable,
}

impl<'a> Decomposer<'a> {
    pub fn new(records: &'a [Record], families: &'a FamilyTable) -> Self {
        Self { records, families }
    }

    /// Decompose every batch size of `key` that has a reference record.
    ///
    /// A dataset without reference records yields an empty decomposition.
    /// Records lacking `key.algorithm` contribute no point to any factor, so
    /// the three series always cover the same batch sizes.
    pub fn decompose(&self, key: &SeriesKey) -> Decomposition {
        let baseline =
            Baseline::resolve_for_variant(self.records, &key.dataset, &key.variant, self.families);
        let mut decomposition = Decomposition::default();
        if baseline.is_empty() {
            return decomposition;
        }

        for record in select(self.records, &key.dataset, &key.variant) {
            let Some(reference) = baseline.get(record.batch_size) else {
                continue;
            };
            let Some(result) = record.algorithm(&key.algorithm) else {
                continue;
            };
            let bs = record.batch_size;

            if record.uncompressed_bytes == 0 || result.compressed_bytes == 0 {
                warn!(
                    dataset = %record.dataset,
                    variant = %record.variant,
                    algorithm = %key.algorithm,
                    batch_size = bs,
                    uncompressed_bytes = record.uncompressed_bytes,
                    compressed_bytes = result.compressed_bytes,
                    "zero byte count, skipping decomposition point"
                );
                continue;
            }

            let uncompressed = record.uncompressed_bytes as f64;
            let compressed = result.compressed_bytes as f64;
            let point = DecomposedPoint {
                batch_size: bs,
                format_efficiency: reference as f64 / uncompressed,
                algorithm_effectiveness: uncompressed / compressed,
                final_ratio: reference as f64 / compressed,
            };
            decomposition
                .format_efficiency
                .push(Point::new(bs, point.format_efficiency));
            decomposition
                .algorithm_effectiveness
                .push(Point::new(bs, point.algorithm_effectiveness));
            decomposition
                .final_ratio
                .push(Point::new(bs, point.final_ratio));
            decomposition.complete.push(point);
        }

        decomposition
    }
}
