use crate::baseline::Baseline;
use crate::config::{FamilyTable, VariantRole};
use crate::record::{AlgorithmResult, Direction, Record};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Identifies one (dataset, variant, algorithm) combination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub dataset: String,
    pub variant: String,
    pub algorithm: String,
}

impl SeriesKey {
    pub fn new(dataset: &str, variant: &str, algorithm: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            variant: variant.to_string(),
            algorithm: algorithm.to_string(),
        }
    }
}

/// A single value at one batch size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub batch_size: u64,
    pub value: f64,
    /// Spread of the measurement, for timing and throughput metrics
    pub std: Option<f64>,
}

impl Point {
    pub fn new(batch_size: u64, value: f64) -> Self {
        Self {
            batch_size,
            value,
            std: None,
        }
    }

    pub fn with_std(batch_size: u64, value: f64, std: f64) -> Self {
        Self {
            batch_size,
            value,
            std: Some(std),
        }
    }
}

/// What to derive from each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Compression ratio relative to the reference encoding's bytes
    Ratio,
    /// Mean wall time in milliseconds
    Time(Direction),
    /// Stored throughput against the variant's own bytes
    Throughput(Direction),
    /// Throughput rescaled to the reference encoding's bytes
    E2eSpeed(Direction),
}

impl MetricKind {
    pub fn all() -> Vec<MetricKind> {
        let mut kinds = vec![MetricKind::Ratio];
        for &direction in Direction::all() {
            kinds.push(MetricKind::Time(direction));
            kinds.push(MetricKind::Throughput(direction));
            kinds.push(MetricKind::E2eSpeed(direction));
        }
        kinds
    }

    /// Stable identifier used in file names and on the command line
    pub fn slug(&self) -> String {
        match self {
            MetricKind::Ratio => "compression_ratio".to_string(),
            MetricKind::Time(d) => format!("{}_time", d.name()),
            MetricKind::Throughput(d) => format!("{}_throughput", d.name()),
            MetricKind::E2eSpeed(d) => format!("{}_speed", d.name()),
        }
    }

    /// Axis caption
    pub fn axis_label(&self) -> String {
        match self {
            MetricKind::Ratio => "Compression Ratio (vs reference)".to_string(),
            MetricKind::Time(d) => format!("{} Time (ms)", capitalize(d.name())),
            MetricKind::Throughput(d) => format!("{} Throughput (MB/s)", capitalize(d.name())),
            MetricKind::E2eSpeed(d) => {
                format!("{} Speed (MB/s, vs reference)", capitalize(d.name()))
            }
        }
    }

    fn needs_baseline(&self) -> bool {
        matches!(self, MetricKind::Ratio | MetricKind::E2eSpeed(_))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::all()
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| {
                let known: Vec<String> = MetricKind::all().iter().map(|k| k.slug()).collect();
                format!("unknown metric '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Records of one (dataset, variant), stably sorted by batch size
pub fn select<'a>(records: &'a [Record], dataset: &str, variant: &str) -> Vec<&'a Record> {
    let mut selected: Vec<&Record> = records
        .iter()
        .filter(|r| r.dataset == dataset && r.variant == variant)
        .collect();
    selected.sort_by_key(|r| r.batch_size);
    selected
}

/// Derives comparable metric series from a set of raw records
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    records: &'a [Record],
    families: &'a FamilyTable,
}

impl<'a> Extractor<'a> {
    pub fn new(records: &'a [Record], families: &'a FamilyTable) -> Self {
        Self { records, families }
    }

    pub fn records(&self) -> &'a [Record] {
        self.records
    }

    pub fn families(&self) -> &'a FamilyTable {
        self.families
    }

    /// Extract one metric for every batch size of `key`, ascending.
    ///
    /// Points whose algorithm or baseline entry is missing are left out.
    pub fn extract(&self, key: &SeriesKey, kind: MetricKind) -> Vec<Point> {
        let role = self.families.role(&key.variant);
        let baseline = if kind.needs_baseline() {
            match role.family() {
                Some(family) => Baseline::resolve(self.records, &key.dataset, family),
                None => Baseline::default(),
            }
        } else {
            Baseline::default()
        };

        select(self.records, &key.dataset, &key.variant)
            .into_iter()
            .filter_map(|record| {
                let result = record.algorithm(&key.algorithm)?;
                derive(kind, role, record, result, &baseline)
            })
            .collect()
    }
}

fn derive(
    kind: MetricKind,
    role: VariantRole<'_>,
    record: &Record,
    result: &AlgorithmResult,
    baseline: &Baseline,
) -> Option<Point> {
    let batch_size = record.batch_size;
    match kind {
        MetricKind::Ratio => match role {
            VariantRole::Derived(_) => {
                let reference = baseline.get(batch_size)?;
                if result.compressed_bytes == 0 {
                    warn!(
                        dataset = %record.dataset,
                        variant = %record.variant,
                        batch_size,
                        "zero compressed bytes, dropping ratio point"
                    );
                    return None;
                }
                Some(Point::new(
                    batch_size,
                    reference as f64 / result.compressed_bytes as f64,
                ))
            }
            VariantRole::Reference(_) | VariantRole::Unlisted => {
                Some(Point::new(batch_size, result.compression_ratio))
            }
        },
        MetricKind::Time(direction) => {
            let stats = result.stats(direction)?;
            Some(Point::with_std(batch_size, stats.avg_ms, stats.std_ms))
        }
        MetricKind::Throughput(direction) => {
            let stats = result.stats(direction)?;
            Some(Point::with_std(
                batch_size,
                stats.throughput_mbps,
                stats.throughput_std_mbps,
            ))
        }
        MetricKind::E2eSpeed(direction) => {
            let reference = baseline.get(batch_size)?;
            let stats = result.stats(direction)?;
            let scale = e2e_scale(record, reference);
            Some(Point::with_std(
                batch_size,
                stats.throughput_mbps * scale,
                stats.throughput_std_mbps * scale,
            ))
        }
    }
}

/// Factor converting throughput over a variant's own bytes into throughput
/// over the reference bytes. The std is scaled by the same factor, assuming
/// timing spread is proportional to size.
fn e2e_scale(record: &Record, reference_bytes: u64) -> f64 {
    if record.uncompressed_bytes == 0 {
        warn!(
            dataset = %record.dataset,
            variant = %record.variant,
            batch_size = record.batch_size,
            "zero uncompressed bytes, reporting unscaled throughput"
        );
        return 1.0;
    }
    reference_bytes as f64 / record.uncompressed_bytes as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TimingStats;
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::*;

    fn timed(uncompressed: u64, compressed: u64, throughput: f64) -> AlgorithmResult {
        AlgorithmResult::from_sizes(uncompressed, compressed)
            .with_stats(
                Direction::Compression,
                TimingStats::new(10.0, 1.0, throughput, throughput / 10.0),
            )
            .with_stats(
                Direction::Decompression,
                TimingStats::new(2.0, 0.2, throughput * 5.0, throughput / 2.0),
            )
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new("d1", 1000, "otlp_metrics", 10_000)
                .with_result("zstd", timed(10_000, 1_000, 100.0))
                .with_result("openzl", timed(10_000, 500, 50.0)),
            Record::new("d1", 100, "otlp_metrics", 1_000)
                .with_result("zstd", timed(1_000, 250, 80.0))
                .with_result("openzl", timed(1_000, 125, 40.0)),
            Record::new("d1", 100, "otap", 800).with_result("zstd", timed(800, 200, 60.0)),
            Record::new("d1", 1000, "otap", 6_000).with_result("zstd", timed(6_000, 800, 90.0)),
            // No reference record at this batch size
            Record::new("d1", 5000, "otap", 20_000).with_result("zstd", timed(20_000, 2_000, 95.0)),
        ]
    }

    #[test]
    fn test_reference_ratio_uses_stored_value() {
        let records = sample_records();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let points = extractor.extract(
            &SeriesKey::new("d1", "otlp_metrics", "zstd"),
            MetricKind::Ratio,
        );
        assert_eq!(points, vec![Point::new(100, 4.0), Point::new(1000, 10.0)]);
    }

    #[test]
    fn test_derived_ratio_uses_baseline() {
        let records = sample_records();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let points = extractor.extract(&SeriesKey::new("d1", "otap", "zstd"), MetricKind::Ratio);
        // 5000 has no reference and is dropped
        assert_eq!(points, vec![Point::new(100, 5.0), Point::new(1000, 12.5)]);
    }

    #[test]
    fn test_missing_algorithm_drops_points() {
        let records = sample_records();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let key = SeriesKey::new("d1", "otap", "openzl");
        for kind in MetricKind::all() {
            assert!(extractor.extract(&key, kind).is_empty(), "{kind}");
        }
    }

    #[test]
    fn test_time_and_throughput() {
        let records = sample_records();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);
        let key = SeriesKey::new("d1", "otap", "zstd");

        let times = extractor.extract(&key, MetricKind::Time(Direction::Decompression));
        assert_eq!(times.len(), 3);
        assert!(times.iter().all(|p| p.value == 2.0 && p.std == Some(0.2)));

        // Throughput is never rescaled and keeps the unreferenced batch size
        let throughput = extractor.extract(&key, MetricKind::Throughput(Direction::Compression));
        assert_eq!(
            throughput,
            vec![
                Point::with_std(100, 60.0, 6.0),
                Point::with_std(1000, 90.0, 9.0),
                Point::with_std(5000, 95.0, 9.5),
            ]
        );
    }

    #[test]
    fn test_e2e_speed_rescales_to_baseline() {
        let records = sample_records();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let points = extractor.extract(
            &SeriesKey::new("d1", "otap", "zstd"),
            MetricKind::E2eSpeed(Direction::Compression),
        );
        assert_eq!(points.len(), 2);
        // 60 MB/s over 800 bytes is 75 MB/s over the 1000 reference bytes
        assert!((points[0].value - 75.0).abs() < 1e-12);
        assert!((points[0].std.unwrap() - 7.5).abs() < 1e-12);
        assert!((points[1].value - 150.0).abs() < 1e-12);

        // A reference variant is its own baseline
        let reference = extractor.extract(
            &SeriesKey::new("d1", "otlp_metrics", "zstd"),
            MetricKind::E2eSpeed(Direction::Compression),
        );
        assert_eq!(reference[0].value, 80.0);
    }

    #[test]
    fn test_e2e_speed_zero_bytes_is_unscaled() {
        let records = vec![
            Record::new("d1", 100, "otlp_metrics", 1_000).with_result("zstd", timed(1_000, 250, 80.0)),
            Record::new("d1", 100, "otap", 0).with_result("zstd", timed(0, 10, 33.0)),
        ];
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let points = extractor.extract(
            &SeriesKey::new("d1", "otap", "zstd"),
            MetricKind::E2eSpeed(Direction::Compression),
        );
        assert_eq!(points, vec![Point::with_std(100, 33.0, 3.3)]);
    }

    #[test]
    fn test_unlisted_variant() {
        let records = vec![
            Record::new("d1", 100, "parquet", 900).with_result("zstd", timed(900, 300, 10.0)),
        ];
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);
        let key = SeriesKey::new("d1", "parquet", "zstd");

        assert_eq!(extractor.extract(&key, MetricKind::Ratio), vec![Point::new(100, 3.0)]);
        assert!(extractor
            .extract(&key, MetricKind::E2eSpeed(Direction::Compression))
            .is_empty());
    }

    #[test]
    fn test_missing_stats_drop_timing_points() {
        let records = crate::record::records_from_str(
            r#"[{"dataset":"d1","batch_size":100,"compressor":"otlp_metrics",
                 "total_uncompressed_bytes":1000,"zstd":{"total_bytes":250}}]"#,
        )
        .unwrap();
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);
        let key = SeriesKey::new("d1", "otlp_metrics", "zstd");

        assert_eq!(extractor.extract(&key, MetricKind::Ratio), vec![Point::new(100, 4.0)]);
        for kind in MetricKind::all() {
            if kind != MetricKind::Ratio {
                assert!(extractor.extract(&key, kind).is_empty(), "{kind}");
            }
        }
    }

    #[test]
    fn test_equal_batch_sizes_keep_input_order() {
        let records = vec![
            Record::new("d1", 200, "otlp_traces", 1_000).with_result("zstd", timed(1_000, 100, 1.0)),
            Record::new("d1", 100, "otlp_traces", 1_000).with_result("zstd", timed(1_000, 500, 1.0)),
            Record::new("d1", 100, "otlp_traces", 1_000).with_result("zstd", timed(1_000, 250, 1.0)),
        ];
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let points = extractor.extract(&SeriesKey::new("d1", "otlp_traces", "zstd"), MetricKind::Ratio);
        assert_eq!(
            points,
            vec![Point::new(100, 2.0), Point::new(100, 4.0), Point::new(200, 10.0)]
        );
    }

    #[test]
    fn test_metric_kind_parsing() {
        for kind in MetricKind::all() {
            assert_eq!(kind.slug().parse::<MetricKind>().unwrap(), kind);
        }
        assert_eq!(
            "decompression_speed".parse::<MetricKind>().unwrap(),
            MetricKind::E2eSpeed(Direction::Decompression)
        );
        assert!("latency".parse::<MetricKind>().is_err());
        assert_eq!(
            MetricKind::Time(Direction::Compression).axis_label(),
            "Compression Time (ms)"
        );
    }

    proptest! {
        #[test]
        fn prop_series_sorted_by_batch_size(
            batches in prop_vec((1u64..10_000, 1u64..1_000_000, 1u64..1_000_000), 0..40)
        ) {
            let mut records = Vec::new();
            for (batch_size, reference_bytes, variant_bytes) in &batches {
                records.push(
                    Record::new("d", *batch_size, "tpch_proto", *reference_bytes)
                        .with_result("zstd", timed(*reference_bytes, (*reference_bytes / 3).max(1), 10.0)),
                );
                records.push(
                    Record::new("d", *batch_size, "arrow", *variant_bytes)
                        .with_result("zstd", timed(*variant_bytes, (*variant_bytes / 4).max(1), 10.0)),
                );
            }
            let families = FamilyTable::default();
            let extractor = Extractor::new(&records, &families);

            for variant in ["tpch_proto", "arrow"] {
                for kind in MetricKind::all() {
                    let points = extractor.extract(&SeriesKey::new("d", variant, "zstd"), kind);
                    prop_assert!(points.windows(2).all(|w| w[0].batch_size <= w[1].batch_size));
                }
            }
        }

        #[test]
        fn prop_sparse_reference_drops_derived_points(
            batches in prop_vec((1u64..500, any::<bool>()), 1..30)
        ) {
            let mut records = Vec::new();
            for (batch_size, has_reference) in &batches {
                if *has_reference {
                    records.push(Record::new("d", *batch_size, "otlp_traces", 1_000));
                }
                records.push(
                    Record::new("d", *batch_size, "otap", 700)
                        .with_result("zstd", timed(700, 100, 10.0)),
                );
            }
            let families = FamilyTable::default();
            let extractor = Extractor::new(&records, &families);
            let key = SeriesKey::new("d", "otap", "zstd");

            for kind in [MetricKind::Ratio, MetricKind::E2eSpeed(Direction::Decompression)] {
                for point in extractor.extract(&key, kind) {
                    prop_assert!(batches
                        .iter()
                        .any(|(bs, has_reference)| *bs == point.batch_size && *has_reference));
                }
            }
        }
    }
}
