use crate::config::SeriesConfig;
use crate::decompose::{Decomposer, Factor};
use crate::extract::{Extractor, MetricKind, Point, SeriesKey};
use crate::record::Record;
use std::collections::{BTreeMap, HashSet};

/// Points under a display label, ascending by batch size
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn value_at(&self, batch_size: u64) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.batch_size == batch_size)
            .map(|p| p.value)
    }

    /// Divide this series by `denominator` wherever both have a value.
    ///
    /// Used for "how much better is A than B" comparisons; batch sizes where
    /// the denominator is zero are skipped.
    pub fn ratio_over(&self, denominator: &Series, label: impl Into<String>) -> Series {
        let points = self
            .points
            .iter()
            .filter_map(|p| {
                let below = denominator.value_at(p.batch_size)?;
                (below != 0.0).then(|| Point::new(p.batch_size, p.value / below))
            })
            .collect();
        Series::new(label, points)
    }
}

/// Build one series per label from an ordered list of candidate configs.
///
/// The first config that yields any points owns its label; later configs with
/// the same label are never consulted. Configs yielding nothing leave the
/// label open for the next candidate.
pub fn assemble_with<F>(configs: &[SeriesConfig], mut points_for: F) -> Vec<Series>
where
    F: FnMut(&SeriesConfig) -> Vec<Point>,
{
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut series = Vec::new();

    for config in configs {
        if claimed.contains(config.label.as_str()) {
            continue;
        }
        let points = points_for(config);
        if points.is_empty() {
            continue;
        }
        claimed.insert(config.label.as_str());
        series.push(Series::new(config.label.clone(), points));
    }

    series
}

/// Assemble metric series for one dataset
pub fn assemble(
    extractor: &Extractor<'_>,
    dataset: &str,
    configs: &[SeriesConfig],
    kind: MetricKind,
) -> Vec<Series> {
    assemble_with(configs, |config| {
        extractor.extract(
            &SeriesKey::new(dataset, &config.variant, &config.algorithm),
            kind,
        )
    })
}

/// Assemble one decomposition factor for one dataset
pub fn assemble_decomposition(
    decomposer: &Decomposer<'_>,
    dataset: &str,
    configs: &[SeriesConfig],
    factor: Factor,
) -> Vec<Series> {
    assemble_with(configs, |config| {
        decomposer
            .decompose(&SeriesKey::new(dataset, &config.variant, &config.algorithm))
            .series(factor)
            .to_vec()
    })
}

/// Pair an end-to-end speed series with a ratio series on batch size,
/// giving `(speed, ratio)` points for speed-vs-ratio trade-off plots.
pub fn tradeoff(speed: &Series, ratio: &Series) -> Vec<(f64, f64)> {
    speed
        .points
        .iter()
        .filter_map(|p| ratio.value_at(p.batch_size).map(|r| (p.value, r)))
        .collect()
}

/// Records grouped by dataset name
pub fn group_by_dataset(records: &[Record]) -> BTreeMap<&str, Vec<&Record>> {
    let mut grouped: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.dataset.as_str()).or_default().push(record);
    }
    grouped
}

/// Distinct dataset names, sorted
pub fn datasets(records: &[Record]) -> Vec<&str> {
    group_by_dataset(records).into_keys().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{otel_series, FamilyTable};
    use crate::record::AlgorithmResult;

    fn ratio_only(uncompressed: u64, compressed: u64) -> AlgorithmResult {
        AlgorithmResult::from_sizes(uncompressed, compressed)
    }

    #[test]
    fn test_first_config_with_data_wins() {
        let configs = vec![
            SeriesConfig::new("shared", "a", "zstd"),
            SeriesConfig::new("shared", "b", "zstd"),
            SeriesConfig::new("other", "c", "zstd"),
        ];
        let p1 = vec![Point::new(1, 1.0), Point::new(2, 2.0)];
        let p2 = vec![Point::new(1, 9.0)];

        let series = assemble_with(&configs, |config| match config.variant.as_str() {
            "a" => p1.clone(),
            "b" => p2.clone(),
            _ => vec![Point::new(5, 5.0)],
        });

        assert_eq!(series.len(), 2);
        assert_eq!(series[0], Series::new("shared", p1));
        assert_eq!(series[1].label, "other");
    }

    #[test]
    fn test_empty_config_does_not_claim_label() {
        let configs = vec![
            SeriesConfig::new("shared", "a", "zstd"),
            SeriesConfig::new("shared", "b", "zstd"),
        ];
        let mut consulted = Vec::new();

        let series = assemble_with(&configs, |config| {
            consulted.push(config.variant.clone());
            if config.variant == "b" {
                vec![Point::new(7, 3.0)]
            } else {
                Vec::new()
            }
        });

        assert_eq!(consulted, vec!["a", "b"]);
        assert_eq!(series, vec![Series::new("shared", vec![Point::new(7, 3.0)])]);
    }

    #[test]
    fn test_assemble_otel_traces_dataset() {
        let records = vec![
            Record::new("traces", 100, "otlp_traces", 1_000)
                .with_result("zstd", ratio_only(1_000, 100))
                .with_result("openzl", ratio_only(1_000, 50)),
            Record::new("traces", 100, "otap", 600).with_result("zstd", ratio_only(600, 80)),
        ];
        let families = FamilyTable::default();
        let extractor = Extractor::new(&records, &families);

        let series = assemble(&extractor, "traces", &otel_series(), MetricKind::Ratio);
        let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Proto + OpenZL", "Proto + zstd", "Arrow + zstd"]);
        assert_eq!(series[0].value_at(100), Some(20.0));
        assert_eq!(series[2].value_at(100), Some(12.5));
    }

    #[test]
    fn test_assemble_decomposition() {
        let records = vec![
            Record::new("traces", 100, "otlp_traces", 1_000).with_result("zstd", ratio_only(1_000, 100)),
            Record::new("traces", 100, "otap", 500).with_result("zstd", ratio_only(500, 80)),
        ];
        let families = FamilyTable::default();
        let decomposer = Decomposer::new(&records, &families);

        let series =
            assemble_decomposition(&decomposer, "traces", &otel_series(), Factor::FormatEfficiency);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "Proto + zstd");
        assert_eq!(series[0].value_at(100), Some(1.0));
        assert_eq!(series[1].label, "Arrow + zstd");
        assert_eq!(series[1].value_at(100), Some(2.0));
    }

    #[test]
    fn test_ratio_over_and_tradeoff() {
        let openzl = Series::new("openzl", vec![Point::new(10, 8.0), Point::new(100, 12.0)]);
        let zstd = Series::new("zstd", vec![Point::new(100, 6.0), Point::new(1000, 7.0)]);

        let improvement = openzl.ratio_over(&zstd, "OpenZL over zstd");
        assert_eq!(improvement.points, vec![Point::new(100, 2.0)]);

        let zero = Series::new("zero", vec![Point::new(10, 0.0)]);
        assert!(openzl.ratio_over(&zero, "none").is_empty());

        let speed = Series::new(
            "speed",
            vec![Point::with_std(10, 300.0, 3.0), Point::with_std(100, 250.0, 2.0)],
        );
        assert_eq!(tradeoff(&speed, &openzl), vec![(300.0, 8.0), (250.0, 12.0)]);
        assert_eq!(tradeoff(&speed, &zstd), vec![(250.0, 6.0)]);
    }

    #[test]
    fn test_group_by_dataset() {
        let records = vec![
            Record::new("b", 1, "x", 1),
            Record::new("a", 1, "x", 1),
            Record::new("b", 2, "x", 1).with_result("zstd", ratio_only(1, 1)),
        ];
        let grouped = group_by_dataset(&records);
        assert_eq!(grouped["b"].len(), 2);
        assert_eq!(grouped["a"].len(), 1);
        assert_eq!(datasets(&records), vec!["a", "b"]);
    }
}
