use crate::baseline::Baseline;
use crate::config::{FamilyTable, VariantRole};
use crate::record::Record;

/// Compressed size and baseline-relative ratio for one algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmCell {
    pub algorithm: String,
    pub compressed_bytes: u64,
    pub ratio: f64,
    pub bytes_per_point: Option<f64>,
}

/// One format variant of a dataset at a fixed batch size
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub variant: String,
    pub is_reference: bool,
    pub uncompressed_bytes: u64,
    /// Reference bytes over this variant's bytes; 1.0 for the reference
    pub uncompressed_ratio: f64,
    pub uncompressed_bytes_per_point: Option<f64>,
    pub algorithms: Vec<AlgorithmCell>,
}

impl SummaryRow {
    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmCell> {
        self.algorithms.iter().find(|c| c.algorithm == name)
    }
}

/// Build summary rows for every variant of `dataset` measured at `batch_size`.
///
/// Reference variants come first, then the rest in input order. When the
/// dataset has no reference record at this batch size, each row is measured
/// against its own uncompressed bytes.
pub fn summarize(
    records: &[Record],
    families: &FamilyTable,
    dataset: &str,
    batch_size: u64,
) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = records
        .iter()
        .filter(|r| r.dataset == dataset && r.batch_size == batch_size)
        .map(|record| {
            let role = families.role(&record.variant);
            let reference = role
                .family()
                .and_then(|family| Baseline::resolve(records, dataset, family).get(batch_size))
                .unwrap_or(record.uncompressed_bytes);
            build_row(record, role, reference)
        })
        .collect();

    // Stable, so non-reference rows keep input order
    rows.sort_by_key(|row| !row.is_reference);
    rows
}

fn build_row(record: &Record, role: VariantRole<'_>, reference: u64) -> SummaryRow {
    let per_point = |bytes: u64| {
        record
            .total_data_points
            .filter(|&points| points > 0)
            .map(|points| bytes as f64 / points as f64)
    };
    let ratio = |bytes: u64| {
        if bytes > 0 {
            reference as f64 / bytes as f64
        } else {
            0.0
        }
    };

    SummaryRow {
        variant: record.variant.clone(),
        is_reference: matches!(role, VariantRole::Reference(_)),
        uncompressed_bytes: record.uncompressed_bytes,
        uncompressed_ratio: ratio(record.uncompressed_bytes),
        uncompressed_bytes_per_point: per_point(record.uncompressed_bytes),
        algorithms: record
            .algorithm_results
            .iter()
            .map(|(name, result)| AlgorithmCell {
                algorithm: name.clone(),
                compressed_bytes: result.compressed_bytes,
                ratio: ratio(result.compressed_bytes),
                bytes_per_point: per_point(result.compressed_bytes),
            })
            .collect(),
    }
}

/// Human-readable decimal byte count
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.2} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{} B", bytes)
    }
}

fn format_per_point(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Print a summary table to the console
pub fn print_summary(dataset: &str, batch_size: u64, rows: &[SummaryRow], algorithms: &[&str]) {
    println!("\n{} (batch size = {})", dataset, batch_size);
    println!("{:=<100}", "");

    print!("{:<20} {:>12} {:>8} {:>10}", "Format", "Uncomp", "Ratio", "B/pt");
    for algorithm in algorithms {
        print!("   {:>12} {:>8} {:>10}", algorithm, "Ratio", "B/pt");
    }
    println!();
    println!("{:-<100}", "");

    for row in rows {
        print!(
            "{:<20} {:>12} {:>7.2}x {:>10}",
            row.variant,
            format_bytes(row.uncompressed_bytes),
            row.uncompressed_ratio,
            format_per_point(row.uncompressed_bytes_per_point),
        );
        for algorithm in algorithms {
            match row.algorithm(algorithm) {
                Some(cell) => print!(
                    "   {:>12} {:>7.2}x {:>10}",
                    format_bytes(cell.compressed_bytes),
                    cell.ratio,
                    format_per_point(cell.bytes_per_point),
                ),
                None => print!("   {:>12} {:>8} {:>10}", "-", "-", "-"),
            }
        }
        println!();
    }
}
