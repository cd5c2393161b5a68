use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compression_breakdown::chart::generate_dataset_charts;
use compression_breakdown::config::{series_for_family, FamilyTable};
use compression_breakdown::decompose::Decomposer;
use compression_breakdown::extract::{Extractor, MetricKind, SeriesKey};
use compression_breakdown::record::{load_records, Record};
use compression_breakdown::series::datasets;
use compression_breakdown::summary::{print_summary, summarize};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compression-breakdown")]
#[command(about = "Normalize and decompose batch-size compression benchmark results")]
struct Cli {
    /// JSON file describing format families (defaults to the OTel and TPC-H families)
    #[arg(long, global = true)]
    families: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write SVG charts for every dataset in a results file
    Plot {
        /// Benchmark results JSON
        input: PathBuf,

        /// Output directory for charts
        #[arg(short, long, default_value = "./plots")]
        output: PathBuf,

        /// Only plot this dataset
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Print one metric series
    Extract {
        input: PathBuf,

        #[arg(short, long)]
        dataset: String,

        #[arg(long)]
        variant: String,

        #[arg(short, long, default_value = "zstd")]
        algorithm: String,

        /// compression_ratio, {compression,decompression}_{time,throughput,speed}
        #[arg(short, long, default_value = "compression_ratio")]
        metric: MetricKind,
    },

    /// Print format efficiency, algorithm effectiveness and final ratio
    Decompose {
        input: PathBuf,

        #[arg(short, long)]
        dataset: String,

        #[arg(long)]
        variant: String,

        #[arg(short, long, default_value = "zstd")]
        algorithm: String,
    },

    /// Print per-format size tables at one batch size
    Summary {
        input: PathBuf,

        #[arg(short, long, default_value = "50000")]
        batch_size: u64,

        #[arg(short, long)]
        dataset: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let families = match &cli.families {
        Some(path) => FamilyTable::load(path)?,
        None => FamilyTable::default(),
    };

    match cli.command {
        Commands::Plot {
            input,
            output,
            dataset,
        } => {
            let records = load_input(&input)?;
            plot(&records, &families, dataset.as_deref(), &output)?;
        }
        Commands::Extract {
            input,
            dataset,
            variant,
            algorithm,
            metric,
        } => {
            let records = load_input(&input)?;
            let extractor = Extractor::new(&records, &families);
            let key = SeriesKey::new(&dataset, &variant, &algorithm);
            let points = extractor.extract(&key, metric);

            println!("{} / {} + {} : {}", dataset, variant, algorithm, metric.axis_label());
            if points.is_empty() {
                println!("  no data");
            }
            for point in points {
                match point.std {
                    Some(std) => println!("  {:>10} {:>12.3} ±{:.3}", point.batch_size, point.value, std),
                    None => println!("  {:>10} {:>12.3}", point.batch_size, point.value),
                }
            }
        }
        Commands::Decompose {
            input,
            dataset,
            variant,
            algorithm,
        } => {
            let records = load_input(&input)?;
            let decomposer = Decomposer::new(&records, &families);
            let decomposition = decomposer.decompose(&SeriesKey::new(&dataset, &variant, &algorithm));

            println!("\n{} / {} + {}", dataset, variant, algorithm);
            println!("{:=<72}", "");
            println!(
                "{:>10} {:>14} {:>14} {:>14} {:>14}",
                "Batch", "Format eff.", "Algo eff.", "Final ratio", "Identity err"
            );
            println!("{:-<72}", "");
            if decomposition.points().is_empty() {
                println!("  no data (no reference records for this dataset?)");
            }
            for point in decomposition.points() {
                println!(
                    "{:>10} {:>13.3}x {:>13.3}x {:>13.3}x {:>14.2e}",
                    point.batch_size,
                    point.format_efficiency,
                    point.algorithm_effectiveness,
                    point.final_ratio,
                    point.identity_error()
                );
            }
        }
        Commands::Summary {
            input,
            batch_size,
            dataset,
        } => {
            let records = load_input(&input)?;
            let algorithms: BTreeSet<&str> = records
                .iter()
                .flat_map(|r| r.algorithm_results.keys().map(String::as_str))
                .collect();
            let algorithms: Vec<&str> = algorithms.into_iter().collect();

            for name in selected_datasets(&records, dataset.as_deref()) {
                let rows = summarize(&records, &families, name, batch_size);
                if rows.is_empty() {
                    continue;
                }
                print_summary(name, batch_size, &rows, &algorithms);
            }
            println!();
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_input(path: &Path) -> Result<Vec<Record>> {
    let records = load_records(path)?;
    println!("Loaded {} results from {}", records.len(), path.display());
    Ok(records)
}

fn selected_datasets<'a>(records: &'a [Record], only: Option<&str>) -> Vec<&'a str> {
    datasets(records)
        .into_iter()
        .filter(|name| only.map_or(true, |wanted| wanted == *name))
        .collect()
}

/// Name of the family whose variants appear in `dataset`
fn dataset_family<'a>(records: &[Record], families: &'a FamilyTable, dataset: &str) -> Option<&'a str> {
    records
        .iter()
        .filter(|r| r.dataset == dataset)
        .find_map(|r| families.role(&r.variant).family())
        .map(|family| family.name.as_str())
}

fn plot(records: &[Record], families: &FamilyTable, only: Option<&str>, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let names = selected_datasets(records, only);
    println!("Found {} datasets: {:?}", names.len(), names);

    // Datasets only read the shared records, so they can be drawn in parallel
    let written: Vec<PathBuf> = names
        .par_iter()
        .map(|&dataset| {
            let family = dataset_family(records, families, dataset).unwrap_or_default();
            let configs = series_for_family(family);
            generate_dataset_charts(records, families, dataset, &configs, output_dir)
                .with_context(|| format!("Failed to plot {}", dataset))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    for path in &written {
        println!("Generated: {}", path.display());
    }
    if written.is_empty() {
        println!("No data to plot");
    } else {
        println!("\nAll {} plots saved to: {}", written.len(), output_dir.display());
    }
    Ok(())
}
