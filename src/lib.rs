pub mod baseline;
pub mod chart;
pub mod config;
pub mod decompose;
pub mod error;
pub mod extract;
pub mod record;
pub mod series;
pub mod summary;

pub use baseline::Baseline;
pub use config::{FamilyTable, FormatFamily, SeriesConfig};
pub use decompose::{Decomposer, Decomposition, Factor};
pub use error::RecordError;
pub use extract::{Extractor, MetricKind, Point, SeriesKey};
pub use record::{AlgorithmResult, Direction, Record, TimingStats};
pub use series::Series;
