use crate::config::{FamilyTable, FormatFamily};
use crate::record::Record;
use std::collections::BTreeMap;
use tracing::debug;

/// Reference-encoding uncompressed bytes for one dataset, keyed by batch size
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    bytes_by_batch: BTreeMap<u64, u64>,
}

impl Baseline {
    /// Collect the reference records of `family` for `dataset`.
    ///
    /// Records are visited in input order and a later record for the same
    /// batch size replaces an earlier one. Finding nothing is not an error.
    pub fn resolve(records: &[Record], dataset: &str, family: &FormatFamily) -> Self {
        let mut bytes_by_batch = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.dataset == dataset && family.is_reference(&r.variant))
        {
            if let Some(previous) = bytes_by_batch.insert(record.batch_size, record.uncompressed_bytes)
            {
                debug!(
                    dataset,
                    batch_size = record.batch_size,
                    previous,
                    replacement = record.uncompressed_bytes,
                    "duplicate reference record, keeping the later one"
                );
            }
        }
        Self { bytes_by_batch }
    }

    /// Baseline for the family `variant` belongs to; empty for unlisted variants
    pub fn resolve_for_variant(
        records: &[Record],
        dataset: &str,
        variant: &str,
        families: &FamilyTable,
    ) -> Self {
        match families.role(variant).family() {
            Some(family) => Self::resolve(records, dataset, family),
            None => Self::default(),
        }
    }

    pub fn get(&self, batch_size: u64) -> Option<u64> {
        self.bytes_by_batch.get(&batch_size).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_by_batch.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes_by_batch.len()
    }

    pub fn batch_sizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.bytes_by_batch.keys().copied()
    }
}
