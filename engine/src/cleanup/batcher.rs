use super::types::{Batch, ResourceName};
use crate::common::ConfigError;

/// Splits the filtered names into fixed-size progress checkpoints.
///
/// Partitioning is deterministic, order preserving and exhaustive: every input
/// name lands in exactly one batch, duplicates included.
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    size: usize,
}

impl Batcher {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::BatchSize { configured: size });
        }
        Ok(Self { size })
    }

    /// Number of batches `len` names will produce
    pub fn batch_count(&self, len: usize) -> usize {
        len.div_ceil(self.size)
    }

    pub fn partition(&self, names: Vec<ResourceName>) -> Vec<Batch> {
        let total = self.batch_count(names.len());
        let mut batches = Vec::with_capacity(total);
        let mut remaining = names.into_iter().peekable();

        while remaining.peek().is_some() {
            let chunk: Vec<ResourceName> = remaining.by_ref().take(self.size).collect();
            batches.push(Batch::new(batches.len() + 1, total, chunk));
        }

        batches
    }
}

/// Partition `names` into batches of at most `size`
pub fn partition(names: Vec<ResourceName>, size: usize) -> Result<Vec<Batch>, ConfigError> {
    Ok(Batcher::new(size)?.partition(names))
}
