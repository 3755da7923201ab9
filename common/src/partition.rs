//! Routing of intermediate keys to reduce partitions.

use std::hash::Hasher;

use anyhow::{ensure, Result};

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// FNV-1a with the standard offset basis, so the result never depends on the
/// process, the platform or a random seed.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Maps keys onto a fixed number of reduce buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    split_count: u32,
}

impl Partitioner {
    pub fn new(split_count: u32) -> Result<Self> {
        ensure!(split_count > 0, "split count must be at least 1");
        Ok(Self { split_count })
    }

    pub fn split_count(&self) -> u32 {
        self.split_count
    }

    /// The reduce bucket `key` belongs to, in `0..split_count`.
    #[inline]
    pub fn bucket(&self, key: &[u8]) -> u32 {
        ihash(key) % self.split_count
    }
}
