//! Order-preserving batching of migration units.

use crate::migration::types::{MigrationBatch, MigrationUnit};

use std::num::NonZeroUsize;

/// Default number of units per `migrateLocks` call.
///
/// Measured against the destination chain's block gas limit; re-check it before running on a
/// chain with a different limit or fee regime.
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Split `units` into contiguous batches of at most `size`, in input order.
///
/// Batch `i` holds units `[i * size, min((i + 1) * size, len))`; only the last may be short.
pub fn batch(units: Vec<MigrationUnit>, size: NonZeroUsize) -> Vec<MigrationBatch> {
	units
		.chunks(size.get())
		.enumerate()
		.map(|(index, chunk)| MigrationBatch {
			index,
			units: chunk.to_vec(),
		})
		.collect()
}
