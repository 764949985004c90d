//! Progress tracking for the legacy scan.
//!
//! This module provides the `ScanProgressTracker`, which counts scanned ids, accepted units and
//! skips by reason, and logs progress at a fixed interval so operators can follow a long scan.

use crate::migration::types::{Skip, SkipReason};

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Ids between two progress lines.
pub const PROGRESS_INTERVAL: u64 = 50;

/// Service for tracking scan progress
#[derive(Debug, Clone)]
pub struct ScanProgressTracker {
	/// Last id in the range
	total: u64,
	/// Ids processed so far
	scanned: u64,
	/// Ids that produced a unit
	accepted: usize,
	/// Skips by reason
	skipped: BTreeMap<SkipReason, usize>,
	/// Ids between progress lines
	interval: u64,
}

impl ScanProgressTracker {
	/// Create a tracker for ids `1..=total`.
	pub fn new(total: u64) -> Self {
		Self {
			total,
			scanned: 0,
			accepted: 0,
			skipped: BTreeMap::new(),
			interval: PROGRESS_INTERVAL,
		}
	}

	/// Record an id that produced a migration unit
	pub fn record_accepted(&mut self, entity_id: u64) {
		self.accepted += 1;
		self.advance(entity_id);
	}

	/// Record a skipped id and log why
	pub fn record_skip(&mut self, skip: &Skip) {
		*self.skipped.entry(skip.reason).or_insert(0) += 1;
		match skip.reason {
			// Unminted and withdrawn ids are the common case; keep them below info.
			SkipReason::NoPosition => debug!("Skipping {}", skip),
			SkipReason::LookupFailed => warn!("Error getting {}", skip),
			SkipReason::NoOwner | SkipReason::Expired => info!("Skipping {}", skip),
		}
		self.advance(skip.entity_id);
	}

	fn advance(&mut self, entity_id: u64) {
		self.scanned += 1;
		if entity_id % self.interval == 0 {
			info!("Processing token {}/{}", entity_id, self.total);
		}
	}

	/// Get scan statistics as a ScanStats struct
	pub fn get_stats(&self) -> ScanStats {
		ScanStats {
			total: self.total,
			scanned: self.scanned,
			accepted: self.accepted,
			skipped: self.skipped.clone(),
		}
	}
}

/// Statistics about a finished or running scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStats {
	pub total: u64,
	pub scanned: u64,
	pub accepted: usize,
	pub skipped: BTreeMap<SkipReason, usize>,
}

impl ScanStats {
	pub fn skipped_total(&self) -> usize {
		self.skipped.values().sum()
	}

	/// Get a human-readable summary of the scan statistics
	pub fn summary(&self) -> String {
		format!(
			"Scanned {} of {} tokens: {} prepared, {} skipped{}",
			self.scanned,
			self.total,
			self.accepted,
			self.skipped_total(),
			if self.skipped.is_empty() {
				String::new()
			} else {
				format!(
					" ({})",
					self.skipped
						.iter()
						.map(|(reason, count)| format!("{}: {}", reason, count))
						.collect::<Vec<_>>()
						.join(", ")
				)
			}
		)
	}
}
