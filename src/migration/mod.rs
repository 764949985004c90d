//! Locker Migration Module
//!
//! This module holds the pipeline that moves live locks from the legacy locker into the new
//! one. Each submodule owns one stage:
//!
//! - `reconciler`: Reads a legacy lock and resolves its effective owner.
//! - `filter`: Drops expired positions and computes the remaining duration.
//! - `batcher`: Splits accepted units into ordered, size-bounded batches.
//! - `writer`: Submits one batch to the new locker and waits for confirmation.
//! - `progress_tracker`: Counts and logs scan progress and skips.
//! - `repositories` / `state_persistence`: Checkpoint the plan and cursor to disk.
//! - `orchestrator`: Sequences deployment, upgrade, re-pointing, scanning and writing.

/// Order-preserving batching
pub mod batcher;
/// Expiry filter and duration computation
pub mod filter;
/// Main coordinator for the migration run
pub mod orchestrator;
/// Scan progress and skip statistics
pub mod progress_tracker;
/// Owner resolution against the legacy registry
pub mod reconciler;
/// Plan storage backends
pub mod repositories;
/// Checkpoint service used by the orchestrator
pub mod state_persistence;
/// Shared migration types
pub mod types;
/// Batch submission
pub mod writer;

pub use orchestrator::*;
pub use types::*;
