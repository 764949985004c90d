//!
//! Utility module for the locker migration.
//!
//! Re-exports formatting helpers used in operator-facing log lines.
/// Utility functions for formatting and display
pub mod index;

pub use index::{format_token_amount, sum_token_amounts};
