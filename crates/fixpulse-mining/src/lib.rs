//! Git history extraction: per-file versions, fix commits, and the
//! commit/author index.
//!
//! Mines git history using git2, follows files across renames, tallies the
//! line-level changes each commit made to each tracked file, and aggregates
//! per-commit and per-author totals into an immutable [`index::HistoryIndex`]
//! that the dataset builder reads from.

pub mod fixes;
pub mod index;
pub mod mining;
