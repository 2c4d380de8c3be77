//! Read-only collaborator interfaces consumed by dataset building.
//!
//! The git-backed implementation lives in `fixpulse-mining`; tests and
//! other front-ends can supply their own.

use crate::error::FixPulseError;
use crate::types::{AuthorInfo, ChangeTally, CommitInfo, Version};

/// Lookup interface over a fully extracted repository history.
///
/// Implementations are built once before any chunk is processed and are
/// never mutated afterwards.
pub trait HistorySource {
    /// Ids of every tracked entity, in a stable order.
    fn entities(&self) -> Vec<&str>;

    /// Ordered versions of `entity`, one per touching commit.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] for an unknown entity.
    fn list_versions(&self, entity: &str) -> Result<&[Version], FixPulseError>;

    /// Whether `commit` was classified as a bug fix.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] for an unknown commit.
    fn is_fix_commit(&self, commit: &str) -> Result<bool, FixPulseError>;

    /// Aggregated info for `commit`.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] for an unknown commit.
    fn commit_info(&self, commit: &str) -> Result<&CommitInfo, FixPulseError>;

    /// Aggregated info for `author`.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] for an unknown author.
    fn author_info(&self, author: &str) -> Result<&AuthorInfo, FixPulseError>;

    /// Earliest commit time in the whole repository, if any commit exists.
    fn first_commit_time(&self) -> Option<i64>;
}

/// Source of per-version change tallies (a diff against the predecessor).
pub trait ChangeSource {
    /// Changes introduced by `version` relative to the previous version of
    /// the same entity.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] when the diff is unavailable.
    fn diff_changes(&self, version: &Version) -> Result<ChangeTally, FixPulseError>;
}
