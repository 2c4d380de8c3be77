//! Splitting an entity's version history into fix-delimited chunks.
//!
//! A chunk starts right after a fix commit (or at the start of history) and
//! ends at, and includes, the next fix commit. Trailing versions with no
//! terminating fix form a final unfixed chunk.

use fixpulse_core::{FixPulseError, HistorySource, Version};

use crate::schema::Label;

/// A run of consecutive versions of one entity between fix boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Owning entity.
    pub entity: String,
    /// Zero-based position of this chunk within the entity's chunks.
    pub index: usize,
    /// Versions in history order; never empty.
    pub versions: Vec<Version>,
    /// Whether the last version is a fix.
    pub is_fixed: bool,
    /// Time of the fix that ended the previous chunk, or the first-chunk
    /// reference time.
    pub last_fix_time: i64,
}

impl Chunk {
    /// Number of versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always `false` for chunks produced by [`segment`].
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Dataset label shared by every row of this chunk.
    pub fn label(&self) -> Label {
        if self.is_fixed {
            Label::Fixed
        } else {
            Label::Unfixed
        }
    }
}

/// Partition `versions` of `entity` into chunks.
///
/// `first_fix_time` is recorded as the `last_fix_time` of the first chunk.
/// Concatenating the returned chunks reproduces `versions` exactly.
///
/// # Errors
///
/// Returns [`FixPulseError::Extraction`] if a commit lookup fails or the
/// versions are not ordered by commit time and history position.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{AuthorInfo, CommitInfo, FixPulseError, HistorySource, Version};
/// use fixpulse_dataset::segment::segment;
///
/// struct NoFixes(CommitInfo);
///
/// impl HistorySource for NoFixes {
///     fn entities(&self) -> Vec<&str> { vec![] }
///     fn list_versions(&self, _: &str) -> Result<&[Version], FixPulseError> { Ok(&[]) }
///     fn is_fix_commit(&self, _: &str) -> Result<bool, FixPulseError> { Ok(false) }
///     fn commit_info(&self, _: &str) -> Result<&CommitInfo, FixPulseError> { Ok(&self.0) }
///     fn author_info(&self, a: &str) -> Result<&AuthorInfo, FixPulseError> {
///         Err(FixPulseError::Extraction(a.into()))
///     }
///     fn first_commit_time(&self) -> Option<i64> { Some(0) }
/// }
///
/// let history = NoFixes(CommitInfo {
///     id: "c".into(),
///     author: "alice".into(),
///     time: 5,
///     num_changes: 1,
///     num_entities: 1,
/// });
/// let versions: Vec<Version> = (0..3)
///     .map(|ordinal| Version { entity: "A".into(), commit: "c".into(), ordinal })
///     .collect();
///
/// let chunks = segment("A", &versions, &history, 0).unwrap();
/// assert_eq!(chunks.len(), 1);
/// assert!(!chunks[0].is_fixed);
/// assert_eq!(chunks[0].versions, versions);
/// ```
pub fn segment(
    entity: &str,
    versions: &[Version],
    history: &dyn HistorySource,
    first_fix_time: i64,
) -> Result<Vec<Chunk>, FixPulseError> {
    let mut chunks = Vec::new();
    let mut current: Vec<Version> = Vec::new();
    let mut last_fix_time = first_fix_time;
    let mut previous: Option<(i64, usize)> = None;

    for version in versions {
        let commit = history.commit_info(&version.commit)?;

        if let Some((prev_time, prev_ordinal)) = previous {
            if commit.time < prev_time || version.ordinal <= prev_ordinal {
                return Err(FixPulseError::Extraction(format!(
                    "versions of {entity} are out of order at ordinal {}",
                    version.ordinal
                )));
            }
        }
        previous = Some((commit.time, version.ordinal));

        current.push(version.clone());

        if history.is_fix_commit(&version.commit)? {
            chunks.push(Chunk {
                entity: entity.to_string(),
                index: chunks.len(),
                versions: std::mem::take(&mut current),
                is_fixed: true,
                last_fix_time,
            });
            last_fix_time = commit.time;
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            entity: entity.to_string(),
            index: chunks.len(),
            versions: current,
            is_fixed: false,
            last_fix_time,
        });
    }

    Ok(chunks)
}
