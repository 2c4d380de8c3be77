use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One historical state of a tracked entity, as produced by one commit.
///
/// # Examples
///
/// ```
/// use fixpulse_core::Version;
///
/// let v = Version {
///     entity: "src/Parser.java".into(),
///     commit: "3f2a9c1d".into(),
///     ordinal: 0,
/// };
/// assert_eq!(v.ordinal, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Identity of the owning entity (the path it was first tracked under).
    pub entity: String,
    /// Id of the commit that produced this version.
    pub commit: String,
    /// Zero-based position within the entity's history.
    pub ordinal: usize,
}

/// Per-commit aggregate computed once over the whole history.
///
/// # Examples
///
/// ```
/// use fixpulse_core::CommitInfo;
///
/// let info = CommitInfo {
///     id: "3f2a9c1d".into(),
///     author: "alice@example.com".into(),
///     time: 1_700_000_000,
///     num_changes: 12,
///     num_entities: 3,
/// };
/// assert_eq!(info.num_entities, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    /// Commit id.
    pub id: String,
    /// Author identity.
    pub author: String,
    /// Commit time in seconds since the Unix epoch.
    pub time: i64,
    /// Structural changes introduced by this commit across all entities.
    pub num_changes: u64,
    /// Entities touched by this commit.
    pub num_entities: u64,
}

/// Per-author aggregate computed once over the whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    /// Author identity.
    pub author: String,
    /// Commits authored over the whole history.
    pub num_commits: u64,
    /// Changes authored over the whole history.
    pub num_changes: u64,
}

/// Kind of a discrete change found when diffing a version against its predecessor.
///
/// # Examples
///
/// ```
/// use fixpulse_core::ChangeKind;
///
/// assert_eq!(ChangeKind::Update.to_string(), "update");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A new element was inserted.
    Insert,
    /// An element was removed.
    Delete,
    /// An element was moved or renamed.
    Move,
    /// An element was modified in place.
    Update,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "insert"),
            ChangeKind::Delete => write!(f, "delete"),
            ChangeKind::Move => write!(f, "move"),
            ChangeKind::Update => write!(f, "update"),
        }
    }
}

/// Occurrence counts of each [`ChangeKind`] for one version.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{ChangeKind, ChangeTally};
///
/// let mut a = ChangeTally::new();
/// a.record(ChangeKind::Insert, 3);
/// let mut b = ChangeTally::new();
/// b.record(ChangeKind::Insert, 1);
/// b.record(ChangeKind::Delete, 2);
///
/// a.merge(&b);
/// assert_eq!(a.count(ChangeKind::Insert), 4);
/// assert_eq!(a.total(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTally {
    counts: BTreeMap<ChangeKind, u64>,
}

impl ChangeTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` occurrences of `kind`. Recording zero is a no-op.
    pub fn record(&mut self, kind: ChangeKind, n: u64) {
        if n > 0 {
            *self.counts.entry(kind).or_default() += n;
        }
    }

    /// Occurrences of `kind`.
    pub fn count(&self, kind: ChangeKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of all kind counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Element-wise sum of `other` into `self`.
    pub fn merge(&mut self, other: &ChangeTally) {
        for (kind, n) in &other.counts {
            self.record(*kind, *n);
        }
    }

    /// `true` when no change has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterate `(kind, count)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, u64)> + '_ {
        self.counts.iter().map(|(k, n)| (*k, *n))
    }

    /// Drop every recorded count.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Serialization format for an emitted dataset.
///
/// # Examples
///
/// ```
/// use fixpulse_core::DatasetFormat;
///
/// let fmt: DatasetFormat = "jsonl".parse().unwrap();
/// assert_eq!(fmt, DatasetFormat::JsonLines);
/// assert_eq!(DatasetFormat::default(), DatasetFormat::Arff);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Weka attribute-relation file.
    #[default]
    Arff,
    /// Comma-separated values with a header row.
    Csv,
    /// One JSON object per row.
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetFormat::Arff => write!(f, "arff"),
            DatasetFormat::Csv => write!(f, "csv"),
            DatasetFormat::JsonLines => write!(f, "jsonl"),
        }
    }
}

impl FromStr for DatasetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arff" => Ok(DatasetFormat::Arff),
            "csv" => Ok(DatasetFormat::Csv),
            "jsonl" | "json-lines" | "ndjson" => Ok(DatasetFormat::JsonLines),
            other => Err(format!("unknown dataset format: {other}")),
        }
    }
}

/// Which time the first chunk of an entity measures `timeSinceLastFix` from.
///
/// # Examples
///
/// ```
/// use fixpulse_core::FirstFixTime;
///
/// let policy: FirstFixTime = "entity".parse().unwrap();
/// assert_eq!(policy, FirstFixTime::Entity);
/// assert_eq!(FirstFixTime::default(), FirstFixTime::Repository);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstFixTime {
    /// Earliest commit time in the whole repository.
    #[default]
    Repository,
    /// Time of the entity's own first version.
    Entity,
    /// The Unix epoch (0).
    Epoch,
}

impl fmt::Display for FirstFixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirstFixTime::Repository => write!(f, "repository"),
            FirstFixTime::Entity => write!(f, "entity"),
            FirstFixTime::Epoch => write!(f, "epoch"),
        }
    }
}

impl FromStr for FirstFixTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repository" | "repo" => Ok(FirstFixTime::Repository),
            "entity" => Ok(FirstFixTime::Entity),
            "epoch" => Ok(FirstFixTime::Epoch),
            other => Err(format!("unknown first-fix-time policy: {other}")),
        }
    }
}
