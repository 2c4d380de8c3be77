//! Read-only commit/author index built once from a mined history.
//!
//! Aggregates per-commit and per-author totals over the whole history and
//! groups touches into ordered per-entity version lists. The index is
//! immutable after [`HistoryIndex::build`] and is shared by reference
//! across dataset workers.

use std::collections::{BTreeMap, HashMap, HashSet};

use fixpulse_core::{
    AuthorInfo, ChangeSource, ChangeTally, CommitInfo, FixPulseError, HistorySource, Version,
};

use crate::fixes::FixClassifier;
use crate::mining::RepoHistory;

/// Commit/author index over a complete repository history.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{ChangeKind, ChangeTally, FixConfig, HistorySource};
/// use fixpulse_mining::fixes::FixClassifier;
/// use fixpulse_mining::index::HistoryIndex;
/// use fixpulse_mining::mining::{ChangeStatus, CommitRecord, EntityTouch, RepoHistory};
///
/// let mut tally = ChangeTally::new();
/// tally.record(ChangeKind::Insert, 4);
/// let history = RepoHistory {
///     commits: vec![CommitRecord {
///         id: "c1".into(),
///         author: "alice@example.com".into(),
///         timestamp: 100,
///         message: "initial import".into(),
///         is_merge: false,
///         touches: vec![EntityTouch {
///             entity: "Main.java".into(),
///             path: "Main.java".into(),
///             status: ChangeStatus::Added,
///             tally,
///         }],
///     }],
///     live_entities: ["Main.java".to_string()].into_iter().collect(),
///     skipped_commits: 0,
/// };
///
/// let index = HistoryIndex::build(&history, &FixClassifier::new(&FixConfig::default()));
/// assert_eq!(index.entities(), vec!["Main.java"]);
/// assert_eq!(index.commit_info("c1").unwrap().num_changes, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    commits: HashMap<String, CommitInfo>,
    authors: HashMap<String, AuthorInfo>,
    fixes: HashSet<String>,
    versions: BTreeMap<String, Vec<Version>>,
    tallies: HashMap<(String, String), ChangeTally>,
    live: HashSet<String>,
    first_commit_time: Option<i64>,
    last_commit_time: Option<i64>,
}

impl HistoryIndex {
    /// Aggregate `history` into an index, classifying fixes with `classifier`.
    pub fn build(history: &RepoHistory, classifier: &FixClassifier) -> Self {
        let mut index = Self {
            live: history.live_entities.clone(),
            ..Self::default()
        };

        // entity -> (time, walk position, commit id)
        let mut raw_versions: BTreeMap<String, Vec<(i64, usize, String)>> = BTreeMap::new();

        for (position, record) in history.commits.iter().enumerate() {
            let num_changes: u64 = record.touches.iter().map(|t| t.tally.total()).sum();

            index.commits.insert(
                record.id.clone(),
                CommitInfo {
                    id: record.id.clone(),
                    author: record.author.clone(),
                    time: record.timestamp,
                    num_changes,
                    num_entities: record.touches.len() as u64,
                },
            );

            let author = index
                .authors
                .entry(record.author.clone())
                .or_insert_with(|| AuthorInfo {
                    author: record.author.clone(),
                    num_commits: 0,
                    num_changes: 0,
                });
            author.num_commits += 1;
            author.num_changes += num_changes;

            if classifier.is_fix(record) {
                index.fixes.insert(record.id.clone());
            }

            index.first_commit_time = Some(
                index
                    .first_commit_time
                    .map_or(record.timestamp, |t| t.min(record.timestamp)),
            );
            index.last_commit_time = Some(
                index
                    .last_commit_time
                    .map_or(record.timestamp, |t| t.max(record.timestamp)),
            );

            for touch in &record.touches {
                raw_versions.entry(touch.entity.clone()).or_default().push((
                    record.timestamp,
                    position,
                    record.id.clone(),
                ));
                index
                    .tallies
                    .insert((touch.entity.clone(), record.id.clone()), touch.tally.clone());
            }
        }

        for (entity, mut raw) in raw_versions {
            // Commit time first, walk order breaks ties.
            raw.sort_by_key(|(time, position, _)| (*time, *position));
            let versions = raw
                .into_iter()
                .enumerate()
                .map(|(ordinal, (_, _, commit))| Version {
                    entity: entity.clone(),
                    commit,
                    ordinal,
                })
                .collect();
            index.versions.insert(entity, versions);
        }

        index
    }

    /// Number of indexed commits.
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Number of commits classified as fixes.
    pub fn fix_count(&self) -> usize {
        self.fixes.len()
    }

    /// Number of distinct authors.
    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    /// Earliest and latest commit times, if any commit exists.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        self.first_commit_time.zip(self.last_commit_time)
    }
}

impl HistorySource for HistoryIndex {
    /// Entities alive at the walked tip that have at least one version.
    fn entities(&self) -> Vec<&str> {
        self.versions
            .keys()
            .filter(|entity| self.live.contains(entity.as_str()))
            .map(String::as_str)
            .collect()
    }

    fn list_versions(&self, entity: &str) -> Result<&[Version], FixPulseError> {
        self.versions
            .get(entity)
            .map(Vec::as_slice)
            .ok_or_else(|| FixPulseError::Extraction(format!("unknown entity '{entity}'")))
    }

    fn is_fix_commit(&self, commit: &str) -> Result<bool, FixPulseError> {
        if !self.commits.contains_key(commit) {
            return Err(FixPulseError::Extraction(format!("unknown commit '{commit}'")));
        }
        Ok(self.fixes.contains(commit))
    }

    fn commit_info(&self, commit: &str) -> Result<&CommitInfo, FixPulseError> {
        self.commits
            .get(commit)
            .ok_or_else(|| FixPulseError::Extraction(format!("no commit info for '{commit}'")))
    }

    fn author_info(&self, author: &str) -> Result<&AuthorInfo, FixPulseError> {
        self.authors
            .get(author)
            .ok_or_else(|| FixPulseError::Extraction(format!("no author info for '{author}'")))
    }

    fn first_commit_time(&self) -> Option<i64> {
        self.first_commit_time
    }
}

impl ChangeSource for HistoryIndex {
    fn diff_changes(&self, version: &Version) -> Result<ChangeTally, FixPulseError> {
        self.tallies
            .get(&(version.entity.clone(), version.commit.clone()))
            .cloned()
            .ok_or_else(|| {
                FixPulseError::Extraction(format!(
                    "no diff recorded for {} at {}",
                    version.entity, version.commit
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::{ChangeStatus, CommitRecord, EntityTouch};
    use fixpulse_core::{ChangeKind, FixConfig};

    fn touch(entity: &str, inserts: u64) -> EntityTouch {
        let mut tally = ChangeTally::new();
        tally.record(ChangeKind::Insert, inserts);
        EntityTouch {
            entity: entity.into(),
            path: entity.into(),
            status: ChangeStatus::Modified,
            tally,
        }
    }

    fn commit(id: &str, author: &str, timestamp: i64, message: &str, touches: Vec<EntityTouch>) -> CommitRecord {
        CommitRecord {
            id: id.into(),
            author: author.into(),
            timestamp,
            message: message.into(),
            is_merge: false,
            touches,
        }
    }

    fn build(commits: Vec<CommitRecord>, live: &[&str]) -> HistoryIndex {
        let history = RepoHistory {
            commits,
            live_entities: live.iter().map(|s| s.to_string()).collect(),
            skipped_commits: 0,
        };
        HistoryIndex::build(&history, &FixClassifier::new(&FixConfig::default()))
    }

    #[test]
    fn commit_totals_sum_over_entities() {
        let index = build(
            vec![commit("c1", "alice", 10, "add", vec![touch("A", 3), touch("B", 2)])],
            &["A", "B"],
        );
        let info = index.commit_info("c1").unwrap();
        assert_eq!(info.num_changes, 5);
        assert_eq!(info.num_entities, 2);
    }

    #[test]
    fn author_totals_cover_whole_history() {
        let index = build(
            vec![
                commit("c1", "alice", 10, "add", vec![touch("A", 3)]),
                commit("c2", "bob", 20, "tweak", vec![touch("A", 1)]),
                commit("c3", "alice", 30, "docs", vec![]),
            ],
            &["A"],
        );
        let alice = index.author_info("alice").unwrap();
        assert_eq!(alice.num_commits, 2);
        assert_eq!(alice.num_changes, 3);
        assert_eq!(index.author_info("bob").unwrap().num_commits, 1);
        assert_eq!(index.author_count(), 2);
    }

    #[test]
    fn versions_are_ordered_by_time_then_walk_order() {
        let index = build(
            vec![
                commit("c1", "alice", 50, "a", vec![touch("A", 1)]),
                commit("c2", "alice", 10, "b", vec![touch("A", 1)]),
                commit("c3", "alice", 50, "c", vec![touch("A", 1)]),
            ],
            &["A"],
        );
        let versions = index.list_versions("A").unwrap();
        let commits: Vec<&str> = versions.iter().map(|v| v.commit.as_str()).collect();
        assert_eq!(commits, vec!["c2", "c1", "c3"]);
        let ordinals: Vec<usize> = versions.iter().map(|v| v.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn fixes_are_classified_from_messages() {
        let index = build(
            vec![
                commit("c1", "alice", 10, "add parser", vec![touch("A", 1)]),
                commit("c2", "alice", 20, "fix parser crash", vec![touch("A", 1)]),
            ],
            &["A"],
        );
        assert!(!index.is_fix_commit("c1").unwrap());
        assert!(index.is_fix_commit("c2").unwrap());
        assert_eq!(index.fix_count(), 1);
    }

    #[test]
    fn only_live_entities_are_listed() {
        let index = build(
            vec![commit("c1", "alice", 10, "add", vec![touch("A", 1), touch("Dead", 1)])],
            &["A"],
        );
        assert_eq!(index.entities(), vec!["A"]);
        assert!(index.list_versions("Dead").is_ok());
    }

    #[test]
    fn unknown_lookups_are_extraction_failures() {
        let index = build(vec![], &[]);
        assert!(matches!(
            index.commit_info("nope"),
            Err(FixPulseError::Extraction(_))
        ));
        assert!(matches!(
            index.author_info("nobody"),
            Err(FixPulseError::Extraction(_))
        ));
        assert!(index.is_fix_commit("nope").is_err());
        assert!(index.list_versions("nothing").is_err());
        assert!(index.first_commit_time().is_none());
    }

    #[test]
    fn diff_changes_returns_recorded_tally() {
        let index = build(
            vec![commit("c1", "alice", 10, "add", vec![touch("A", 7)])],
            &["A"],
        );
        let version = &index.list_versions("A").unwrap()[0];
        assert_eq!(index.diff_changes(version).unwrap().total(), 7);
    }

    #[test]
    fn time_span_covers_all_commits() {
        let index = build(
            vec![
                commit("c1", "alice", 30, "a", vec![]),
                commit("c2", "alice", 10, "b", vec![]),
            ],
            &[],
        );
        assert_eq!(index.time_span(), Some((10, 30)));
        assert_eq!(index.first_commit_time(), Some(10));
    }
}
