//! Commit-group features: one row per prefix of each chunk.
//!
//! Each chunk is the run of commits following a fix. Row `i` describes the
//! group formed by the first `i` commits of that run: commit volume, author
//! diversity, how unevenly change volume is spread across the commits, and
//! how long it has been since the previous fix.

use std::collections::HashSet;

use fixpulse_core::{AuthorInfo, CommitInfo, FixPulseError};

use crate::counter::ChangeCounter;
use crate::processor::{ChunkProcessor, ProcessContext};
use crate::schema::{FeatureVector, Schema};
use crate::segment::Chunk;
use crate::sink::DatasetSink;

pub const NUM_COMMITS: &str = "numCommits";
pub const NUM_AUTHORS: &str = "numAuthors";
pub const AVG_CHANGES: &str = "avgChanges";
pub const AVG_ENTITIES: &str = "avgEntities";
pub const AVG_AUTHOR_COMMITS: &str = "avgAuthorCommits";
pub const AVG_AUTHOR_CHANGES: &str = "avgAuthorChanges";
pub const AVG_CHANGE_RATIO: &str = "avgChangeRatio";
pub const CHANGE_GINI: &str = "changeGini";
pub const TIME_SINCE_LAST_FIX: &str = "timeSinceLastFix";

/// Group attributes in column order.
pub const GROUP_ATTRIBUTES: [&str; 9] = [
    NUM_COMMITS,
    NUM_AUTHORS,
    AVG_CHANGES,
    AVG_ENTITIES,
    AVG_AUTHOR_COMMITS,
    AVG_AUTHOR_CHANGES,
    AVG_CHANGE_RATIO,
    CHANGE_GINI,
    TIME_SINCE_LAST_FIX,
];

/// Emits one [`FeatureVector`] per prefix length `1..=N` of every chunk.
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::group::{GroupAggregator, GROUP_ATTRIBUTES};
/// use fixpulse_dataset::processor::ChunkProcessor;
/// use fixpulse_dataset::schema::Schema;
///
/// let mut schema = Schema::new();
/// GroupAggregator.register_attributes(&mut schema);
/// assert_eq!(schema.feature_names().collect::<Vec<_>>(), GROUP_ATTRIBUTES.to_vec());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupAggregator;

impl ChunkProcessor for GroupAggregator {
    fn name(&self) -> &'static str {
        "group"
    }

    fn register_attributes(&self, schema: &mut Schema) {
        for name in GROUP_ATTRIBUTES {
            schema.add_numeric(name);
        }
    }

    fn process_chunk(
        &self,
        chunk: &Chunk,
        ctx: &ProcessContext<'_>,
        sink: &mut dyn DatasetSink,
    ) -> Result<(), FixPulseError> {
        let mut state = GroupState::new(chunk.len());
        let mut version_counter = ChangeCounter::new();

        for version in &chunk.versions {
            version_counter
                .reset()
                .count_changes(ctx.changes, version)?;
            let commit = ctx.history.commit_info(&version.commit)?;
            let author = ctx.history.author_info(&commit.author)?;

            let vector = state.advance(chunk, &version_counter, commit, author)?;
            sink.emit(vector, chunk.label())?;
        }

        Ok(())
    }
}

/// Running sums for the chunk being processed. Created fresh per chunk.
#[derive(Debug, Default)]
struct GroupState {
    chunk_counter: ChangeCounter,
    authors: HashSet<String>,
    total_changes: u64,
    total_entities: u64,
    total_author_commits: u64,
    total_author_changes: u64,
    change_ratio_sum: f64,
    num_changes: Vec<u64>,
    num_changes_diff_sum: u64,
}

impl GroupState {
    fn new(capacity: usize) -> Self {
        Self {
            num_changes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Fold one more version into the group and describe the new prefix.
    fn advance(
        &mut self,
        chunk: &Chunk,
        version_counter: &ChangeCounter,
        commit: &CommitInfo,
        author: &AuthorInfo,
    ) -> Result<FeatureVector, FixPulseError> {
        let invariant = |reason: String| FixPulseError::Computation {
            entity: chunk.entity.clone(),
            chunk: chunk.index,
            reason,
        };

        if commit.num_changes == 0 {
            return Err(invariant(format!(
                "commit {} records zero changes",
                commit.id
            )));
        }

        self.chunk_counter.add(version_counter);
        let version_changes = version_counter.total_sum();

        self.total_changes += commit.num_changes;
        self.total_entities += commit.num_entities;
        self.total_author_commits += author.num_commits;
        self.total_author_changes += author.num_changes;
        self.change_ratio_sum += version_changes as f64 / commit.num_changes as f64;

        // Pairwise deviation against every earlier version of this chunk.
        self.num_changes_diff_sum += self
            .num_changes
            .iter()
            .map(|&earlier| earlier.abs_diff(version_changes))
            .sum::<u64>();
        self.num_changes.push(version_changes);

        self.authors.insert(commit.author.clone());

        let chunk_total = self.chunk_counter.total_sum();
        if chunk_total == 0 {
            return Err(invariant(
                "chunk change total is zero; dispersion is undefined".into(),
            ));
        }

        let num_commits = self.num_changes.len() as f64;
        let mut vector = FeatureVector::new(&chunk.entity, chunk.index);
        vector
            .set(NUM_COMMITS, num_commits)
            .set(NUM_AUTHORS, self.authors.len() as f64)
            .set(AVG_CHANGES, self.total_changes as f64 / num_commits)
            .set(AVG_ENTITIES, self.total_entities as f64 / num_commits)
            .set(AVG_AUTHOR_COMMITS, self.total_author_commits as f64 / num_commits)
            .set(AVG_AUTHOR_CHANGES, self.total_author_changes as f64 / num_commits)
            .set(AVG_CHANGE_RATIO, self.change_ratio_sum / num_commits)
            .set(
                CHANGE_GINI,
                self.num_changes_diff_sum as f64 / (num_commits * chunk_total as f64),
            )
            .set(
                TIME_SINCE_LAST_FIX,
                (commit.time - chunk.last_fix_time) as f64,
            );
        Ok(vector)
    }
}
