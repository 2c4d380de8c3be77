//! Corpus-wide dataset building.
//!
//! Segments every entity's history into chunks, hands each chunk to a
//! [`ChunkProcessor`], and collects the rows into a [`Dataset`]. Entities are
//! independent, so they are processed in parallel with rayon; each worker
//! buffers its rows and buffers are merged in entity order afterwards.
//!
//! Failures never stop the corpus: an entity whose history cannot be read
//! contributes no rows, a chunk that violates an arithmetic invariant is
//! dropped on its own, and every failure is reported in [`BuildReport`].

use fixpulse_core::{ChangeSource, FirstFixTime, FixPulseError, HistorySource, Version};
use rayon::prelude::*;

use crate::processor::{ChunkProcessor, ProcessContext};
use crate::schema::{Label, Schema, CLASS_ATTRIBUTE};
use crate::segment::segment;
use crate::sink::{Dataset, Row};

/// A failure collected while building, attributed to an entity (and chunk).
#[derive(Debug)]
pub struct EntityFailure {
    /// Entity being processed.
    pub entity: String,
    /// Chunk index when only that chunk was dropped.
    pub chunk: Option<usize>,
    /// Underlying error.
    pub error: FixPulseError,
}

/// Result of a corpus-wide build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Name of the chunk processor that produced the rows.
    pub processor: &'static str,
    /// Collected rows.
    pub dataset: Dataset,
    /// Entities visited.
    pub entities: usize,
    /// Chunks that produced rows.
    pub chunks: usize,
    /// Failures in entity order.
    pub failures: Vec<EntityFailure>,
}

impl BuildReport {
    /// `true` when any entity or chunk failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct EntityOutcome {
    rows: Vec<Row>,
    chunks: usize,
    failures: Vec<EntityFailure>,
}

impl EntityOutcome {
    fn aborted(entity: &str, error: FixPulseError) -> Self {
        Self {
            failures: vec![EntityFailure {
                entity: entity.to_string(),
                chunk: None,
                error,
            }],
            ..Self::default()
        }
    }
}

/// Composes chunk segmentation with a pluggable [`ChunkProcessor`].
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::builder::DatasetBuilder;
/// use fixpulse_dataset::group::GroupAggregator;
///
/// let builder = DatasetBuilder::new(GroupAggregator);
/// let names: Vec<&str> = builder.schema().columns().map(|a| a.name.as_str()).collect();
/// assert_eq!(names.first(), Some(&"numCommits"));
/// assert_eq!(names.last(), Some(&"isFixed"));
/// ```
#[derive(Debug, Clone)]
pub struct DatasetBuilder<P> {
    processor: P,
    schema: Schema,
    first_fix_time: FirstFixTime,
    include_unfixed: bool,
}

impl<P: ChunkProcessor> DatasetBuilder<P> {
    /// Create a builder; `processor` registers its attributes and the class
    /// attribute is appended last.
    pub fn new(processor: P) -> Self {
        let mut schema = Schema::new();
        processor.register_attributes(&mut schema);
        schema.set_class(CLASS_ATTRIBUTE, &Label::values());
        Self {
            processor,
            schema,
            first_fix_time: FirstFixTime::default(),
            include_unfixed: true,
        }
    }

    /// Choose the reference time for each entity's first chunk.
    pub fn first_fix_time(mut self, policy: FirstFixTime) -> Self {
        self.first_fix_time = policy;
        self
    }

    /// Whether chunks not terminated by a fix produce rows (default: true).
    pub fn include_unfixed(mut self, include: bool) -> Self {
        self.include_unfixed = include;
        self
    }

    /// The dataset schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build a dataset over every entity of `source`.
    pub fn build<S>(&self, source: &S) -> BuildReport
    where
        S: HistorySource + ChangeSource + Sync,
    {
        self.build_with_progress(source, |_| {})
    }

    /// Like [`DatasetBuilder::build`], calling `on_entity` after each entity.
    pub fn build_with_progress<S, F>(&self, source: &S, on_entity: F) -> BuildReport
    where
        S: HistorySource + ChangeSource + Sync,
        F: Fn(&str) + Sync,
    {
        let entities = source.entities();
        let outcomes: Vec<EntityOutcome> = entities
            .par_iter()
            .map(|&entity| {
                let outcome = self.process_entity(source, entity);
                on_entity(entity);
                outcome
            })
            .collect();

        let mut report = BuildReport {
            processor: self.processor.name(),
            dataset: Dataset::new(self.schema.clone()),
            entities: entities.len(),
            ..BuildReport::default()
        };
        for outcome in outcomes {
            report.dataset.extend(outcome.rows);
            report.chunks += outcome.chunks;
            report.failures.extend(outcome.failures);
        }
        report
    }

    fn process_entity<S>(&self, source: &S, entity: &str) -> EntityOutcome
    where
        S: HistorySource + ChangeSource,
    {
        let versions = match source.list_versions(entity) {
            Ok(versions) => versions,
            Err(e) => return EntityOutcome::aborted(entity, e),
        };
        let first_fix_time = match self.resolve_first_fix_time(source, versions) {
            Ok(time) => time,
            Err(e) => return EntityOutcome::aborted(entity, e),
        };
        let chunks = match segment(entity, versions, source, first_fix_time) {
            Ok(chunks) => chunks,
            Err(e) => return EntityOutcome::aborted(entity, e),
        };

        let ctx = ProcessContext {
            history: source,
            changes: source,
        };
        let mut outcome = EntityOutcome::default();

        for chunk in chunks
            .iter()
            .filter(|chunk| chunk.is_fixed || self.include_unfixed)
        {
            let mut buffer: Vec<Row> = Vec::with_capacity(chunk.len());
            match self.processor.process_chunk(chunk, &ctx, &mut buffer) {
                Ok(()) => {
                    outcome.rows.append(&mut buffer);
                    outcome.chunks += 1;
                }
                Err(e) if e.is_chunk_local() => outcome.failures.push(EntityFailure {
                    entity: entity.to_string(),
                    chunk: Some(chunk.index),
                    error: e,
                }),
                Err(e) => return EntityOutcome::aborted(entity, e),
            }
        }

        outcome
    }

    fn resolve_first_fix_time(
        &self,
        source: &dyn HistorySource,
        versions: &[Version],
    ) -> Result<i64, FixPulseError> {
        match self.first_fix_time {
            FirstFixTime::Epoch => Ok(0),
            FirstFixTime::Repository => source.first_commit_time().ok_or_else(|| {
                FixPulseError::Extraction("repository has no commits".into())
            }),
            FirstFixTime::Entity => match versions.first() {
                Some(first) => Ok(source.commit_info(&first.commit)?.time),
                None => Ok(0),
            },
        }
    }
}
