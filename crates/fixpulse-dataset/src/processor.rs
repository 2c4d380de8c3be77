//! Pluggable per-chunk processing.
//!
//! A [`ChunkProcessor`] contributes its attributes to the dataset schema and
//! turns each chunk into rows. The [`crate::builder::DatasetBuilder`] owns
//! segmentation and failure handling, so processors only see one chunk at a
//! time and carry no state between chunks.

use fixpulse_core::{ChangeSource, FixPulseError, HistorySource};

use crate::schema::Schema;
use crate::segment::Chunk;
use crate::sink::DatasetSink;

/// Read-only collaborators available while processing a chunk.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Commit/author lookups.
    pub history: &'a dyn HistorySource,
    /// Per-version change tallies.
    pub changes: &'a dyn ChangeSource,
}

/// A per-chunk feature extraction strategy.
pub trait ChunkProcessor: Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Register this processor's feature attributes.
    fn register_attributes(&self, schema: &mut Schema);

    /// Emit rows for `chunk` into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Extraction`] when a collaborator lookup fails
    /// and [`FixPulseError::Computation`] when an arithmetic invariant does
    /// not hold.
    fn process_chunk(
        &self,
        chunk: &Chunk,
        ctx: &ProcessContext<'_>,
        sink: &mut dyn DatasetSink,
    ) -> Result<(), FixPulseError>;
}
