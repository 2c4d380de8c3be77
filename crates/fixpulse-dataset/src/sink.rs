//! Receivers of emitted feature vectors.

use fixpulse_core::FixPulseError;
use serde::{Deserialize, Serialize};

use crate::schema::{FeatureVector, Label, Schema};

/// Receives feature vectors, one per chunk prefix, in emission order.
pub trait DatasetSink {
    /// Accept one row.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Computation`] if the vector carries a NaN or
    /// infinite value.
    fn emit(&mut self, vector: FeatureVector, label: Label) -> Result<(), FixPulseError>;
}

/// A labeled feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Attribute values.
    pub vector: FeatureVector,
    /// Class label.
    pub label: Label,
}

fn checked_row(vector: FeatureVector, label: Label) -> Result<Row, FixPulseError> {
    if let Some(name) = vector.first_non_finite() {
        return Err(FixPulseError::Computation {
            entity: vector.entity.clone(),
            chunk: vector.chunk,
            reason: format!("attribute {name} is not a finite number"),
        });
    }
    Ok(Row { vector, label })
}

/// Row buffer used by workers before results are merged.
impl DatasetSink for Vec<Row> {
    fn emit(&mut self, vector: FeatureVector, label: Label) -> Result<(), FixPulseError> {
        self.push(checked_row(vector, label)?);
        Ok(())
    }
}

/// In-memory dataset: a schema plus its rows.
///
/// # Examples
///
/// ```
/// use fixpulse_dataset::schema::{FeatureVector, Label, Schema};
/// use fixpulse_dataset::sink::{Dataset, DatasetSink};
///
/// let mut schema = Schema::new();
/// schema.add_numeric("numCommits");
/// let mut dataset = Dataset::new(schema);
///
/// let mut v = FeatureVector::new("A.java", 0);
/// v.set("numCommits", 1.0);
/// dataset.emit(v, Label::Fixed).unwrap();
///
/// assert_eq!(dataset.len(), 1);
/// assert_eq!(dataset.count_label(Label::Fixed), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset for `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Column definitions.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows in emission order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when no row has been emitted.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying `label`.
    pub fn count_label(&self, label: Label) -> usize {
        self.rows.iter().filter(|r| r.label == label).count()
    }

    /// Append already-validated rows, e.g. a worker's buffer.
    pub fn extend(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
    }
}

impl DatasetSink for Dataset {
    fn emit(&mut self, vector: FeatureVector, label: Label) -> Result<(), FixPulseError> {
        self.rows.push(checked_row(vector, label)?);
        Ok(())
    }
}
