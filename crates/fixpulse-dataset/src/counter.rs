//! Running tallies of structural changes.

use fixpulse_core::{ChangeSource, ChangeTally, FixPulseError, Version};

/// Accumulates change tallies, grouped by change kind.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{ChangeKind, ChangeTally};
/// use fixpulse_dataset::counter::ChangeCounter;
///
/// let mut tally = ChangeTally::new();
/// tally.record(ChangeKind::Update, 2);
///
/// let mut a = ChangeCounter::from_tally(tally);
/// let b = ChangeCounter::from_tally(ChangeTally::new());
/// a.add(&b);
/// assert_eq!(a.total_sum(), 2);
/// assert_eq!(a.reset().total_sum(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeCounter {
    tally: ChangeTally,
}

impl ChangeCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter seeded with `tally`.
    pub fn from_tally(tally: ChangeTally) -> Self {
        Self { tally }
    }

    /// Clear all tallies to zero.
    pub fn reset(&mut self) -> &mut Self {
        self.tally.clear();
        self
    }

    /// Add the changes `version` introduced, as reported by `source`.
    ///
    /// A version with no changes is valid and leaves the counter unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the source's error when the diff is unavailable.
    pub fn count_changes(
        &mut self,
        source: &dyn ChangeSource,
        version: &Version,
    ) -> Result<&mut Self, FixPulseError> {
        let tally = source.diff_changes(version)?;
        self.tally.merge(&tally);
        Ok(self)
    }

    /// Merge another counter's tallies into this one, element-wise.
    pub fn add(&mut self, other: &ChangeCounter) -> &mut Self {
        self.tally.merge(&other.tally);
        self
    }

    /// Sum of all kind counts.
    pub fn total_sum(&self) -> u64 {
        self.tally.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixpulse_core::ChangeKind;

    struct FixedSource(ChangeTally);

    impl ChangeSource for FixedSource {
        fn diff_changes(&self, _version: &Version) -> Result<ChangeTally, FixPulseError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl ChangeSource for BrokenSource {
        fn diff_changes(&self, version: &Version) -> Result<ChangeTally, FixPulseError> {
            Err(FixPulseError::Extraction(format!("no diff for {}", version.commit)))
        }
    }

    fn version() -> Version {
        Version {
            entity: "A.java".into(),
            commit: "c1".into(),
            ordinal: 0,
        }
    }

    #[test]
    fn count_changes_accumulates_by_kind() {
        let mut tally = ChangeTally::new();
        tally.record(ChangeKind::Insert, 2);
        tally.record(ChangeKind::Delete, 1);
        let source = FixedSource(tally);

        let mut counter = ChangeCounter::new();
        counter.count_changes(&source, &version()).unwrap();
        counter.count_changes(&source, &version()).unwrap();

        assert_eq!(counter.tally.count(ChangeKind::Insert), 4);
        assert_eq!(counter.tally.count(ChangeKind::Delete), 2);
        assert_eq!(counter.total_sum(), 6);
    }

    #[test]
    fn zero_change_version_is_valid() {
        let source = FixedSource(ChangeTally::new());
        let mut counter = ChangeCounter::new();
        counter.count_changes(&source, &version()).unwrap();
        assert_eq!(counter.total_sum(), 0);
    }

    #[test]
    fn reset_then_count_only_sees_latest_version() {
        let mut tally = ChangeTally::new();
        tally.record(ChangeKind::Move, 1);
        let source = FixedSource(tally);

        let mut counter = ChangeCounter::new();
        counter.count_changes(&source, &version()).unwrap();
        let total = counter
            .reset()
            .count_changes(&source, &version())
            .unwrap()
            .total_sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn add_merges_elementwise() {
        let mut left = ChangeTally::new();
        left.record(ChangeKind::Update, 3);
        let mut right = ChangeTally::new();
        right.record(ChangeKind::Update, 1);
        right.record(ChangeKind::Insert, 5);

        let mut counter = ChangeCounter::from_tally(left);
        counter.add(&ChangeCounter::from_tally(right));
        assert_eq!(counter.tally.count(ChangeKind::Update), 4);
        assert_eq!(counter.tally.count(ChangeKind::Insert), 5);
    }

    #[test]
    fn source_errors_propagate() {
        let mut counter = ChangeCounter::new();
        let err = counter.count_changes(&BrokenSource, &version()).unwrap_err();
        assert!(matches!(err, FixPulseError::Extraction(_)));
    }
}
