//! Keyword-based bug-fix commit classification.

use std::collections::HashSet;

use fixpulse_core::FixConfig;

use crate::mining::CommitRecord;

/// Classifies commits as bug fixes by whole-word keyword match on the message.
///
/// # Examples
///
/// ```
/// use fixpulse_core::FixConfig;
/// use fixpulse_mining::fixes::FixClassifier;
///
/// let classifier = FixClassifier::new(&FixConfig::default());
/// assert!(classifier.is_fix_message("Fix NPE in parser"));
/// assert!(classifier.is_fix_message("parser: handle empty input (bug #42)"));
/// assert!(!classifier.is_fix_message("Add prefix option"));
/// ```
#[derive(Debug, Clone)]
pub struct FixClassifier {
    keywords: HashSet<String>,
    ignore_merges: bool,
}

impl FixClassifier {
    /// Build a classifier from configuration.
    pub fn new(config: &FixConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .collect(),
            ignore_merges: config.ignore_merges,
        }
    }

    /// Whether `message` contains any keyword as a whole word.
    pub fn is_fix_message(&self, message: &str) -> bool {
        message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| self.keywords.contains(&word.to_lowercase()))
    }

    /// Whether `commit` is a bug fix.
    pub fn is_fix(&self, commit: &CommitRecord) -> bool {
        if commit.is_merge && self.ignore_merges {
            return false;
        }
        self.is_fix_message(&commit.message)
    }
}
