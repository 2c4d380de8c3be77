use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FixPulseError;
use crate::types::{DatasetFormat, FirstFixTime};

/// Top-level configuration loaded from `.fixpulse.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use fixpulse_core::FixPulseConfig;
///
/// let config = FixPulseConfig::default();
/// assert_eq!(config.mining.extensions, vec!["java".to_string()]);
/// assert!(config.dataset.include_unfixed);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixPulseConfig {
    /// History walk settings.
    #[serde(default)]
    pub mining: MiningConfig,
    /// Bug-fix classification settings.
    #[serde(default)]
    pub fixes: FixConfig,
    /// Dataset output settings.
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl FixPulseConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::FileNotFound`] if `path` does not exist,
    /// [`FixPulseError::Io`] if it cannot be read, or
    /// [`FixPulseError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fixpulse_core::FixPulseConfig;
    /// use std::path::Path;
    ///
    /// let config = FixPulseConfig::from_file(Path::new(".fixpulse.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, FixPulseError> {
        if !path.exists() {
            return Err(FixPulseError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FixPulseError::Toml`] if parsing fails, or
    /// [`FixPulseError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixpulse_core::{DatasetFormat, FixPulseConfig};
    ///
    /// let toml = r#"
    /// [dataset]
    /// format = "csv"
    /// "#;
    /// let config = FixPulseConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.dataset.format, DatasetFormat::Csv);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, FixPulseError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FixPulseError> {
        if self.mining.max_files_per_commit == 0 {
            return Err(FixPulseError::Config(
                "mining.max_files_per_commit must be at least 1".into(),
            ));
        }
        if self.fixes.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(FixPulseError::Config(
                "fixes.keywords must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

/// History walk configuration.
///
/// # Examples
///
/// ```
/// use fixpulse_core::MiningConfig;
///
/// let config = MiningConfig::default();
/// assert_eq!(config.max_files_per_commit, 200);
/// assert!(config.branch.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// File extensions tracked as entities, without the dot (default: `["java"]`).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Skip bulk commits touching more tracked files than this (default: 200).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
}

fn default_extensions() -> Vec<String> {
    vec!["java".into()]
}

fn default_max_files_per_commit() -> usize {
    200
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            branch: None,
            extensions: default_extensions(),
            max_files_per_commit: default_max_files_per_commit(),
        }
    }
}

/// Bug-fix classification configuration.
///
/// # Examples
///
/// ```
/// use fixpulse_core::FixConfig;
///
/// let config = FixConfig::default();
/// assert!(config.keywords.iter().any(|k| k == "bug"));
/// assert!(config.ignore_merges);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixConfig {
    /// Whole-word, case-insensitive message tokens that mark a fix.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Never classify merge commits as fixes (default: true).
    #[serde(default = "default_true")]
    pub ignore_merges: bool,
}

fn default_keywords() -> Vec<String> {
    [
        "fix", "fixes", "fixed", "bug", "bugfix", "defect", "fault", "issue",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            ignore_merges: true,
        }
    }
}

/// Dataset output configuration.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{DatasetConfig, DatasetFormat, FirstFixTime};
///
/// let config = DatasetConfig::default();
/// assert_eq!(config.format, DatasetFormat::Arff);
/// assert_eq!(config.first_fix_time, FirstFixTime::Repository);
/// assert_eq!(config.relation, "fixpulse");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Output format (default: `arff`).
    #[serde(default)]
    pub format: DatasetFormat,
    /// Reference time for an entity's first chunk (default: `repository`).
    #[serde(default)]
    pub first_fix_time: FirstFixTime,
    /// Emit rows for chunks not terminated by a fix (default: true).
    #[serde(default = "default_true")]
    pub include_unfixed: bool,
    /// ARFF relation name (default: `"fixpulse"`).
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "fixpulse".into()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            format: DatasetFormat::default(),
            first_fix_time: FirstFixTime::default(),
            include_unfixed: true,
            relation: default_relation(),
        }
    }
}
