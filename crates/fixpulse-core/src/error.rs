use std::path::PathBuf;

/// Errors that can occur while mining history and building datasets.
///
/// Library crates use this type directly; the binary converts to a
/// `miette` report at the boundary.
///
/// # Examples
///
/// ```
/// use fixpulse_core::FixPulseError;
///
/// let err = FixPulseError::Extraction("no commit info for abc123".into());
/// assert!(err.to_string().contains("abc123"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum FixPulseError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(fixpulse::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(fixpulse::config))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(code(fixpulse::git))]
    Git(String),

    /// A history collaborator could not supply required data
    /// (missing commit info, unknown author, malformed history).
    #[error("extraction failure: {0}")]
    #[diagnostic(code(fixpulse::extraction))]
    Extraction(String),

    /// A normally impossible arithmetic condition hit while aggregating a chunk.
    #[error("computation invariant violated in {entity} (chunk {chunk}): {reason}")]
    #[diagnostic(
        code(fixpulse::computation),
        help("the change source reported zero changes where at least one is required")
    )]
    Computation {
        /// Entity whose chunk failed.
        entity: String,
        /// Zero-based chunk index within the entity.
        chunk: usize,
        /// What went wrong.
        reason: String,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(fixpulse::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(fixpulse::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(fixpulse::not_found))]
    FileNotFound(PathBuf),
}

impl FixPulseError {
    /// Whether this error only invalidates a single chunk rather than
    /// the whole entity.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixpulse_core::FixPulseError;
    ///
    /// let err = FixPulseError::Computation {
    ///     entity: "src/Foo.java".into(),
    ///     chunk: 0,
    ///     reason: "zero total".into(),
    /// };
    /// assert!(err.is_chunk_local());
    /// assert!(!FixPulseError::Extraction("x".into()).is_chunk_local());
    /// ```
    pub fn is_chunk_local(&self) -> bool {
        matches!(self, FixPulseError::Computation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FixPulseError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = FixPulseError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn computation_error_names_entity_and_chunk() {
        let err = FixPulseError::Computation {
            entity: "src/Foo.java".into(),
            chunk: 2,
            reason: "chunk change total is zero".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/Foo.java"));
        assert!(msg.contains("chunk 2"));
        assert!(msg.contains("zero"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = FixPulseError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
