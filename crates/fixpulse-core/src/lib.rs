//! Core types, configuration, and error handling for fixpulse.
//!
//! This crate provides the shared foundation used by the other fixpulse crates:
//! - [`FixPulseError`]: unified error type using `thiserror`
//! - [`FixPulseConfig`]: configuration loaded from `.fixpulse.toml`
//! - History data model: [`Version`], [`CommitInfo`], [`AuthorInfo`], [`ChangeTally`]
//! - Collaborator traits: [`HistorySource`], [`ChangeSource`]

mod config;
mod error;
mod source;
mod types;

pub use config::{DatasetConfig, FixConfig, FixPulseConfig, MiningConfig};
pub use error::FixPulseError;
pub use source::{ChangeSource, HistorySource};
pub use types::{
    AuthorInfo, ChangeKind, ChangeTally, CommitInfo, DatasetFormat, FirstFixTime, Version,
};

/// A convenience `Result` type for fixpulse operations.
pub type Result<T> = std::result::Result<T, FixPulseError>;
