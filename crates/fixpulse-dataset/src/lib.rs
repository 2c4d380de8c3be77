//! Fix-cycle feature datasets.
//!
//! Splits each entity's version history into chunks delimited by bug-fix
//! commits and turns every chunk into labeled feature vectors:
//! - [`counter::ChangeCounter`]: running per-kind change tallies
//! - [`segment::segment`]: fix-delimited chunking
//! - [`group::GroupAggregator`]: one row per chunk prefix
//! - [`builder::DatasetBuilder`]: parallel corpus build with failure collection
//! - [`output`]: ARFF, CSV and JSON-lines rendering

pub mod builder;
pub mod counter;
pub mod group;
pub mod output;
pub mod processor;
pub mod schema;
pub mod segment;
pub mod sink;
