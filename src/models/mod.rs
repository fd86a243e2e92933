// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod credentials;
mod fragment;
mod job;
mod record;

// Re-export all public types
pub use config::{
    Config, ExtractionConfig, LoggingConfig, PathsConfig, ScrollConfig, SiteConfig, SurfaceConfig,
};
pub use credentials::Credentials;
pub use fragment::{RawFragment, ScrollPosition};
pub use job::{Job, JobState};
pub use record::TypedRecord;
