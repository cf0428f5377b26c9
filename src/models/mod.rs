// src/models/mod.rs

//! Domain models for the monitor.

mod announcement;
mod config;

// Re-export all public types
pub use announcement::{AnnouncementRecord, IDENTITY_SEPARATOR, Status};
pub use config::{
    Config, ExtractionConfig, KeywordConfig, NotifierConfig, SourceConfig, StatusToken,
    StorageConfig,
};
