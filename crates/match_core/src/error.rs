//! Error types for the fallible edges of the engine.
//!
//! Matching itself is fail-soft and never returns these: only catalog loading,
//! configuration and the persistence side channel can fail.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [EngineError].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for engine setup.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Zone catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors raised while building a [crate::zones::ZoneRegistry].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("zone at index {index} has an empty id")]
    EmptyId { index: usize },

    #[error("duplicate zone id: {0}")]
    DuplicateId(String),

    #[error("zone {zone_id} has invalid center ({lat}, {lng})")]
    InvalidCenter { zone_id: String, lat: f64, lng: f64 },

    #[error("zone {zone_id} has invalid radius {radius_km} km")]
    InvalidRadius { zone_id: String, radius_km: f64 },

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating [crate::config::EngineConfig].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Errors from a [crate::persistence::PersistenceChannel].
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}
