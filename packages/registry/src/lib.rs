#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Carpark registry.
//!
//! The registry is the static list of carparks the ranking pipeline
//! chooses from. It is loaded from a JSON snapshot (an array of
//! [`CarparkRecord`]) and handed out as an immutable shared slice, so a
//! ranking request always works against one consistent view.
//!
//! Snapshots are produced by [`hdb::sync_snapshot`], which downloads the
//! HDB carpark information dataset from data.gov.sg.

pub mod hdb;
mod retry;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use spot_on_carpark_models::CarparkRecord;
use thiserror::Error;

/// Default location of the registry snapshot.
pub const DEFAULT_REGISTRY_PATH: &str = "data/carparks.json";

/// Errors from loading or syncing the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading or writing the snapshot failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not valid JSON for a list of carparks.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream dataset could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Source of the carpark registry.
#[async_trait]
pub trait CarparkRegistry: Send + Sync {
    /// Returns every registered carpark.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry cannot be read.
    async fn fetch_all(&self) -> Result<Arc<[CarparkRecord]>, RegistryError>;
}

/// A registry held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRegistry {
    records: Arc<[CarparkRecord]>,
}

impl InMemoryRegistry {
    /// Creates a registry over `records`.
    #[must_use]
    pub fn new(records: Vec<CarparkRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Loads a registry from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the file cannot be read or parsed.
    pub async fn load_json(path: &Path) -> Result<Self, RegistryError> {
        let bytes = tokio::fs::read(path).await?;
        let records: Vec<CarparkRecord> = serde_json::from_slice(&bytes)?;
        log::info!(
            "Loaded {} carparks from {}",
            records.len(),
            path.display()
        );
        Ok(Self::new(records))
    }

    /// Number of carparks in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry has no carparks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CarparkRegistry for InMemoryRegistry {
    async fn fetch_all(&self) -> Result<Arc<[CarparkRecord]>, RegistryError> {
        Ok(Arc::clone(&self.records))
    }
}

/// Writes `records` as a pretty-printed JSON snapshot, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`RegistryError`] if serialization or the write fails.
pub async fn write_json(path: &Path, records: &[CarparkRecord]) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
