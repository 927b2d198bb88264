//! Index provisioning.
//!
//! `IndexManager` makes sure the clip index exists with the mapping from
//! [`ClipSchema`]. It is called on every process start and is idempotent.

use std::fmt;
use std::sync::Arc;

use clipdex_core::Result;

use crate::engine::SearchEngine;
use crate::schema::{ClipSchema, SCHEMA_VERSION};

/// Outcome of provisioning the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index was absent and has been created.
    Created,
    /// The index was already present; its mapping was left untouched.
    AlreadyExists,
    /// Provisioning failed; the service runs without a guaranteed index.
    Degraded(String),
}

impl IndexStatus {
    /// Returns `true` unless provisioning failed.
    pub fn is_ok(&self) -> bool {
        !matches!(self, IndexStatus::Degraded(_))
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStatus::Created => write!(f, "created"),
            IndexStatus::AlreadyExists => write!(f, "already exists"),
            IndexStatus::Degraded(reason) => write!(f, "degraded: {reason}"),
        }
    }
}

/// Creates the clip index on demand.
#[derive(Clone)]
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    index: String,
    schema: ClipSchema,
}

impl IndexManager {
    /// Manage `index` on `engine`.
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
            schema: ClipSchema,
        }
    }

    /// Name of the managed index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Create the index if it is missing, surfacing any failure.
    ///
    /// A concurrent creator winning the race is reported as `AlreadyExists`.
    pub async fn try_ensure_index(&self) -> Result<IndexStatus> {
        if self.engine.index_exists(&self.index).await? {
            log::debug!("Index '{}' already exists", self.index);
            return Ok(IndexStatus::AlreadyExists);
        }

        let created = self
            .engine
            .create_index(&self.index, &self.schema.index_body())
            .await?;

        if created {
            log::info!(
                "Created index '{}' (schema version {SCHEMA_VERSION})",
                self.index
            );
            Ok(IndexStatus::Created)
        } else {
            log::debug!("Index '{}' was created concurrently", self.index);
            Ok(IndexStatus::AlreadyExists)
        }
    }

    /// Create the index if it is missing.
    ///
    /// Never fails: errors are logged and reported as
    /// [`IndexStatus::Degraded`] so startup can continue without the engine.
    pub async fn ensure_index(&self) -> IndexStatus {
        match self.try_ensure_index().await {
            Ok(status) => status,
            Err(e) => {
                log::warn!(
                    "Could not provision index '{}', continuing degraded: {e}",
                    self.index
                );
                IndexStatus::Degraded(e.to_string())
            }
        }
    }
}

impl fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexManager")
            .field("engine", &self.engine.name())
            .field("index", &self.index)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
