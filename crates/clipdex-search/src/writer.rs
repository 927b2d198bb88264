//! Document writes.
//!
//! Every write forces an immediate refresh so the change is visible to the
//! next read. Failures are classified for the caller:
//!
//! - transport failures surface as `EngineUnavailable`
//! - a missing document on update surfaces as `NotFound`
//! - anything else is wrapped as `Write` with the engine error as source

use std::sync::Arc;

use chrono::Utc;
use clipdex_core::{Error, Result};

use crate::document::{ClipDocument, PartialClipDocument};
use crate::engine::{Refresh, SearchEngine};

/// Indexes, fetches and updates documents by id.
#[derive(Clone)]
pub struct DocumentWriter {
    engine: Arc<dyn SearchEngine>,
    index: String,
}

impl DocumentWriter {
    /// Write to `index` on `engine`.
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
        }
    }

    /// Index a new document under its id.
    ///
    /// An existing document with the same id is replaced.
    pub async fn create(&self, doc: &ClipDocument) -> Result<()> {
        doc.validate()?;
        let source = doc.to_source()?;
        self.engine
            .index_document(&self.index, &doc.id, &source, Refresh::Immediate)
            .await
            .map_err(|e| classify(&doc.id, "create", e))?;
        log::debug!("Indexed document {}", doc.id);
        Ok(())
    }

    /// Fetch a document by id.
    pub async fn get(&self, id: &str) -> Result<ClipDocument> {
        match self.engine.get_document(&self.index, id).await? {
            Some(source) => ClipDocument::from_source(source),
            None => Err(Error::not_found(id)),
        }
    }

    /// Merge the supplied fields into a stored document.
    ///
    /// `updated_at` is stamped with the current time unless provided.
    pub async fn update(&self, id: &str, partial: &PartialClipDocument) -> Result<()> {
        partial.validate()?;
        let mut partial = partial.clone();
        if partial.updated_at.is_none() {
            partial.updated_at = Some(Utc::now());
        }
        let fields = partial.to_fields()?;
        self.engine
            .update_document(&self.index, id, &fields, Refresh::Immediate)
            .await
            .map_err(|e| classify(id, "update", e))?;
        log::debug!("Updated document {id}");
        Ok(())
    }
}

fn classify(id: &str, operation: &str, err: Error) -> Error {
    match err {
        Error::EngineUnavailable { .. } | Error::NotFound { .. } => err,
        other => {
            log::warn!("Failed to {operation} document {id}: {other}");
            Error::write_with_source(id, other)
        }
    }
}

impl std::fmt::Debug for DocumentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentWriter")
            .field("engine", &self.engine.name())
            .field("index", &self.index)
            .finish()
    }
}
