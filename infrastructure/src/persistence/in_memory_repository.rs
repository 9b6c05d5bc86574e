// ./infrastructure/src/persistence/in_memory_repository.rs
use application::{ApplicationError, DocumentRepository};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use domain::{Document, DocumentId, SearchRequest};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// In-memory document store keyed by document id.
///
/// Search is a full scan: every stored document is evaluated against the
/// request, with no index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    // Document ID -> Document
    documents: Arc<DashMap<DocumentId, Arc<Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    /// Upsert. Replacing an existing document keeps its original `created` timestamp.
    #[instrument(skip(self, document), fields(doc_id = %document.id_label()))]
    async fn save(&self, mut document: Document) -> Result<Document, ApplicationError> {
        let id = document.assigned_id().cloned().ok_or_else(|| {
            ApplicationError::InvalidInput("Document id must be assigned before storing".to_string())
        })?;

        match self.documents.entry(id) {
            Entry::Occupied(mut entry) => {
                let original_created = entry.get().created;
                if document.created != original_created {
                    debug!(
                        original = %original_created,
                        requested = %document.created,
                        "Keeping original created timestamp on update"
                    );
                    document.created = original_created;
                }
                let stored = Arc::new(document);
                entry.insert(stored.clone());
                debug!("Replaced document in in-memory store");
                Ok((*stored).clone())
            }
            Entry::Vacant(entry) => {
                let stored = Arc::new(document);
                entry.insert(stored.clone());
                debug!("Inserted document into in-memory store");
                Ok((*stored).clone())
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
        debug!(doc_id = %id, "Getting document from in-memory store");
        let doc = self.documents.get(id).map(|doc_ref| (**doc_ref).clone());
        Ok(doc)
    }

    #[instrument(skip(self, request))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError> {
        debug!(stored = self.documents.len(), "Scanning in-memory store");

        let hits: Vec<Document> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let doc = entry.value();
                match request.evaluate(doc) {
                    Ok(true) => Some((**doc).clone()),
                    Ok(false) => {
                        trace!(doc_id = %entry.key(), "Document does not match");
                        None
                    }
                    Err(e) => {
                        // One bad document must not abort the scan
                        warn!(doc_id = %entry.key(), "Excluding document from search: {}", e);
                        None
                    }
                }
            })
            .collect();

        debug!(hits = hits.len(), "In-memory search finished");
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.documents.len())
    }
}
