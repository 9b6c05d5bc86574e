use async_trait::async_trait;
use domain::{Document, DocumentId, SearchRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// --- Infrastructure Interfaces (Traits) ---

/// Interface for the document store.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Inserts or replaces the document under its id. The id must already be assigned.
    /// Returns the document exactly as stored.
    async fn save(&self, document: Document) -> Result<Document, ApplicationError>;
    /// Retrieves a document by its id. A missing id is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError>;
    /// Returns every stored document the request matches, in no particular order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError>;
    /// Returns the number of stored documents.
    async fn count(&self) -> Result<usize, ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Every matching document.
    pub hits: Vec<Document>,
    /// Number of matching documents.
    pub nb_hits: usize,
    /// Time taken by the search operation in milliseconds.
    pub processing_time_ms: u128,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_documents: usize,
}

// --- Application Services (Use Cases) ---

/// Service wrapping the document store: id assignment, lookup and search.
pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    /// Upserts `document`, generating a UUID v4 id when it has none (or an empty one).
    #[instrument(skip(self, document), fields(doc_id = %document.id_label()))]
    pub async fn save(&self, mut document: Document) -> Result<Document, ApplicationError> {
        if document.assigned_id().is_none() {
            let id = DocumentId::new(Uuid::new_v4().to_string());
            debug!(new_id = %id, "Document has no id, generated one");
            document.id = Some(id);
        }

        let stored = self.repo.save(document).await?;
        info!(doc_id = %stored.id_label(), "Document saved");
        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>, ApplicationError> {
        let found = self.repo.find_by_id(&DocumentId::new(id)).await?;
        debug!(found = found.is_some(), "Looked up document");
        Ok(found)
    }

    /// Same as [`find_by_id`](Self::find_by_id) but absence is an error.
    pub async fn get_document(&self, id: &str) -> Result<Document, ApplicationError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(id.to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, ApplicationError> {
        let start_time = Instant::now();

        if request.has_inverted_range() {
            warn!(
                created_from = ?request.created_from,
                created_to = ?request.created_to,
                "createdFrom is after createdTo, no document can match"
            );
        }

        let hits = self.repo.search(&request).await?;
        let processing_time_ms = start_time.elapsed().as_millis();
        let nb_hits = hits.len();

        info!(
            unfiltered = request.is_unfiltered(),
            nb_hits,
            time_ms = processing_time_ms,
            "Search successful"
        );

        Ok(SearchResponse {
            hits,
            nb_hits,
            processing_time_ms,
        })
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<StatsResponse, ApplicationError> {
        let total_documents = self.repo.count().await?;
        Ok(StatsResponse { total_documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::Author;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal store used to exercise the service without the infrastructure crate.
    #[derive(Default)]
    struct MapRepository {
        documents: Mutex<HashMap<DocumentId, Document>>,
    }

    #[async_trait]
    impl DocumentRepository for MapRepository {
        async fn save(&self, document: Document) -> Result<Document, ApplicationError> {
            let id = document
                .id
                .clone()
                .ok_or_else(|| ApplicationError::InvalidInput("missing id".to_string()))?;
            self.documents.lock().unwrap().insert(id, document.clone());
            Ok(document)
        }

        async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
            Ok(self.documents.lock().unwrap().get(id).cloned())
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .values()
                .filter(|doc| request.matches(doc))
                .cloned()
                .collect())
        }

        async fn count(&self) -> Result<usize, ApplicationError> {
            Ok(self.documents.lock().unwrap().len())
        }
    }

    fn service() -> DocumentService {
        DocumentService::new(Arc::new(MapRepository::default()))
    }

    fn doc() -> Document {
        Document::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
            .with_title("Booking")
            .with_author(Author::new("a1", "Ann"))
    }

    #[tokio::test]
    async fn save_generates_unique_ids() {
        let service = service();
        let first = service.save(doc()).await.unwrap();
        let second = service.save(doc()).await.unwrap();

        let first_id = first.assigned_id().expect("id assigned");
        let second_id = second.assigned_id().expect("id assigned");
        assert_ne!(first_id, second_id);
        assert!(Uuid::parse_str(first_id.as_str()).is_ok());
        assert_eq!(service.stats().await.unwrap().total_documents, 2);
    }

    #[tokio::test]
    async fn save_replaces_empty_id() {
        let saved = service().save(doc().with_id("")).await.unwrap();
        assert!(saved.assigned_id().is_some());
    }

    #[tokio::test]
    async fn save_keeps_whitespace_id_and_finds_it() {
        let service = service();
        let saved = service.save(doc().with_id(" ")).await.unwrap();
        assert_eq!(saved.id_label(), " ");

        let found = service.find_by_id(" ").await.unwrap();
        assert_eq!(found, Some(doc().with_id(" ")));
    }

    #[tokio::test]
    async fn save_keeps_caller_supplied_id() {
        let service = service();
        let saved = service.save(doc().with_id("doc-7")).await.unwrap();
        assert_eq!(saved.id_label(), "doc-7");

        let found = service.find_by_id("doc-7").await.unwrap();
        assert_eq!(found, Some(doc().with_id("doc-7")));
    }

    #[tokio::test]
    async fn missing_document_is_none_or_not_found() {
        let service = service();
        assert_eq!(service.find_by_id("nope").await.unwrap(), None);
        assert!(matches!(
            service.get_document("nope").await,
            Err(ApplicationError::NotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn search_reports_hit_count() {
        let service = service();
        service.save(doc()).await.unwrap();
        service
            .save(doc().with_title("Other").with_id("other"))
            .await
            .unwrap();

        let response = service
            .search(SearchRequest::new().title_prefixes(["Book"]))
            .await
            .unwrap();
        assert_eq!(response.nb_hits, 1);
        assert_eq!(response.hits[0].title.as_deref(), Some("Booking"));

        let everything = service.search(SearchRequest::new()).await.unwrap();
        assert_eq!(everything.nb_hits, 2);
    }

    #[tokio::test]
    async fn search_response_uses_camel_case() {
        let response = service().search(SearchRequest::new()).await.unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["nbHits"], serde_json::json!(0));
        assert!(value["hits"].as_array().unwrap().is_empty());
        assert!(value.get("processingTimeMs").is_some());
    }
}
