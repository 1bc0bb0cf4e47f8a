use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::search::{ListQuery, Page, Pagination, SortOrder};
use crate::domain::{Memory, Metadata};
use crate::error::{ApiError, ApiResult};
use crate::persistence::PersistenceLayer;

use super::learning::LearningState;
use super::search::SearchEngine;

pub const MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoryRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemoryRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateRequest {
    pub memories: Vec<CreateMemoryRequest>,
}

/// CRUD over memories. Every write drops the search cache.
#[derive(Debug)]
pub struct MemoryStore {
    persistence: Arc<dyn PersistenceLayer>,
    search: Arc<SearchEngine>,
    learning: Arc<LearningState>,
}

impl MemoryStore {
    pub fn new(
        persistence: Arc<dyn PersistenceLayer>,
        search: Arc<SearchEngine>,
        learning: Arc<LearningState>,
    ) -> Self {
        Self {
            persistence,
            search,
            learning,
        }
    }

    pub async fn create(&self, request: CreateMemoryRequest) -> ApiResult<Memory> {
        let memory = Self::build(request, None)?;
        self.persistence.save_memory(&memory).await?;
        self.search.invalidate();
        info!(name: "memory.created", memory_id = %memory.id, agent_id = ?memory.agent_id());
        Ok(memory)
    }

    /// Create several memories at once. Nothing is written unless every item is valid.
    pub async fn create_batch(&self, request: BatchCreateRequest) -> ApiResult<Vec<Memory>> {
        let items = request.memories;
        if items.is_empty() {
            return Err(ApiError::validation("memories must contain at least one item"));
        }
        if items.len() > MAX_BATCH_SIZE {
            return Err(ApiError::validation(format!(
                "a batch may contain at most {MAX_BATCH_SIZE} memories"
            )));
        }

        let memories = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Self::build(item, Some(index)))
            .collect::<ApiResult<Vec<_>>>()?;

        self.persistence.save_memories(&memories).await?;
        self.search.invalidate();
        info!(name: "memory.batch_created", count = memories.len());
        Ok(memories)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Memory> {
        self.persistence
            .get_memory(id)
            .await?
            .ok_or_else(|| ApiError::MemoryNotFound(id.to_string()))
    }

    pub async fn update(&self, id: &str, request: UpdateMemoryRequest) -> ApiResult<Memory> {
        if let Some(content) = &request.content {
            validate_content(content, None)?;
        }
        let UpdateMemoryRequest { content, metadata } = request;
        let memory = self
            .persistence
            .update_memory(id, Box::new(move |memory| memory.apply_update(content, metadata)))
            .await?
            .ok_or_else(|| ApiError::MemoryNotFound(id.to_string()))?;
        self.search.invalidate();
        info!(name: "memory.updated", memory_id = %memory.id);
        Ok(memory)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        if !self.persistence.delete_memory(id).await? {
            return Err(ApiError::MemoryNotFound(id.to_string()));
        }
        self.search.invalidate();
        self.learning.forget_memory(id);
        info!(name: "memory.deleted", memory_id = %id);
        Ok(())
    }

    pub async fn list(&self, query: ListQuery) -> ApiResult<Page<Memory>> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::validation("page must be at least 1"));
        }
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let sort = match query.sort.as_deref() {
            Some(raw) => raw.parse::<SortOrder>().map_err(ApiError::Validation)?,
            None => SortOrder::default(),
        };

        let mut memories = self.persistence.list_memories().await?;
        // Stable sort keeps insertion order for equal timestamps.
        match sort {
            SortOrder::CreatedAsc => memories.sort_by_key(|m| m.created_at),
            SortOrder::CreatedDesc => memories.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::UpdatedAsc => memories.sort_by_key(|m| m.updated_at),
            SortOrder::UpdatedDesc => memories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }

        let total = memories.len();
        let data = memories
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(Page {
            data,
            pagination: Pagination::new(total, page, limit),
        })
    }

    fn build(request: CreateMemoryRequest, index: Option<usize>) -> ApiResult<Memory> {
        validate_content(&request.content, index)?;
        Ok(Memory::new(request.content, request.metadata))
    }
}

fn validate_content(content: &str, index: Option<usize>) -> ApiResult<()> {
    if !content.trim().is_empty() {
        return Ok(());
    }
    Err(match index {
        Some(i) => ApiError::validation(format!("memories[{i}].content must not be empty")),
        None => ApiError::validation("content must not be empty"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentRecord, PredictionRecord};
    use crate::persistence::MemoryUpdate;
    use crate::persistence::providers::InMemoryProvider;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;

    /// Holds every memory update back long enough for a delete to land first.
    #[derive(Debug, Default)]
    struct DelayedUpdates {
        inner: InMemoryProvider,
    }

    #[async_trait]
    impl PersistenceLayer for DelayedUpdates {
        async fn save_memory(&self, memory: &Memory) -> anyhow::Result<()> {
            self.inner.save_memory(memory).await
        }
        async fn save_memories(&self, memories: &[Memory]) -> anyhow::Result<()> {
            self.inner.save_memories(memories).await
        }
        async fn get_memory(&self, id: &str) -> anyhow::Result<Option<Memory>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.get_memory(id).await
        }
        async fn update_memory(
            &self,
            id: &str,
            update: MemoryUpdate,
        ) -> anyhow::Result<Option<Memory>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.update_memory(id, update).await
        }
        async fn delete_memory(&self, id: &str) -> anyhow::Result<bool> {
            self.inner.delete_memory(id).await
        }
        async fn list_memories(&self) -> anyhow::Result<Vec<Memory>> {
            self.inner.list_memories().await
        }
        async fn save_agent(&self, agent: &AgentRecord) -> anyhow::Result<()> {
            self.inner.save_agent(agent).await
        }
        async fn get_agent(&self, agent_id: &str) -> anyhow::Result<Option<AgentRecord>> {
            self.inner.get_agent(agent_id).await
        }
        async fn list_agents(&self) -> anyhow::Result<Vec<AgentRecord>> {
            self.inner.list_agents().await
        }
        async fn save_prediction(&self, prediction: &PredictionRecord) -> anyhow::Result<()> {
            self.inner.save_prediction(prediction).await
        }
        async fn get_prediction(&self, id: &str) -> anyhow::Result<Option<PredictionRecord>> {
            self.inner.get_prediction(id).await
        }
    }

    fn store() -> MemoryStore {
        store_with(Arc::new(InMemoryProvider::new()))
    }

    fn store_with(persistence: Arc<dyn PersistenceLayer>) -> MemoryStore {
        let learning = Arc::new(LearningState::new());
        let search = Arc::new(SearchEngine::new(
            persistence.clone(),
            learning.clone(),
            16,
            24.0,
        ));
        MemoryStore::new(persistence, search, learning)
    }

    fn create(content: &str, metadata: Value) -> CreateMemoryRequest {
        CreateMemoryRequest {
            content: content.into(),
            metadata: match metadata {
                Value::Object(map) => map,
                _ => Metadata::new(),
            },
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store();
        let created = store
            .create(create("User prefers dark mode", json!({"category": "ui"})))
            .await
            .unwrap();
        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert!(created.id.starts_with("mem_"));
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let store = store();
        let err = store.create(create("   ", json!({}))).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = store();
        let err = store
            .create_batch(BatchCreateRequest {
                memories: vec![create("fine", json!({})), create("", json!({}))],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("memories[1]"));

        let page = store.list(ListQuery::default()).await.unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let store = store();
        let memory = store.create(create("temp", json!({}))).await.unwrap();
        store.delete(&memory.id).await.unwrap();
        let err = store.delete(&memory.id).await.unwrap_err();
        assert_eq!(err.code(), "MEMORY_NOT_FOUND");
        assert_eq!(
            store.get(&memory.id).await.unwrap_err().code(),
            "MEMORY_NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn update_racing_a_delete_does_not_resurrect() {
        let store = Arc::new(store_with(Arc::new(DelayedUpdates::default())));
        let memory = store.create(create("temp", json!({}))).await.unwrap();

        let updating = {
            let store = Arc::clone(&store);
            let id = memory.id.clone();
            tokio::spawn(async move {
                store
                    .update(
                        &id,
                        UpdateMemoryRequest {
                            content: Some("edited".into()),
                            metadata: None,
                        },
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.delete(&memory.id).await.unwrap();

        let err = updating.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "MEMORY_NOT_FOUND");
        assert_eq!(
            store.get(&memory.id).await.unwrap_err().code(),
            "MEMORY_NOT_FOUND"
        );
        assert_eq!(store.list(ListQuery::default()).await.unwrap().pagination.total, 0);
    }

    #[tokio::test]
    async fn update_merges_metadata() {
        let store = store();
        let memory = store
            .create(create("before", json!({"category": "ui"})))
            .await
            .unwrap();
        let updated = store
            .update(
                &memory.id,
                UpdateMemoryRequest {
                    content: None,
                    metadata: Some(match json!({"priority": "high"}) {
                        Value::Object(map) => map,
                        _ => Metadata::new(),
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content, "before");
        assert_eq!(updated.metadata["category"], "ui");
        assert_eq!(updated.metadata["priority"], "high");
        assert_eq!(store.get(&memory.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn list_paginates_with_ceiling_pages() {
        let store = store();
        let items = (0..5)
            .map(|i| create(&format!("memory {i}"), json!({"i": i})))
            .collect();
        store
            .create_batch(BatchCreateRequest { memories: items })
            .await
            .unwrap();

        let page = store
            .list(ListQuery {
                page: Some(3),
                limit: Some(2),
                sort: Some("createdAt".into()),
            })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].content, "memory 4");
        assert_eq!(page.pagination.total_pages, 3);

        let err = store
            .list(ListQuery {
                sort: Some("size".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
