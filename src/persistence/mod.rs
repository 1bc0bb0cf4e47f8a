use crate::domain::{AgentRecord, Memory, PredictionRecord};
use anyhow::Result;
use async_trait::async_trait;

pub mod providers;

/// In-place edit applied to a stored memory.
pub type MemoryUpdate = Box<dyn FnOnce(&mut Memory) + Send>;

#[async_trait]
pub trait PersistenceLayer: Send + Sync + std::fmt::Debug {
    // =========================================================================
    // Memories
    // =========================================================================

    /// Insert or replace a memory.
    async fn save_memory(&self, memory: &Memory) -> Result<()>;

    /// Insert a group of memories under a single write lock.
    async fn save_memories(&self, memories: &[Memory]) -> Result<()>;

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>>;

    /// Apply `update` to a stored memory atomically with respect to other
    /// writers. Returns the updated memory, or `None` when it does not exist.
    async fn update_memory(&self, id: &str, update: MemoryUpdate) -> Result<Option<Memory>>;

    /// Remove a memory. Returns `false` when it did not exist.
    async fn delete_memory(&self, id: &str) -> Result<bool>;

    /// All memories in insertion order.
    async fn list_memories(&self) -> Result<Vec<Memory>>;

    // =========================================================================
    // Agents
    // =========================================================================

    async fn save_agent(&self, agent: &AgentRecord) -> Result<()>;
    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>>;
    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;

    // =========================================================================
    // Predictions
    // =========================================================================

    async fn save_prediction(&self, prediction: &PredictionRecord) -> Result<()>;
    async fn get_prediction(&self, id: &str) -> Result<Option<PredictionRecord>>;
}
