//! Process-local persistence. Everything is lost on restart.

use std::collections::{HashMap, VecDeque};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AgentRecord, Memory, PredictionRecord};
use crate::persistence::{MemoryUpdate, PersistenceLayer};

/// Feedback can only target the most recent predictions.
const MAX_PREDICTIONS: usize = 10_000;

#[derive(Debug, Default)]
struct Memories {
    order: Vec<String>,
    by_id: HashMap<String, Memory>,
}

#[derive(Debug, Default)]
struct Predictions {
    order: VecDeque<String>,
    by_id: HashMap<String, PredictionRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    memories: RwLock<Memories>,
    agents: RwLock<HashMap<String, AgentRecord>>,
    predictions: RwLock<Predictions>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Memories {
    fn upsert(&mut self, memory: &Memory) {
        if self
            .by_id
            .insert(memory.id.clone(), memory.clone())
            .is_none()
        {
            self.order.push(memory.id.clone());
        }
    }
}

#[async_trait]
impl PersistenceLayer for InMemoryProvider {
    async fn save_memory(&self, memory: &Memory) -> Result<()> {
        self.memories.write().await.upsert(memory);
        Ok(())
    }

    async fn save_memories(&self, memories: &[Memory]) -> Result<()> {
        let mut guard = self.memories.write().await;
        for memory in memories {
            guard.upsert(memory);
        }
        Ok(())
    }

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>> {
        Ok(self.memories.read().await.by_id.get(id).cloned())
    }

    async fn update_memory(&self, id: &str, update: MemoryUpdate) -> Result<Option<Memory>> {
        let mut guard = self.memories.write().await;
        let Some(memory) = guard.by_id.get_mut(id) else {
            return Ok(None);
        };
        update(memory);
        Ok(Some(memory.clone()))
    }

    async fn delete_memory(&self, id: &str) -> Result<bool> {
        let mut guard = self.memories.write().await;
        if guard.by_id.remove(id).is_none() {
            return Ok(false);
        }
        guard.order.retain(|existing| existing != id);
        Ok(true)
    }

    async fn list_memories(&self) -> Result<Vec<Memory>> {
        let guard = self.memories.read().await;
        Ok(guard
            .order
            .iter()
            .filter_map(|id| guard.by_id.get(id).cloned())
            .collect())
    }

    async fn save_agent(&self, agent: &AgentRecord) -> Result<()> {
        self.agents
            .write()
            .await
            .insert(agent.agent_id.clone(), agent.clone());
        Ok(())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        Ok(self.agents.read().await.get(agent_id).cloned())
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut agents: Vec<AgentRecord> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(agents)
    }

    async fn save_prediction(&self, prediction: &PredictionRecord) -> Result<()> {
        let mut guard = self.predictions.write().await;
        if guard
            .by_id
            .insert(prediction.id.clone(), prediction.clone())
            .is_none()
        {
            guard.order.push_back(prediction.id.clone());
        }
        while guard.order.len() > MAX_PREDICTIONS {
            if let Some(oldest) = guard.order.pop_front() {
                guard.by_id.remove(&oldest);
            }
        }
        Ok(())
    }

    async fn get_prediction(&self, id: &str) -> Result<Option<PredictionRecord>> {
        Ok(self.predictions.read().await.by_id.get(id).cloned())
    }
}
