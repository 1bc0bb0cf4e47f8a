//! Memory service logic: storage, search, predictions and collaboration.
//!
//! The HTTP layer only talks to [`Engine`]; each service shares the same
//! persistence backend and learning state.

pub mod collaboration;
pub mod learning;
pub mod metacognition;
pub mod scoring;
pub mod search;
pub mod store;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::persistence::PersistenceLayer;

pub use collaboration::CollaborationService;
pub use learning::LearningState;
pub use metacognition::MetacognitionService;
pub use search::SearchEngine;
pub use store::MemoryStore;

#[derive(Debug)]
pub struct Engine {
    pub memories: MemoryStore,
    pub search: Arc<SearchEngine>,
    pub metacognition: MetacognitionService,
    pub collaboration: CollaborationService,
}

impl Engine {
    pub fn new(persistence: Arc<dyn PersistenceLayer>, config: &EngineConfig) -> Self {
        let learning = Arc::new(LearningState::new());
        let search = Arc::new(SearchEngine::new(
            persistence.clone(),
            learning.clone(),
            config.search_cache_capacity,
            config.recency_half_life_hours,
        ));
        Self {
            memories: MemoryStore::new(persistence.clone(), search.clone(), learning.clone()),
            metacognition: MetacognitionService::new(
                persistence.clone(),
                learning.clone(),
                config.recency_half_life_hours,
            ),
            collaboration: CollaborationService::new(
                persistence,
                learning,
                config.initial_reputation,
            ),
            search,
        }
    }
}
