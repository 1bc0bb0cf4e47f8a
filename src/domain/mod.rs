//! Data model shared by the persistence layer, the engine and the HTTP API.

pub mod agent;
pub mod memory;
pub mod prediction;
pub mod search;

pub use agent::{Agent, AgentRecord, ReputationTier};
pub use memory::{Memory, Metadata};
pub use prediction::{Prediction, PredictionRecord};
pub use search::{SearchResult, SearchWeights};
