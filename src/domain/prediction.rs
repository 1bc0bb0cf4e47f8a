use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::memory::{Memory, Metadata};
use super::search::SearchWeights;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub context: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Defaults to `true` when omitted.
    #[serde(default)]
    pub include_strategy: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub confidence: f64,
    pub reasoning: String,
}

/// Search configuration the service recommends for a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub weights: SearchWeights,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub confidence: f64,
    pub reasoning: String,
    pub suggested_memories: Vec<SuggestedMemory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_strategy: Option<SearchStrategy>,
}

/// What the service remembers about a prediction so feedback can be applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub memory_ids: Vec<String>,
    pub strategy: Option<SearchStrategy>,
    pub created_at: DateTime<Utc>,
}

pub fn new_prediction_id() -> String {
    format!("pred_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub prediction_id: String,
    pub useful: bool,
    #[serde(default)]
    pub used_memories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub prediction_id: String,
    pub useful: bool,
    pub used_memories: usize,
}

// =============================================================================
// Introspection
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPatterns {
    pub most_queried: Vec<String>,
    pub optimal_weights: SearchWeights,
    /// Milliseconds.
    pub avg_retrieval_time: f64,
    pub total_queries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub cache_hit_rate: f64,
    pub avg_results_per_query: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patterns {
    pub query_patterns: QueryPatterns,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningProgress {
    pub total_observations: u64,
    pub patterns_detected: usize,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationGains {
    pub speed_improvement: String,
    pub accuracy_improvement: String,
    pub cache_efficiency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub learning_progress: LearningProgress,
    pub optimization_gains: OptimizationGains,
}
