//! Shared types for the SDK.
//!
//! These mirror the service's JSON contract. Metadata stays a
//! [`serde_json::Value`] so callers can attach anything; timestamps are kept
//! as the RFC 3339 strings the service sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Memories
// =============================================================================

/// A stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl Memory {
    /// Metadata value for `key`, if the metadata is an object holding it.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Metadata string value for `key`.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta(key).and_then(Value::as_str)
    }
}

/// One item of a create or batch-create call.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMemory {
    pub content: String,
    pub metadata: Value,
}

impl CreateMemory {
    pub fn new(content: impl Into<String>, metadata: Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BatchCreate {
    pub memories: Vec<CreateMemory>,
}

/// Partial update. Omitted fields are left as they are; metadata keys are
/// merged into the existing object and a `null` value removes a key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateMemory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl UpdateMemory {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Sort key for listing (`-` prefix means descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    CreatedAsc,
    #[default]
    CreatedDesc,
    UpdatedAsc,
    UpdatedDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAsc => "createdAt",
            Self::CreatedDesc => "-createdAt",
            Self::UpdatedAsc => "updatedAt",
            Self::UpdatedDesc => "-updatedAt",
        }
    }
}

/// Paging options for [`list`](crate::client::MemoriesApi::list).
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<SortOrder>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(sort) = self.sort {
            query.push(("sort", sort.as_str().to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPage {
    pub data: Vec<Memory>,
    pub pagination: Pagination,
}

// =============================================================================
// Search
// =============================================================================

/// Relative weight of semantic similarity and recency. The service
/// normalises the pair to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
    pub semantic: f64,
    pub recency: f64,
}

impl SearchWeights {
    pub fn new(semantic: f64, recency: f64) -> Self {
        Self { semantic, recency }
    }
}

/// Optional search parameters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<SearchWeights>,
    /// Exact-match filter on metadata keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn weights(mut self, semantic: f64, recency: f64) -> Self {
        self.weights = Some(SearchWeights::new(semantic, recency));
        self
    }

    pub fn metadata(mut self, filter: Value) -> Self {
        self.metadata = Some(filter);
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchBody {
    pub query: String,
    #[serde(flatten)]
    pub options: SearchOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub memory: Memory,
    pub score: f64,
    pub semantic_score: f64,
    pub recency_score: f64,
}

// =============================================================================
// Metacognition
// =============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct PredictOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_strategy: Option<bool>,
}

impl PredictOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    pub fn include_strategy(mut self, include: bool) -> Self {
        self.include_strategy = Some(include);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PredictBody {
    pub context: String,
    #[serde(flatten)]
    pub options: PredictOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub confidence: f64,
    pub reasoning: String,
}

/// Search parameters the service recommends for a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub weights: SearchWeights,
    pub limit: usize,
    #[serde(default)]
    pub filters: Option<Value>,
}

impl SearchStrategy {
    /// Turn the strategy into options for a follow-up search.
    pub fn to_search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: Some(self.limit),
            weights: Some(self.weights),
            metadata: self.filters.clone(),
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub confidence: f64,
    pub reasoning: String,
    pub suggested_memories: Vec<SuggestedMemory>,
    #[serde(default)]
    pub suggested_strategy: Option<SearchStrategy>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackBody {
    pub prediction_id: String,
    pub useful: bool,
    pub used_memories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub prediction_id: String,
    pub useful: bool,
    pub used_memories: usize,
}

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

// =============================================================================
// Collaboration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub role: String,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
    pub reputation_score: f64,
    /// `novice`, `contributor`, `trusted` or `expert`.
    pub tier: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgent {
    pub agent_id: String,
    pub role: String,
    pub capabilities: Vec<String>,
    pub metadata: Value,
}

impl RegisterAgent {
    pub fn new(agent_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            role: role.into(),
            capabilities: Vec::new(),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateAgent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    pub agent_id: String,
    pub reputation_score: f64,
    pub tier: String,
    pub total_contributions: usize,
    pub average_confidence: f64,
}

/// One agent's input to a synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContribution {
    pub agent_id: String,
    pub memories: Vec<String>,
    /// Overrides the agent's computed reputation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<f64>,
}

impl AgentContribution {
    pub fn new(agent_id: impl Into<String>, memories: Vec<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            memories,
            reputation: None,
        }
    }

    pub fn reputation(mut self, reputation: f64) -> Self {
        self.reputation = Some(reputation);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SynthesizeBody {
    pub agent_memories: Vec<AgentContribution>,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedInsight {
    pub content: String,
    pub contributing_agents: Vec<String>,
    pub source_memories: Vec<String>,
    pub confidence: f64,
    pub relevance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub agent_id: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub topic: String,
    pub synthesized_memories: Vec<SynthesizedInsight>,
    pub top_contributors: Vec<Contributor>,
    pub aggregate_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub agent_id: String,
    pub agent_reputation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompareBody {
    pub agent_ids: Vec<String>,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAgent {
    pub agent_id: String,
    pub reputation_score: f64,
    pub total_contributions: usize,
    pub average_confidence: f64,
    pub composite_score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentComparison {
    pub agents: Vec<RankedAgent>,
    pub metrics: Vec<String>,
    pub top_performer: Option<String>,
    pub insights: Vec<String>,
}

/// Error body returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_body_omits_unset_options() {
        let body = SearchBody {
            query: "API authentication".into(),
            options: SearchOptions::new().limit(5).weights(0.9, 0.1),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "query": "API authentication",
                "limit": 5,
                "weights": {"semantic": 0.9, "recency": 0.1}
            })
        );
    }

    #[test]
    fn search_result_flattens_memory_fields() {
        let result: SearchResult = serde_json::from_value(json!({
            "id": "mem_1",
            "content": "Bearer tokens",
            "metadata": {"category": "docs"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "score": 0.8,
            "semantic_score": 0.9,
            "recency_score": 0.5
        }))
        .unwrap();
        assert_eq!(result.memory.meta_str("category"), Some("docs"));
        assert!((result.score - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn strategy_becomes_search_options() {
        let strategy = SearchStrategy {
            weights: SearchWeights::new(0.4, 0.6),
            limit: 7,
            filters: Some(json!({"user_id": "user_123"})),
        };
        let options = strategy.to_search_options();
        assert_eq!(options.limit, Some(7));
        assert_eq!(options.metadata, Some(json!({"user_id": "user_123"})));
    }

    #[test]
    fn list_options_use_wire_sort_keys() {
        let query = ListOptions::new()
            .page(2)
            .limit(10)
            .sort(SortOrder::CreatedDesc)
            .to_query();
        assert_eq!(
            query,
            vec![
                ("page", "2".to_string()),
                ("limit", "10".to_string()),
                ("sort", "-createdAt".to_string()),
            ]
        );
    }
}
