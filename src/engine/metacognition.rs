//! Predictive recall, feedback and learning introspection.
//!
//! Predictions rank stored memories against free-text context the same way
//! search does, but lean harder on relevance and fold in what feedback has
//! taught about individual memories. Each prediction also suggests a search
//! strategy derived from the learned weights and cues in the context.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::domain::prediction::{
    FeedbackAck, FeedbackRequest, Metrics, Patterns, PredictRequest, SearchStrategy,
    SuggestedMemory, new_prediction_id,
};
use crate::domain::{Metadata, Prediction, PredictionRecord, SearchWeights};
use crate::error::{ApiError, ApiResult};
use crate::persistence::PersistenceLayer;

use super::learning::{LearningState, Retrieval};
use super::scoring::{self, Terms};

pub const DEFAULT_PREDICT_LIMIT: usize = 5;
pub const MAX_PREDICT_LIMIT: usize = 50;

const SEMANTIC_WEIGHT: f64 = 0.8;
const RECENCY_WEIGHT: f64 = 0.2;

/// Words that suggest the caller cares about what happened lately.
const RECENCY_CUES: &[&str] = &[
    "recent", "latest", "today", "news", "activity", "returning", "session", "current", "now",
    "new", "yesterday",
];

/// Words that suggest the caller wants stable reference material.
const REFERENCE_CUES: &[&str] = &[
    "documentation", "docs", "guide", "explain", "reference", "tutorial", "manual",
    "definition", "started",
];

const CUE_SHIFT: f64 = 0.1;
const MAX_CUE_HITS: usize = 3;

const MIN_STRATEGY_LIMIT: usize = 3;
const MAX_STRATEGY_LIMIT: usize = 10;

/// `Label: value` context lines that become strategy filters.
const FILTER_LABELS: &[(&str, &str)] = &[
    ("user id", "user_id"),
    ("session id", "session_id"),
    ("category", "category"),
    ("agent id", "agent_id"),
];

#[derive(Debug)]
pub struct MetacognitionService {
    persistence: Arc<dyn PersistenceLayer>,
    learning: Arc<LearningState>,
    half_life_hours: f64,
}

/// Validated form of a [`PredictRequest`].
struct PredictPlan {
    context: String,
    limit: usize,
    min_confidence: f64,
    include_strategy: bool,
}

impl PredictPlan {
    fn from_request(request: PredictRequest) -> ApiResult<Self> {
        let context = request.context.trim().to_string();
        if context.is_empty() {
            return Err(ApiError::validation("context must not be empty"));
        }
        let limit = request.limit.unwrap_or(DEFAULT_PREDICT_LIMIT);
        if !(1..=MAX_PREDICT_LIMIT).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {MAX_PREDICT_LIMIT}"
            )));
        }
        let min_confidence = request.min_confidence.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ApiError::validation("min_confidence must be between 0 and 1"));
        }
        Ok(Self {
            context,
            limit,
            min_confidence,
            include_strategy: request.include_strategy.unwrap_or(true),
        })
    }
}

impl MetacognitionService {
    pub fn new(
        persistence: Arc<dyn PersistenceLayer>,
        learning: Arc<LearningState>,
        half_life_hours: f64,
    ) -> Self {
        Self {
            persistence,
            learning,
            half_life_hours,
        }
    }

    pub async fn predict(&self, request: PredictRequest) -> ApiResult<Prediction> {
        let plan = PredictPlan::from_request(request)?;
        let started = Instant::now();
        let context_terms = Terms::from_text(&plan.context);
        let now = Utc::now();

        let mut candidates = Vec::new();
        let mut term_hits: BTreeMap<String, usize> = BTreeMap::new();
        for memory in self.persistence.list_memories().await? {
            let doc = Terms::from_text(&memory.searchable_text());
            let semantic = scoring::lexical_similarity(&doc, &context_terms);
            if semantic <= 0.0 {
                continue;
            }
            let recency = scoring::recency_score(memory.created_at, now, self.half_life_hours);
            let boost = self.learning.memory_boost(&memory.id);
            let confidence =
                (SEMANTIC_WEIGHT * semantic + RECENCY_WEIGHT * recency + boost).clamp(0.0, 1.0);

            let matched = scoring::matched_terms(&doc, &context_terms);
            let reasoning = memory_reasoning(&matched, recency, boost);
            candidates.push((
                SuggestedMemory {
                    memory,
                    confidence,
                    reasoning,
                },
                matched.into_iter().map(str::to_string).collect::<Vec<_>>(),
            ));
        }
        let matching = candidates.len();

        candidates.retain(|(s, _)| s.confidence >= plan.min_confidence);
        candidates.sort_by(|(a, _), (b, _)| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        candidates.truncate(plan.limit);

        for (_, matched) in &candidates {
            for term in matched {
                *term_hits.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let suggested_memories: Vec<SuggestedMemory> =
            candidates.into_iter().map(|(s, _)| s).collect();

        #[allow(clippy::cast_precision_loss)]
        let confidence = if suggested_memories.is_empty() {
            0.0
        } else {
            suggested_memories.iter().map(|s| s.confidence).sum::<f64>()
                / suggested_memories.len() as f64
        };

        let strategy = plan
            .include_strategy
            .then(|| self.suggest_strategy(&context_terms, &plan.context, matching));

        let prediction = Prediction {
            id: new_prediction_id(),
            confidence,
            reasoning: prediction_reasoning(suggested_memories.len(), &term_hits),
            suggested_memories,
            suggested_strategy: strategy,
        };

        let record = PredictionRecord {
            id: prediction.id.clone(),
            memory_ids: prediction
                .suggested_memories
                .iter()
                .map(|s| s.memory.id.clone())
                .collect(),
            // Kept even when not returned so useful feedback can still teach weights.
            strategy: prediction
                .suggested_strategy
                .clone()
                .or_else(|| Some(self.suggest_strategy(&context_terms, "", matching))),
            created_at: now,
        };
        self.persistence.save_prediction(&record).await?;

        self.learning.record_prediction(
            &context_terms,
            Retrieval {
                elapsed: started.elapsed(),
                results: prediction.suggested_memories.len(),
                cache_hit: false,
            },
        );
        metrics::counter!("recallbricks_predictions_total").increment(1);
        info!(
            name: "prediction.created",
            prediction_id = %prediction.id,
            suggestions = prediction.suggested_memories.len(),
            confidence = prediction.confidence,
        );
        Ok(prediction)
    }

    pub async fn feedback(&self, request: FeedbackRequest) -> ApiResult<FeedbackAck> {
        let record = self
            .persistence
            .get_prediction(&request.prediction_id)
            .await?
            .ok_or_else(|| ApiError::PredictionNotFound(request.prediction_id.clone()))?;

        // Only memories the prediction actually suggested can be credited.
        let mut used = Vec::new();
        for id in &request.used_memories {
            if record.memory_ids.contains(id) && !used.contains(id) {
                used.push(id.clone());
            }
        }

        let mut agents = Vec::new();
        for id in &used {
            let Some(memory) = self.persistence.get_memory(id).await? else {
                continue;
            };
            if let Some(agent) = memory.agent_id() {
                if !agents.iter().any(|a: &String| a == agent) {
                    agents.push(agent.to_string());
                }
            }
        }

        self.learning.record_feedback(
            request.useful,
            &used,
            &agents,
            record.strategy.map(|s| s.weights),
        );
        metrics::counter!(
            "recallbricks_feedback_total",
            "useful" => if request.useful { "true" } else { "false" }
        )
        .increment(1);
        info!(
            name: "prediction.feedback",
            prediction_id = %record.id,
            useful = request.useful,
            used_memories = used.len(),
            ignored = request.used_memories.len() - used.len(),
        );

        Ok(FeedbackAck {
            prediction_id: record.id,
            useful: request.useful,
            used_memories: used.len(),
        })
    }

    pub fn patterns(&self) -> Patterns {
        self.learning.patterns()
    }

    pub fn metrics(&self) -> Metrics {
        self.learning.metrics()
    }

    fn suggest_strategy(&self, terms: &Terms, context: &str, matching: usize) -> SearchStrategy {
        let base = self.learning.optimal_weights();
        let recency_hits = cue_hits(terms, RECENCY_CUES);
        let reference_hits = cue_hits(terms, REFERENCE_CUES);

        #[allow(clippy::cast_precision_loss)]
        let shift = CUE_SHIFT * (reference_hits as f64 - recency_hits as f64);
        let semantic = (base.semantic + shift).clamp(0.05, 0.95);
        let weights = SearchWeights {
            semantic,
            recency: 1.0 - semantic,
        }
        .rounded();

        let filters = extract_filters(context);
        SearchStrategy {
            weights,
            limit: matching.clamp(MIN_STRATEGY_LIMIT, MAX_STRATEGY_LIMIT),
            filters: (!filters.is_empty()).then_some(filters),
        }
    }
}

fn cue_hits(terms: &Terms, cues: &[&str]) -> usize {
    cues.iter()
        .filter(|cue| terms.contains_word(cue))
        .count()
        .min(MAX_CUE_HITS)
}

/// Pull `User ID: ...` style lines out of the context.
fn extract_filters(context: &str) -> Metadata {
    let mut filters = Metadata::new();
    for line in context.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().to_lowercase();
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        if let Some((_, key)) = FILTER_LABELS.iter().find(|(l, _)| *l == label) {
            filters.insert((*key).to_string(), Value::String(value.to_string()));
        }
    }
    filters
}

fn memory_reasoning(matched: &[&str], recency: f64, boost: f64) -> String {
    let mut reasoning = if matched.is_empty() {
        "Partially related to the context".to_string()
    } else {
        format!("Matches context terms: {}", matched.join(", "))
    };
    if recency >= 0.8 {
        reasoning.push_str("; recently stored");
    }
    if boost > 0.0 {
        reasoning.push_str("; reinforced by past feedback");
    } else if boost < 0.0 {
        reasoning.push_str("; marked unhelpful before");
    }
    reasoning
}

fn prediction_reasoning(count: usize, term_hits: &BTreeMap<String, usize>) -> String {
    if count == 0 {
        return "No stored memories are relevant enough to this context".to_string();
    }
    let mut terms: Vec<(&String, &usize)> = term_hits.iter().collect();
    terms.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let top: Vec<&str> = terms.iter().take(3).map(|(t, _)| t.as_str()).collect();
    let noun = if count == 1 { "memory" } else { "memories" };
    if top.is_empty() {
        format!("Found {count} {noun} loosely related to this context")
    } else {
        format!("Found {count} {noun} related to {}", top.join(", "))
    }
}
