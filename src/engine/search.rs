//! Weighted search over stored memories with a short-lived result cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::search::SearchRequest;
use crate::domain::{Memory, SearchResult, SearchWeights};
use crate::error::{ApiError, ApiResult};
use crate::persistence::PersistenceLayer;

use super::learning::{LearningState, Retrieval};
use super::scoring::{self, Terms};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Recency scores drift, so cached rankings expire even without writes.
const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CacheEntry {
    results: Vec<SearchResult>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct SearchCache {
    entries: HashMap<String, CacheEntry>,
    /// Bumped on every write so in-flight searches don't cache stale data.
    generation: u64,
}

#[derive(Debug)]
pub struct SearchEngine {
    persistence: Arc<dyn PersistenceLayer>,
    learning: Arc<LearningState>,
    cache: Mutex<SearchCache>,
    cache_capacity: usize,
    half_life_hours: f64,
}

/// Validated form of a [`SearchRequest`].
#[derive(Debug, Clone)]
struct SearchPlan {
    query: String,
    limit: usize,
    weights: SearchWeights,
    filter: crate::domain::Metadata,
    min_score: f64,
}

impl SearchPlan {
    fn from_request(request: SearchRequest) -> ApiResult<Self> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(ApiError::validation("query must not be empty"));
        }

        let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }

        let weights = match request.weights {
            Some(weights) => weights.normalized().ok_or_else(|| {
                ApiError::validation(
                    "weights must be non-negative finite numbers with a positive sum",
                )
            })?,
            None => SearchWeights::default(),
        };

        let min_score = request.min_score.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(ApiError::validation("min_score must be between 0 and 1"));
        }

        Ok(Self {
            query,
            limit,
            weights,
            filter: request.metadata.unwrap_or_default(),
            min_score,
        })
    }

    fn cache_key(&self) -> String {
        let filter = serde_json::to_string(&self.filter).unwrap_or_default();
        format!(
            "{}\u{1f}{}\u{1f}{:.6}\u{1f}{:.6}\u{1f}{:.6}\u{1f}{}",
            self.query.to_lowercase(),
            self.limit,
            self.weights.semantic,
            self.weights.recency,
            self.min_score,
            filter
        )
    }
}

impl SearchEngine {
    pub fn new(
        persistence: Arc<dyn PersistenceLayer>,
        learning: Arc<LearningState>,
        cache_capacity: usize,
        half_life_hours: f64,
    ) -> Self {
        Self {
            persistence,
            learning,
            cache: Mutex::new(SearchCache::default()),
            cache_capacity,
            half_life_hours,
        }
    }

    fn cache(&self) -> MutexGuard<'_, SearchCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every cached ranking. Called after any memory write.
    pub fn invalidate(&self) {
        let mut cache = self.cache();
        cache.entries.clear();
        cache.generation = cache.generation.wrapping_add(1);
    }

    pub async fn search(&self, request: SearchRequest) -> ApiResult<Vec<SearchResult>> {
        let plan = SearchPlan::from_request(request)?;
        let started = Instant::now();
        let query_terms = Terms::from_text(&plan.query);
        let key = plan.cache_key();

        let (cached, generation) = {
            let mut cache = self.cache();
            let generation = cache.generation;
            let hit = match cache.entries.get(&key) {
                Some(entry) if entry.stored_at.elapsed() < CACHE_TTL => {
                    Some(entry.results.clone())
                }
                Some(_) => {
                    cache.entries.remove(&key);
                    None
                }
                None => None,
            };
            (hit, generation)
        };

        if let Some(results) = cached {
            self.observe(&query_terms, started, results.len(), true);
            debug!(name: "search.cache_hit", query = %plan.query, results = results.len());
            return Ok(results);
        }

        let memories = self.persistence.list_memories().await?;
        let candidates: Vec<Memory> = memories
            .into_iter()
            .filter(|m| m.matches_filter(&plan.filter))
            .collect();
        let mut results = rank(
            candidates,
            &query_terms,
            plan.weights,
            Utc::now(),
            self.half_life_hours,
        );
        results.retain(|r| r.score >= plan.min_score);
        results.truncate(plan.limit);

        self.store(key, generation, &results);
        self.observe(&query_terms, started, results.len(), false);
        debug!(
            name: "search.executed",
            query = %plan.query,
            results = results.len(),
            semantic = plan.weights.semantic,
            recency = plan.weights.recency,
        );
        Ok(results)
    }

    fn store(&self, key: String, generation: u64, results: &[SearchResult]) {
        if self.cache_capacity == 0 {
            return;
        }
        let mut cache = self.cache();
        if cache.generation != generation {
            return;
        }
        if cache.entries.len() >= self.cache_capacity {
            let oldest = cache
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                cache.entries.remove(&oldest);
            }
        }
        cache.entries.insert(
            key,
            CacheEntry {
                results: results.to_vec(),
                stored_at: Instant::now(),
            },
        );
    }

    fn observe(&self, query: &Terms, started: Instant, results: usize, cache_hit: bool) {
        let elapsed = started.elapsed();
        self.learning.record_search(
            query,
            Retrieval {
                elapsed,
                results,
                cache_hit,
            },
        );
        let outcome = if cache_hit { "hit" } else { "miss" };
        metrics::counter!("recallbricks_search_total", "cache" => outcome).increment(1);
        metrics::histogram!("recallbricks_search_duration_seconds").record(elapsed.as_secs_f64());
    }
}

/// Score every memory against `query` and sort best first.
///
/// Ties are broken by creation time, newest first, then by id so the order
/// is stable across calls.
pub fn rank(
    memories: Vec<Memory>,
    query: &Terms,
    weights: SearchWeights,
    now: DateTime<Utc>,
    half_life_hours: f64,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = memories
        .into_iter()
        .map(|memory| {
            let doc = Terms::from_text(&memory.searchable_text());
            let semantic_score = scoring::lexical_similarity(query, &doc);
            let recency_score = scoring::recency_score(memory.created_at, now, half_life_hours);
            let score = (weights.semantic * semantic_score + weights.recency * recency_score)
                .clamp(0.0, 1.0);
            SearchResult {
                memory,
                score,
                semantic_score,
                recency_score,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    results
}
