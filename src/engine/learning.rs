//! Usage observations that feed predictions, patterns and metrics.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::SearchWeights;
use crate::domain::prediction::{
    LearningProgress, Metrics, OptimizationGains, Patterns, PerformanceMetrics, QueryPatterns,
};

use super::scoring::Terms;

/// Step applied to a memory's confidence boost per feedback.
const MEMORY_BOOST_STEP: f64 = 0.05;
const MAX_MEMORY_BOOST: f64 = 0.2;

/// Step applied to an agent's reputation per feedback touching its memories.
const AGENT_ADJUSTMENT_STEP: f64 = 0.02;
const MAX_AGENT_ADJUSTMENT: f64 = 0.3;

/// Moving-average factor for learned search weights.
const WEIGHT_LEARNING_RATE: f64 = 0.2;

const MOST_QUERIED_LIMIT: usize = 5;

/// Most recent feedback outcomes kept for the accuracy trend.
const FEEDBACK_WINDOW: usize = 1_000;

#[derive(Debug, Default)]
struct Inner {
    term_counts: HashMap<String, u64>,
    searches: u64,
    predictions: u64,
    results_returned: u64,
    retrieval_time: Duration,
    cache_hits: u64,
    cache_hit_time: Duration,
    cache_misses: u64,
    cache_miss_time: Duration,
    feedback_total: u64,
    feedback_useful: u64,
    recent_feedback: VecDeque<bool>,
    optimal_weights: SearchWeights,
    memory_boosts: HashMap<String, f64>,
    agent_adjustments: HashMap<String, f64>,
}

/// Outcome of a single retrieval, as recorded by the search engine.
#[derive(Debug, Clone, Copy)]
pub struct Retrieval {
    pub elapsed: Duration,
    pub results: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Default)]
pub struct LearningState {
    inner: Mutex<Inner>,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a panic mid-update of counters.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn record_search(&self, query: &Terms, retrieval: Retrieval) {
        let mut inner = self.lock();
        inner.searches += 1;
        inner.count_terms(query);
        inner.record_retrieval(retrieval);
        if retrieval.cache_hit {
            inner.cache_hits += 1;
            inner.cache_hit_time += retrieval.elapsed;
        } else {
            inner.cache_misses += 1;
            inner.cache_miss_time += retrieval.elapsed;
        }
    }

    pub fn record_prediction(&self, context: &Terms, retrieval: Retrieval) {
        let mut inner = self.lock();
        inner.predictions += 1;
        inner.count_terms(context);
        inner.record_retrieval(retrieval);
    }

    /// Apply feedback on a prediction.
    ///
    /// `agents` are the agents owning `used_memories`; `strategy` is the
    /// weighting the prediction suggested, if any.
    pub fn record_feedback(
        &self,
        useful: bool,
        used_memories: &[String],
        agents: &[String],
        strategy: Option<SearchWeights>,
    ) {
        let mut inner = self.lock();
        inner.record_outcome(useful);

        let sign = if useful { 1.0 } else { -1.0 };
        for id in used_memories {
            let boost = inner.memory_boosts.entry(id.clone()).or_insert(0.0);
            *boost = (*boost + sign * MEMORY_BOOST_STEP).clamp(-MAX_MEMORY_BOOST, MAX_MEMORY_BOOST);
        }
        for agent in agents {
            let adjustment = inner.agent_adjustments.entry(agent.clone()).or_insert(0.0);
            *adjustment = (*adjustment + sign * AGENT_ADJUSTMENT_STEP)
                .clamp(-MAX_AGENT_ADJUSTMENT, MAX_AGENT_ADJUSTMENT);
        }

        if let (true, Some(target)) = (useful, strategy) {
            let current = inner.optimal_weights;
            let blended = SearchWeights {
                semantic: current.semantic * (1.0 - WEIGHT_LEARNING_RATE)
                    + target.semantic * WEIGHT_LEARNING_RATE,
                recency: current.recency * (1.0 - WEIGHT_LEARNING_RATE)
                    + target.recency * WEIGHT_LEARNING_RATE,
            };
            inner.optimal_weights = blended.normalized().unwrap_or(current);
        }
    }

    pub fn forget_memory(&self, id: &str) {
        self.lock().memory_boosts.remove(id);
    }

    pub fn memory_boost(&self, id: &str) -> f64 {
        self.lock().memory_boosts.get(id).copied().unwrap_or(0.0)
    }

    #[cfg(test)]
    pub(crate) fn boosted_memories(&self) -> usize {
        self.lock().memory_boosts.len()
    }

    pub fn agent_adjustment(&self, agent_id: &str) -> f64 {
        self.lock()
            .agent_adjustments
            .get(agent_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn optimal_weights(&self) -> SearchWeights {
        self.lock().optimal_weights
    }

    pub fn patterns(&self) -> Patterns {
        let inner = self.lock();
        let retrievals = inner.searches + inner.predictions;
        Patterns {
            query_patterns: QueryPatterns {
                most_queried: inner.most_queried(),
                optimal_weights: inner.optimal_weights.rounded(),
                avg_retrieval_time: round2(average_ms(inner.retrieval_time, retrievals)),
                total_queries: retrievals,
            },
            performance_metrics: PerformanceMetrics {
                cache_hit_rate: inner.cache_hit_rate(),
                avg_results_per_query: ratio(inner.results_returned, retrievals),
            },
        }
    }

    pub fn metrics(&self) -> Metrics {
        let inner = self.lock();
        let feedback_total = inner.feedback_total;

        // Laplace-smoothed share of useful feedback.
        #[allow(clippy::cast_precision_loss)]
        let confidence_level =
            (inner.feedback_useful as f64 + 1.0) / (feedback_total as f64 + 2.0);

        Metrics {
            learning_progress: LearningProgress {
                total_observations: inner.searches + inner.predictions + feedback_total,
                patterns_detected: inner.term_counts.values().filter(|c| **c >= 2).count(),
                confidence_level,
            },
            optimization_gains: OptimizationGains {
                speed_improvement: percent(inner.speed_improvement()),
                accuracy_improvement: percent(inner.accuracy_improvement()),
                cache_efficiency: percent(inner.cache_hit_rate()),
            },
        }
    }
}

impl Inner {
    fn count_terms(&mut self, terms: &Terms) {
        for term in terms.iter().filter(|t| !t.chars().all(|c| c.is_ascii_digit())) {
            *self.term_counts.entry(term.to_string()).or_insert(0) += 1;
        }
    }

    fn record_outcome(&mut self, useful: bool) {
        self.feedback_total += 1;
        if useful {
            self.feedback_useful += 1;
        }
        if self.recent_feedback.len() == FEEDBACK_WINDOW {
            self.recent_feedback.pop_front();
        }
        self.recent_feedback.push_back(useful);
    }

    fn record_retrieval(&mut self, retrieval: Retrieval) {
        self.retrieval_time += retrieval.elapsed;
        self.results_returned += retrieval.results as u64;
    }

    fn most_queried(&self) -> Vec<String> {
        let mut terms: Vec<(&String, &u64)> = self.term_counts.iter().collect();
        terms.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        terms
            .into_iter()
            .take(MOST_QUERIED_LIMIT)
            .map(|(term, _)| term.clone())
            .collect()
    }

    fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Relative latency saved by cache hits compared to misses.
    fn speed_improvement(&self) -> f64 {
        if self.cache_hits == 0 || self.cache_misses == 0 {
            return 0.0;
        }
        let hit = average_ms(self.cache_hit_time, self.cache_hits);
        let miss = average_ms(self.cache_miss_time, self.cache_misses);
        if miss <= 0.0 {
            return 0.0;
        }
        (1.0 - hit / miss).clamp(0.0, 1.0)
    }

    /// Useful-feedback rate of the newer half of the recent window minus
    /// that of the older half.
    fn accuracy_improvement(&self) -> f64 {
        let len = self.recent_feedback.len();
        if len < 2 {
            return 0.0;
        }
        let split = len / 2;
        let useful = |skip: usize, take: usize| {
            self.recent_feedback
                .iter()
                .skip(skip)
                .take(take)
                .filter(|u| **u)
                .count() as u64
        };
        let older = useful(0, split);
        let newer = useful(split, len - split);
        ratio(newer, (len - split) as u64) - ratio(older, split as u64)
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn average_ms(total: Duration, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total.as_secs_f64() * 1000.0 / count as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(fraction: f64) -> String {
    format!("{:+.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieval(ms: u64, cache_hit: bool) -> Retrieval {
        Retrieval {
            elapsed: Duration::from_millis(ms),
            results: 2,
            cache_hit,
        }
    }

    #[test]
    fn most_queried_counts_terms_across_queries() {
        let state = LearningState::new();
        state.record_search(&Terms::from_text("API authentication"), retrieval(4, false));
        state.record_search(&Terms::from_text("API authentication guide"), retrieval(2, true));
        state.record_prediction(&Terms::from_text("rate limits for the API"), retrieval(6, false));

        let patterns = state.patterns();
        assert_eq!(patterns.query_patterns.most_queried[0], "api");
        assert_eq!(patterns.query_patterns.most_queried[1], "authenticate");
        assert_eq!(patterns.query_patterns.total_queries, 3);
        assert!((patterns.performance_metrics.cache_hit_rate - 0.5).abs() < 1e-9);
        assert!((patterns.query_patterns.avg_retrieval_time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn useful_feedback_moves_weights_toward_strategy() {
        let state = LearningState::new();
        let before = state.optimal_weights();
        state.record_feedback(
            true,
            &[],
            &[],
            Some(SearchWeights {
                semantic: 0.2,
                recency: 0.8,
            }),
        );
        let after = state.optimal_weights();
        assert!(after.semantic < before.semantic);
        assert!((after.semantic + after.recency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unhelpful_feedback_leaves_weights_alone() {
        let state = LearningState::new();
        let before = state.optimal_weights();
        state.record_feedback(
            false,
            &[],
            &[],
            Some(SearchWeights {
                semantic: 0.2,
                recency: 0.8,
            }),
        );
        assert_eq!(state.optimal_weights(), before);
    }

    #[test]
    fn memory_boost_is_bounded() {
        let state = LearningState::new();
        let ids = vec!["mem_1".to_string()];
        for _ in 0..10 {
            state.record_feedback(true, &ids, &[], None);
        }
        assert!((state.memory_boost("mem_1") - MAX_MEMORY_BOOST).abs() < 1e-9);
        state.forget_memory("mem_1");
        assert!(state.memory_boost("mem_1").abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_report_bounded_confidence() {
        let state = LearningState::new();
        assert!((state.metrics().learning_progress.confidence_level - 0.5).abs() < 1e-9);

        state.record_feedback(false, &[], &["a".into()], None);
        state.record_feedback(true, &[], &["a".into()], None);
        state.record_feedback(true, &[], &["a".into()], None);
        let metrics = state.metrics();
        assert!(metrics.learning_progress.confidence_level <= 1.0);
        assert_eq!(metrics.learning_progress.total_observations, 3);
        assert_eq!(metrics.optimization_gains.accuracy_improvement, "+100.0%");
        assert!((state.agent_adjustment("a") - AGENT_ADJUSTMENT_STEP).abs() < 1e-9);
    }

    #[test]
    fn feedback_history_keeps_a_bounded_window() {
        let state = LearningState::new();
        for _ in 0..FEEDBACK_WINDOW {
            state.record_feedback(false, &[], &[], None);
        }
        for _ in 0..FEEDBACK_WINDOW / 2 {
            state.record_feedback(true, &[], &[], None);
        }

        {
            let inner = state.lock();
            assert_eq!(inner.recent_feedback.len(), FEEDBACK_WINDOW);
            assert_eq!(inner.feedback_total, (FEEDBACK_WINDOW * 3 / 2) as u64);
            assert_eq!(inner.feedback_useful, (FEEDBACK_WINDOW / 2) as u64);
        }
        let metrics = state.metrics();
        assert_eq!(
            metrics.learning_progress.total_observations,
            (FEEDBACK_WINDOW * 3 / 2) as u64
        );
        // The window now holds 500 unhelpful then 500 useful outcomes.
        assert_eq!(metrics.optimization_gains.accuracy_improvement, "+100.0%");
    }
}
