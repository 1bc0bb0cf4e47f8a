//! Agent registry, reputation and reputation-weighted synthesis.
//!
//! Reputation is never stored. It is derived on read from the memories an
//! agent contributed (memories whose metadata names the agent), smoothed
//! toward the configured initial reputation, and nudged by prediction
//! feedback that touched the agent's memories.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::agent::{
    AgentComparison, AgentMemoriesQuery, AgentMemory, CompareRequest, ComparisonMetric,
    Contributor, RankedAgent, RegisterAgentRequest, Reputation, SynthesisResult,
    SynthesizeRequest, SynthesizedInsight, UpdateAgentRequest,
};
use crate::domain::memory::merge_metadata;
use crate::domain::{Agent, AgentRecord, Memory, ReputationTier};
use crate::error::{ApiError, ApiResult};
use crate::persistence::PersistenceLayer;

use super::learning::LearningState;
use super::scoring::{self, Terms};

const MAX_AGENT_ID_LEN: usize = 64;

/// Weight of the initial reputation when averaging contribution confidences.
const PRIOR_WEIGHT: f64 = 2.0;

/// Minimum cosine similarity for two memories to land in the same insight.
const CLUSTER_THRESHOLD: f64 = 0.35;

/// Share of the remaining confidence headroom granted per corroborating agent.
const CORROBORATION_BONUS: f64 = 0.1;

pub const DEFAULT_AGENT_MEMORIES_LIMIT: usize = 10;
pub const MAX_AGENT_MEMORIES_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy)]
struct AgentStats {
    reputation: f64,
    total_contributions: usize,
    average_confidence: f64,
}

impl AgentStats {
    fn metric(&self, metric: ComparisonMetric) -> f64 {
        match metric {
            ComparisonMetric::ReputationScore => self.reputation,
            #[allow(clippy::cast_precision_loss)]
            ComparisonMetric::TotalContributions => self.total_contributions as f64,
            ComparisonMetric::AverageConfidence => self.average_confidence,
        }
    }
}

/// One memory as seen by a synthesis, attributed to a contributing agent.
struct SynthesisItem {
    agent_id: String,
    memory: Memory,
    reputation: f64,
    confidence: f64,
    terms: Terms,
}

impl SynthesisItem {
    fn weight(&self) -> f64 {
        self.reputation * self.confidence
    }
}

#[derive(Debug)]
pub struct CollaborationService {
    persistence: Arc<dyn PersistenceLayer>,
    learning: Arc<LearningState>,
    initial_reputation: f64,
}

impl CollaborationService {
    pub fn new(
        persistence: Arc<dyn PersistenceLayer>,
        learning: Arc<LearningState>,
        initial_reputation: f64,
    ) -> Self {
        Self {
            persistence,
            learning,
            initial_reputation,
        }
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register an agent, or update role/capabilities/metadata if it exists.
    pub async fn register_agent(&self, request: RegisterAgentRequest) -> ApiResult<Agent> {
        validate_agent_id(&request.agent_id)?;
        let role = request.role.trim();
        if role.is_empty() {
            return Err(ApiError::validation("role must not be empty"));
        }

        let now = Utc::now();
        let existing = self.persistence.get_agent(&request.agent_id).await?;
        let record = AgentRecord {
            agent_id: request.agent_id,
            role: role.to_string(),
            capabilities: dedupe_capabilities(request.capabilities),
            metadata: request.metadata,
            created_at: existing.as_ref().map_or(now, |a| a.created_at),
            updated_at: now,
        };
        self.persistence.save_agent(&record).await?;
        info!(
            name: "agent.registered",
            agent_id = %record.agent_id,
            role = %record.role,
            updated = existing.is_some(),
        );
        self.view(record).await
    }

    pub async fn get_agent(&self, agent_id: &str) -> ApiResult<Agent> {
        let record = self.record(agent_id).await?;
        self.view(record).await
    }

    pub async fn list_agents(&self) -> ApiResult<Vec<Agent>> {
        let memories = self.persistence.list_memories().await?;
        Ok(self
            .persistence
            .list_agents()
            .await?
            .into_iter()
            .map(|record| {
                let stats = self.stats(&record.agent_id, &memories);
                agent_view(record, stats)
            })
            .collect())
    }

    /// Capabilities are replaced; metadata is merged.
    pub async fn update_agent(&self, agent_id: &str, request: UpdateAgentRequest) -> ApiResult<Agent> {
        let mut record = self.record(agent_id).await?;
        if let Some(capabilities) = request.capabilities {
            record.capabilities = dedupe_capabilities(capabilities);
        }
        if let Some(patch) = request.metadata {
            merge_metadata(&mut record.metadata, patch);
        }
        record.updated_at = Utc::now();
        self.persistence.save_agent(&record).await?;
        info!(name: "agent.updated", agent_id = %record.agent_id);
        self.view(record).await
    }

    pub async fn get_reputation(&self, agent_id: &str) -> ApiResult<Reputation> {
        let record = self.record(agent_id).await?;
        let memories = self.persistence.list_memories().await?;
        let stats = self.stats(&record.agent_id, &memories);
        Ok(Reputation {
            agent_id: record.agent_id,
            reputation_score: stats.reputation,
            tier: ReputationTier::from_score(stats.reputation),
            total_contributions: stats.total_contributions,
            average_confidence: stats.average_confidence,
        })
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    pub async fn synthesize(&self, request: SynthesizeRequest) -> ApiResult<SynthesisResult> {
        let topic = request.topic.trim().to_string();
        if topic.is_empty() {
            return Err(ApiError::validation("topic must not be empty"));
        }
        if request.agent_memories.is_empty() {
            return Err(ApiError::validation("agent_memories must not be empty"));
        }
        let min_confidence = request.min_confidence.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ApiError::validation("min_confidence must be between 0 and 1"));
        }

        let all_memories = self.persistence.list_memories().await?;
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for contribution in request.agent_memories {
            if contribution.agent_id.trim().is_empty() {
                return Err(ApiError::validation("agent_id must not be empty"));
            }
            let reputation = match contribution.reputation {
                Some(r) if (0.0..=1.0).contains(&r) => r,
                Some(_) => {
                    return Err(ApiError::validation("reputation must be between 0 and 1"));
                }
                None => self.reputation_or_initial(&contribution.agent_id, &all_memories).await?,
            };
            for memory_id in contribution.memories {
                if !seen.insert((contribution.agent_id.clone(), memory_id.clone())) {
                    continue;
                }
                let memory = all_memories
                    .iter()
                    .find(|m| m.id == memory_id)
                    .cloned()
                    .ok_or(ApiError::MemoryNotFound(memory_id))?;
                items.push(SynthesisItem {
                    agent_id: contribution.agent_id.clone(),
                    confidence: memory.confidence(),
                    terms: Terms::from_text(&memory.content),
                    memory,
                    reputation,
                });
            }
        }
        if items.is_empty() {
            return Err(ApiError::validation("no memories to synthesize"));
        }

        let top_contributors = contributor_shares(&items);
        let topic_terms = Terms::from_text(&topic);
        let mut insights: Vec<SynthesizedInsight> = cluster(items)
            .iter()
            .map(|group| insight(group, &topic_terms))
            .filter(|insight| insight.confidence >= min_confidence)
            .collect();
        insights.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.relevance.total_cmp(&a.relevance))
        });

        let sources: usize = insights.iter().map(|i| i.source_memories.len()).sum();
        #[allow(clippy::cast_precision_loss)]
        let aggregate_confidence = if sources == 0 {
            0.0
        } else {
            insights
                .iter()
                .map(|i| i.confidence * i.source_memories.len() as f64)
                .sum::<f64>()
                / sources as f64
        };

        info!(
            name: "collaboration.synthesized",
            topic = %topic,
            insights = insights.len(),
            aggregate_confidence,
        );
        Ok(SynthesisResult {
            topic,
            synthesized_memories: insights,
            top_contributors,
            aggregate_confidence,
        })
    }

    // =========================================================================
    // Filtering & comparison
    // =========================================================================

    /// Memories from registered agents at or above `min_reputation`.
    pub async fn get_agent_memories(&self, query: AgentMemoriesQuery) -> ApiResult<Vec<AgentMemory>> {
        let min_reputation = query.min_reputation.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&min_reputation) {
            return Err(ApiError::validation("min_reputation must be between 0 and 1"));
        }
        let limit = query.limit.unwrap_or(DEFAULT_AGENT_MEMORIES_LIMIT);
        if !(1..=MAX_AGENT_MEMORIES_LIMIT).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {MAX_AGENT_MEMORIES_LIMIT}"
            )));
        }

        let memories = self.persistence.list_memories().await?;
        let reputations: HashMap<String, f64> = self
            .persistence
            .list_agents()
            .await?
            .into_iter()
            .map(|agent| {
                let reputation = self.stats(&agent.agent_id, &memories).reputation;
                (agent.agent_id, reputation)
            })
            .filter(|(_, reputation)| *reputation >= min_reputation)
            .collect();

        let mut selected: Vec<AgentMemory> = memories
            .into_iter()
            .filter_map(|memory| {
                let agent_id = memory.agent_id()?.to_string();
                let agent_reputation = *reputations.get(&agent_id)?;
                Some(AgentMemory {
                    memory,
                    agent_id,
                    agent_reputation,
                })
            })
            .collect();
        selected.sort_by(|a, b| {
            b.agent_reputation
                .total_cmp(&a.agent_reputation)
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        selected.truncate(limit);
        Ok(selected)
    }

    pub async fn compare_agents(&self, request: CompareRequest) -> ApiResult<AgentComparison> {
        let mut agent_ids: Vec<String> = Vec::new();
        for id in request.agent_ids {
            if !agent_ids.contains(&id) {
                agent_ids.push(id);
            }
        }
        if agent_ids.is_empty() {
            return Err(ApiError::validation("agent_ids must not be empty"));
        }
        let mut metrics: Vec<ComparisonMetric> = Vec::new();
        for metric in request.metrics {
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        if metrics.is_empty() {
            metrics = ComparisonMetric::ALL.to_vec();
        }

        let memories = self.persistence.list_memories().await?;
        let mut rows = Vec::with_capacity(agent_ids.len());
        for agent_id in agent_ids {
            let record = self.record(&agent_id).await?;
            rows.push((record.agent_id, self.stats(&agent_id, &memories)));
        }

        let best: Vec<f64> = metrics
            .iter()
            .map(|m| rows.iter().map(|(_, s)| s.metric(*m)).fold(0.0, f64::max))
            .collect();

        let mut ranked: Vec<RankedAgent> = rows
            .iter()
            .map(|(agent_id, stats)| {
                #[allow(clippy::cast_precision_loss)]
                let composite_score = metrics
                    .iter()
                    .zip(&best)
                    .map(|(m, best)| if *best > 0.0 { stats.metric(*m) / best } else { 0.0 })
                    .sum::<f64>()
                    / metrics.len() as f64;
                RankedAgent {
                    agent_id: agent_id.clone(),
                    reputation_score: stats.reputation,
                    total_contributions: stats.total_contributions,
                    average_confidence: stats.average_confidence,
                    composite_score,
                    rank: 0,
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        for (index, agent) in ranked.iter_mut().enumerate() {
            agent.rank = index + 1;
        }

        let insights = metrics
            .iter()
            .filter_map(|metric| metric_leader_insight(*metric, &rows))
            .collect();

        Ok(AgentComparison {
            top_performer: ranked.first().map(|a| a.agent_id.clone()),
            agents: ranked,
            metrics,
            insights,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn record(&self, agent_id: &str) -> ApiResult<AgentRecord> {
        self.persistence
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ApiError::AgentNotFound(agent_id.to_string()))
    }

    async fn view(&self, record: AgentRecord) -> ApiResult<Agent> {
        let memories = self.persistence.list_memories().await?;
        let stats = self.stats(&record.agent_id, &memories);
        Ok(agent_view(record, stats))
    }

    async fn reputation_or_initial(&self, agent_id: &str, memories: &[Memory]) -> ApiResult<f64> {
        Ok(match self.persistence.get_agent(agent_id).await? {
            Some(_) => self.stats(agent_id, memories).reputation,
            None => self.initial_reputation,
        })
    }

    fn stats(&self, agent_id: &str, memories: &[Memory]) -> AgentStats {
        let confidences: Vec<f64> = memories
            .iter()
            .filter(|m| m.agent_id() == Some(agent_id))
            .map(Memory::confidence)
            .collect();
        let total: f64 = confidences.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let n = confidences.len() as f64;

        let smoothed = (self.initial_reputation * PRIOR_WEIGHT + total) / (PRIOR_WEIGHT + n);
        let reputation = (smoothed + self.learning.agent_adjustment(agent_id)).clamp(0.0, 1.0);
        AgentStats {
            reputation,
            total_contributions: confidences.len(),
            average_confidence: if confidences.is_empty() { 0.0 } else { total / n },
        }
    }
}

fn agent_view(record: AgentRecord, stats: AgentStats) -> Agent {
    Agent {
        record,
        reputation_score: stats.reputation,
        tier: ReputationTier::from_score(stats.reputation),
    }
}

fn validate_agent_id(agent_id: &str) -> ApiResult<()> {
    let valid = !agent_id.is_empty()
        && agent_id.len() <= MAX_AGENT_ID_LEN
        && agent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "agent_id must be 1-{MAX_AGENT_ID_LEN} characters of letters, digits, '-' or '_'"
        )))
    }
}

fn dedupe_capabilities(capabilities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(capabilities.len());
    for capability in capabilities {
        let capability = capability.trim();
        if !capability.is_empty() && !out.iter().any(|c| c == capability) {
            out.push(capability.to_string());
        }
    }
    out
}

/// Greedy single-pass clustering, heaviest items first.
fn cluster(mut items: Vec<SynthesisItem>) -> Vec<Vec<SynthesisItem>> {
    items.sort_by(|a, b| {
        b.weight()
            .total_cmp(&a.weight())
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    let mut groups: Vec<Vec<SynthesisItem>> = Vec::new();
    for item in items {
        let home = groups
            .iter()
            .position(|group| scoring::cosine(&group[0].terms, &item.terms) >= CLUSTER_THRESHOLD);
        match home {
            Some(index) => groups[index].push(item),
            None => groups.push(vec![item]),
        }
    }
    groups
}

fn insight(group: &[SynthesisItem], topic: &Terms) -> SynthesizedInsight {
    let mut contributing_agents: Vec<String> = Vec::new();
    let mut source_memories: Vec<String> = Vec::new();
    // Agents backing at least one distinct memory; a memory counts once.
    let mut corroborating: Vec<&str> = Vec::new();
    for item in group {
        if !contributing_agents.contains(&item.agent_id) {
            contributing_agents.push(item.agent_id.clone());
        }
        if !source_memories.contains(&item.memory.id) {
            source_memories.push(item.memory.id.clone());
            if !corroborating.contains(&item.agent_id.as_str()) {
                corroborating.push(&item.agent_id);
            }
        }
    }

    let reputation_total: f64 = group.iter().map(|i| i.reputation).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = if reputation_total > 0.0 {
        group.iter().map(SynthesisItem::weight).sum::<f64>() / reputation_total
    } else {
        group.iter().map(|i| i.confidence).sum::<f64>() / group.len() as f64
    };
    #[allow(clippy::cast_precision_loss)]
    let extra_agents = corroborating.len().saturating_sub(1) as f64;
    let confidence =
        (mean + (1.0 - mean) * CORROBORATION_BONUS * extra_agents).clamp(0.0, 1.0);

    let combined: Vec<&str> = group.iter().map(|i| i.memory.content.as_str()).collect();
    let relevance = scoring::lexical_similarity(topic, &Terms::from_text(&combined.join(" ")));

    SynthesizedInsight {
        content: group[0].memory.content.clone(),
        contributing_agents,
        source_memories,
        confidence,
        relevance,
    }
}

fn contributor_shares(items: &[SynthesisItem]) -> Vec<Contributor> {
    let mut weights: Vec<(String, f64, usize)> = Vec::new();
    for item in items {
        match weights.iter_mut().find(|(id, _, _)| *id == item.agent_id) {
            Some(entry) => {
                entry.1 += item.weight();
                entry.2 += 1;
            }
            None => weights.push((item.agent_id.clone(), item.weight(), 1)),
        }
    }
    let total_weight: f64 = weights.iter().map(|(_, w, _)| w).sum();

    #[allow(clippy::cast_precision_loss)]
    let mut contributors: Vec<Contributor> = weights
        .into_iter()
        .map(|(agent_id, weight, count)| Contributor {
            agent_id,
            contribution: if total_weight > 0.0 {
                weight / total_weight
            } else {
                count as f64 / items.len() as f64
            },
        })
        .collect();
    contributors.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    contributors
}

fn metric_leader_insight(metric: ComparisonMetric, rows: &[(String, AgentStats)]) -> Option<String> {
    let (leader, stats) = rows.iter().min_by(|(a_id, a), (b_id, b)| {
        b.metric(metric)
            .total_cmp(&a.metric(metric))
            .then_with(|| a_id.cmp(b_id))
    })?;
    let value = match metric {
        ComparisonMetric::TotalContributions => stats.total_contributions.to_string(),
        _ => format!("{:.1}%", stats.metric(metric) * 100.0),
    };
    Some(format!("{leader} leads on {} ({value})", metric.label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metadata;
    use crate::domain::agent::AgentContribution;
    use crate::persistence::providers::InMemoryProvider;
    use serde_json::{Value, json};

    fn service() -> (CollaborationService, Arc<InMemoryProvider>, Arc<LearningState>) {
        let provider = Arc::new(InMemoryProvider::new());
        let learning = Arc::new(LearningState::new());
        let service = CollaborationService::new(provider.clone(), learning.clone(), 0.5);
        (service, provider, learning)
    }

    fn object(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => Metadata::new(),
        }
    }

    fn register(agent_id: &str) -> RegisterAgentRequest {
        RegisterAgentRequest {
            agent_id: agent_id.into(),
            role: "research".into(),
            capabilities: vec!["web_search".into(), "web_search".into(), " fact_checking ".into()],
            metadata: object(json!({"team": "research"})),
        }
    }

    fn contribution(agent: &str, content: &str, confidence: f64) -> Memory {
        Memory::new(
            content.into(),
            object(json!({"agentId": agent, "confidence": confidence})),
        )
    }

    #[tokio::test]
    async fn new_agents_start_at_initial_reputation() {
        let (service, _, _) = service();
        let agent = service.register_agent(register("web-researcher")).await.unwrap();
        assert!((agent.reputation_score - 0.5).abs() < 1e-9);
        assert_eq!(agent.tier, ReputationTier::Contributor);
        assert_eq!(agent.record.capabilities, vec!["web_search", "fact_checking"]);
    }

    #[tokio::test]
    async fn invalid_agent_ids_are_rejected() {
        let (service, _, _) = service();
        let too_long = "x".repeat(65);
        for bad in ["", "has space", too_long.as_str()] {
            let err = service.register_agent(register(bad)).await.unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn reregistering_keeps_creation_time() {
        let (service, _, _) = service();
        let first = service.register_agent(register("analyst")).await.unwrap();
        let mut again = register("analyst");
        again.role = "analysis".into();
        let second = service.register_agent(again).await.unwrap();
        assert_eq!(second.record.role, "analysis");
        assert_eq!(second.record.created_at, first.record.created_at);
        assert_eq!(service.list_agents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reputation_tracks_contribution_confidence() {
        let (service, provider, learning) = service();
        service.register_agent(register("web-researcher")).await.unwrap();
        provider
            .save_memories(&[
                contribution("web-researcher", "73% of developers use AI tools", 0.95),
                contribution("web-researcher", "Copilot has 1M subscribers", 0.98),
            ])
            .await
            .unwrap();

        let reputation = service.get_reputation("web-researcher").await.unwrap();
        assert_eq!(reputation.total_contributions, 2);
        assert!((reputation.average_confidence - 0.965).abs() < 1e-9);
        assert!((reputation.reputation_score - 0.7325).abs() < 1e-9);

        learning.record_feedback(false, &[], &["web-researcher".into()], None);
        let lowered = service.get_reputation("web-researcher").await.unwrap();
        assert!(lowered.reputation_score < reputation.reputation_score);

        let err = service.get_reputation("ghost").await.unwrap_err();
        assert_eq!(err.code(), "AGENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn synthesis_weights_contributors_and_filters_insights() {
        let (service, provider, _) = service();
        let a = contribution("a", "AI coding tools adoption is growing fast", 0.9);
        let b = contribution("b", "AI coding tools adoption keeps growing", 0.8);
        let c = contribution("c", "Office coffee machine is broken", 0.3);
        provider
            .save_memories(&[a.clone(), b.clone(), c.clone()])
            .await
            .unwrap();

        let result = service
            .synthesize(SynthesizeRequest {
                agent_memories: vec![
                    AgentContribution {
                        agent_id: "a".into(),
                        memories: vec![a.id.clone()],
                        reputation: Some(0.9),
                    },
                    AgentContribution {
                        agent_id: "b".into(),
                        memories: vec![b.id.clone()],
                        reputation: Some(0.8),
                    },
                    AgentContribution {
                        agent_id: "c".into(),
                        memories: vec![c.id.clone()],
                        reputation: None,
                    },
                ],
                topic: "AI tools adoption".into(),
                min_confidence: Some(0.5),
            })
            .await
            .unwrap();

        assert_eq!(result.synthesized_memories.len(), 1);
        let insight = &result.synthesized_memories[0];
        assert_eq!(insight.content, a.content);
        assert_eq!(insight.contributing_agents, vec!["a", "b"]);
        assert!(insight.confidence > 0.85 && insight.confidence <= 1.0);

        let shares: f64 = result.top_contributors.iter().map(|c| c.contribution).sum();
        assert!((shares - 1.0).abs() < 1e-9);
        assert_eq!(result.top_contributors[0].agent_id, "a");
        assert!((0.0..=1.0).contains(&result.aggregate_confidence));
    }

    #[tokio::test]
    async fn shared_memory_does_not_corroborate_itself() {
        let (service, provider, _) = service();
        let shared = contribution("a", "AI coding tools adoption is growing fast", 0.6);
        provider.save_memory(&shared).await.unwrap();

        let result = service
            .synthesize(SynthesizeRequest {
                agent_memories: ["a", "b", "c"]
                    .into_iter()
                    .map(|agent| AgentContribution {
                        agent_id: agent.into(),
                        memories: vec![shared.id.clone()],
                        reputation: Some(0.9),
                    })
                    .collect(),
                topic: "AI tools adoption".into(),
                min_confidence: None,
            })
            .await
            .unwrap();

        assert_eq!(result.synthesized_memories.len(), 1);
        let insight = &result.synthesized_memories[0];
        assert_eq!(insight.source_memories, vec![shared.id.clone()]);
        assert_eq!(insight.contributing_agents.len(), 3);
        assert!((insight.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn synthesis_rejects_unknown_memories() {
        let (service, _, _) = service();
        let err = service
            .synthesize(SynthesizeRequest {
                agent_memories: vec![AgentContribution {
                    agent_id: "a".into(),
                    memories: vec!["mem_missing".into()],
                    reputation: None,
                }],
                topic: "anything".into(),
                min_confidence: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MEMORY_NOT_FOUND");
    }

    #[tokio::test]
    async fn agent_memories_respect_min_reputation() {
        let (service, provider, _) = service();
        service.register_agent(register("strong")).await.unwrap();
        service.register_agent(register("weak")).await.unwrap();
        provider
            .save_memories(&[
                contribution("strong", "solid finding", 1.0),
                contribution("strong", "another solid finding", 1.0),
                contribution("weak", "shaky finding", 0.1),
                contribution("unregistered", "orphan finding", 1.0),
            ])
            .await
            .unwrap();

        let all = service
            .get_agent_memories(AgentMemoriesQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].agent_id, "strong");

        let strong_only = service
            .get_agent_memories(AgentMemoriesQuery {
                min_reputation: Some(0.7),
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(strong_only.len(), 1);
        assert_eq!(strong_only[0].agent_id, "strong");
    }

    #[tokio::test]
    async fn comparison_ranks_and_explains() {
        let (service, provider, _) = service();
        service.register_agent(register("alpha")).await.unwrap();
        service.register_agent(register("beta")).await.unwrap();
        provider
            .save_memories(&[
                contribution("alpha", "one", 0.9),
                contribution("alpha", "two", 0.9),
                contribution("beta", "three", 0.6),
            ])
            .await
            .unwrap();

        let comparison = service
            .compare_agents(CompareRequest {
                agent_ids: vec!["beta".into(), "alpha".into()],
                metrics: vec![],
            })
            .await
            .unwrap();
        assert_eq!(comparison.top_performer.as_deref(), Some("alpha"));
        assert_eq!(comparison.agents[0].rank, 1);
        assert_eq!(comparison.agents[1].rank, 2);
        assert_eq!(comparison.metrics.len(), 3);
        assert!(comparison.insights.iter().any(|i| i.starts_with("alpha leads on total contributions")));

        let err = service
            .compare_agents(CompareRequest {
                agent_ids: vec!["alpha".into(), "ghost".into()],
                metrics: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AGENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn update_replaces_capabilities_and_merges_metadata() {
        let (service, _, _) = service();
        service.register_agent(register("web-researcher")).await.unwrap();
        let updated = service
            .update_agent(
                "web-researcher",
                UpdateAgentRequest {
                    capabilities: Some(vec!["real_time_monitoring".into()]),
                    metadata: Some(object(json!({"version": "2.0"}))),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.record.capabilities, vec!["real_time_monitoring"]);
        assert_eq!(updated.record.metadata["team"], "research");
        assert_eq!(updated.record.metadata["version"], "2.0");
    }
}
