use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::memory::{Memory, Metadata};

/// Stored agent definition. Reputation is derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub role: String,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationTier {
    Novice,
    Contributor,
    Trusted,
    Expert,
}

impl ReputationTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Expert
        } else if score >= 0.75 {
            Self::Trusted
        } else if score >= 0.5 {
            Self::Contributor
        } else {
            Self::Novice
        }
    }
}

impl std::fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Novice => "novice",
            Self::Contributor => "contributor",
            Self::Trusted => "trusted",
            Self::Expert => "expert",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    #[serde(flatten)]
    pub record: AgentRecord,
    pub reputation_score: f64,
    pub tier: ReputationTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgentRequest {
    pub agent_id: String,
    pub role: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentRequest {
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    pub agent_id: String,
    pub reputation_score: f64,
    pub tier: ReputationTier,
    pub total_contributions: usize,
    pub average_confidence: f64,
}

// =============================================================================
// Synthesis
// =============================================================================

/// One agent's share of the input to a synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContribution {
    pub agent_id: String,
    pub memories: Vec<String>,
    /// Overrides the agent's computed reputation for this synthesis.
    #[serde(default)]
    pub reputation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub agent_memories: Vec<AgentContribution>,
    pub topic: String,
    #[serde(default)]
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

// =============================================================================
// Filtering & comparison
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentMemoriesQuery {
    pub min_reputation: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub agent_id: String,
    pub agent_reputation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    ReputationScore,
    TotalContributions,
    AverageConfidence,
}

impl ComparisonMetric {
    pub const ALL: [Self; 3] = [
        Self::ReputationScore,
        Self::TotalContributions,
        Self::AverageConfidence,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ReputationScore => "reputation score",
            Self::TotalContributions => "total contributions",
            Self::AverageConfidence => "average confidence",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub agent_ids: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<ComparisonMetric>,
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
    pub metrics: Vec<ComparisonMetric>,
    pub top_performer: Option<String>,
    pub insights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(ReputationTier::from_score(0.95), ReputationTier::Expert);
        assert_eq!(ReputationTier::from_score(0.9), ReputationTier::Expert);
        assert_eq!(ReputationTier::from_score(0.8), ReputationTier::Trusted);
        assert_eq!(ReputationTier::from_score(0.5), ReputationTier::Contributor);
        assert_eq!(ReputationTier::from_score(0.2), ReputationTier::Novice);
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&ReputationTier::Trusted).unwrap();
        assert_eq!(json, "\"trusted\"");
    }
}
