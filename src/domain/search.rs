use serde::{Deserialize, Serialize};

use super::memory::{Memory, Metadata};

/// Blend between semantic similarity and recency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
    pub semantic: f64,
    pub recency: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            recency: 0.3,
        }
    }
}

impl SearchWeights {
    /// Scale the pair so it sums to one. Returns `None` for negative,
    /// non-finite or all-zero weights.
    pub fn normalized(self) -> Option<Self> {
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        if !valid(self.semantic) || !valid(self.recency) {
            return None;
        }
        let sum = self.semantic + self.recency;
        (sum > 0.0).then(|| Self {
            semantic: self.semantic / sum,
            recency: self.recency / sum,
        })
    }

    /// Round both weights to two decimals, keeping the pair summing to one.
    pub fn rounded(self) -> Self {
        let semantic = (self.semantic * 100.0).round() / 100.0;
        Self {
            semantic,
            recency: ((1.0 - semantic) * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub weights: Option<SearchWeights>,
    /// Exact-match metadata filter.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub min_score: Option<f64>,
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
// Listing
// =============================================================================

/// Sort order accepted by the list endpoint (`-` prefix means descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    CreatedAsc,
    #[default]
    CreatedDesc,
    UpdatedAsc,
    UpdatedDesc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "+createdAt" => Ok(Self::CreatedAsc),
            "-createdAt" => Ok(Self::CreatedDesc),
            "updatedAt" | "+updatedAt" => Ok(Self::UpdatedAsc),
            "-updatedAt" => Ok(Self::UpdatedDesc),
            other => Err(format!(
                "unsupported sort '{other}', expected one of createdAt, -createdAt, updatedAt, -updatedAt"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(total: usize, page: usize, limit: usize) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
