//! HTTP client for the RecallBricks API.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{
    error::{Error, Result},
    types::*,
};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787";

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// HTTP client for the API.
///
/// # Example
///
/// ```rust,no_run
/// use recallbricks::Client;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("rb_live_key")?.with_base_url("http://localhost:8787")?;
///
/// let memory = client.memories().create("User timezone is PST", json!({})).await?;
/// let fetched = client.memories().get(&memory.id).await?;
/// assert_eq!(fetched.content, memory.content);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for the default base URL.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key must not be empty".into()));
        }
        Ok(Self {
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            api_key,
            http: reqwest::Client::new(),
        })
    }

    /// Create a client from `RECALLBRICKS_API_KEY` and, optionally,
    /// `RECALLBRICKS_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("RECALLBRICKS_API_KEY")
            .map_err(|_| Error::Config("RECALLBRICKS_API_KEY is not set".into()))?;
        let client = Self::new(api_key)?;
        match std::env::var("RECALLBRICKS_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => client.with_base_url(&base_url),
            _ => Ok(client),
        }
    }

    /// Point the client at another server.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Url::parse(base_url.as_ref())?;
        Ok(self)
    }

    /// Use a custom reqwest client (timeouts, proxies, ...).
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Memory CRUD and search.
    pub fn memories(&self) -> MemoriesApi<'_> {
        MemoriesApi { client: self }
    }

    /// Predictions, feedback and learning introspection.
    pub fn metacognition(&self) -> MetacognitionApi<'_> {
        MetacognitionApi { client: self }
    }

    /// Agents, reputation and synthesis.
    pub fn collaboration(&self) -> CollaborationApi<'_> {
        CollaborationApi { client: self }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Endpoint URL under the API prefix. Segments are percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Config(format!("base URL {} cannot have a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .bearer_auth(&self.api_key))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Error::Api {
                status: status.as_u16(),
                code: Some(body.error.code),
                message: body.error.message,
            },
            Err(_) => Error::Api {
                status: status.as_u16(),
                code: None,
                message: if text.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    text
                },
            },
        }
    }
}

// =============================================================================
// Memories API
// =============================================================================

#[derive(Debug)]
pub struct MemoriesApi<'a> {
    client: &'a Client,
}

impl MemoriesApi<'_> {
    /// Store a memory. `metadata` must be a JSON object.
    pub async fn create(&self, content: impl Into<String>, metadata: Value) -> Result<Memory> {
        let body = CreateMemory::new(content, metadata);
        Client::send(self.client.request(Method::POST, &["memories"])?.json(&body)).await
    }

    /// Store up to 100 memories at once. Nothing is stored if any item is
    /// invalid.
    pub async fn create_batch(&self, memories: Vec<CreateMemory>) -> Result<Vec<Memory>> {
        let body = BatchCreate { memories };
        Client::send(
            self.client
                .request(Method::POST, &["memories", "batch"])?
                .json(&body),
        )
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Memory> {
        Client::send(self.client.request(Method::GET, &["memories", id])?).await
    }

    /// Apply a partial update.
    pub async fn update(&self, id: &str, update: UpdateMemory) -> Result<Memory> {
        Client::send(
            self.client
                .request(Method::PATCH, &["memories", id])?
                .json(&update),
        )
        .await
    }

    /// Delete a memory. Deleting an unknown id is a not-found error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .request(Method::DELETE, &["memories", id])?
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Client::api_error(response).await)
        }
    }

    pub async fn list(&self, options: ListOptions) -> Result<MemoryPage> {
        Client::send(
            self.client
                .request(Method::GET, &["memories"])?
                .query(&options.to_query()),
        )
        .await
    }

    /// Weighted search, best match first.
    pub async fn search(
        &self,
        query: impl Into<String>,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let body = SearchBody {
            query: query.into(),
            options,
        };
        Client::send(
            self.client
                .request(Method::POST, &["memories", "search"])?
                .json(&body),
        )
        .await
    }
}

// =============================================================================
// Metacognition API
// =============================================================================

#[derive(Debug)]
pub struct MetacognitionApi<'a> {
    client: &'a Client,
}

impl MetacognitionApi<'_> {
    /// Ask which memories are likely relevant to `context`.
    pub async fn predict(
        &self,
        context: impl Into<String>,
        options: PredictOptions,
    ) -> Result<Prediction> {
        let body = PredictBody {
            context: context.into(),
            options,
        };
        Client::send(
            self.client
                .request(Method::POST, &["metacognition", "predict"])?
                .json(&body),
        )
        .await
    }

    /// Report whether a prediction helped and which memories were used.
    pub async fn feedback(
        &self,
        prediction_id: &str,
        useful: bool,
        used_memories: Vec<String>,
    ) -> Result<FeedbackAck> {
        let body = FeedbackBody {
            prediction_id: prediction_id.to_string(),
            useful,
            used_memories,
        };
        Client::send(
            self.client
                .request(Method::POST, &["metacognition", "feedback"])?
                .json(&body),
        )
        .await
    }

    pub async fn get_patterns(&self) -> Result<Patterns> {
        Client::send(
            self.client
                .request(Method::GET, &["metacognition", "patterns"])?,
        )
        .await
    }

    pub async fn get_metrics(&self) -> Result<Metrics> {
        Client::send(self.client.request(Method::GET, &["metacognition", "metrics"])?).await
    }
}

// =============================================================================
// Collaboration API
// =============================================================================

#[derive(Debug)]
pub struct CollaborationApi<'a> {
    client: &'a Client,
}

impl CollaborationApi<'_> {
    /// Register an agent, or update it if the id already exists.
    pub async fn register_agent(&self, agent: RegisterAgent) -> Result<Agent> {
        Client::send(
            self.client
                .request(Method::POST, &["collaboration", "agents"])?
                .json(&agent),
        )
        .await
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent> {
        Client::send(
            self.client
                .request(Method::GET, &["collaboration", "agents", agent_id])?,
        )
        .await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        Client::send(self.client.request(Method::GET, &["collaboration", "agents"])?).await
    }

    /// Replace capabilities and/or merge metadata.
    pub async fn update_agent(&self, agent_id: &str, update: UpdateAgent) -> Result<Agent> {
        Client::send(
            self.client
                .request(Method::PATCH, &["collaboration", "agents", agent_id])?
                .json(&update),
        )
        .await
    }

    pub async fn get_reputation(&self, agent_id: &str) -> Result<Reputation> {
        Client::send(self.client.request(
            Method::GET,
            &["collaboration", "agents", agent_id, "reputation"],
        )?)
        .await
    }

    /// Merge several agents' memories into reputation-weighted insights.
    pub async fn synthesize(
        &self,
        agent_memories: Vec<AgentContribution>,
        topic: impl Into<String>,
        min_confidence: Option<f64>,
    ) -> Result<SynthesisResult> {
        let body = SynthesizeBody {
            agent_memories,
            topic: topic.into(),
            min_confidence,
        };
        Client::send(
            self.client
                .request(Method::POST, &["collaboration", "synthesize"])?
                .json(&body),
        )
        .await
    }

    /// Memories from agents at or above `min_reputation`.
    pub async fn get_agent_memories(
        &self,
        min_reputation: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<AgentMemory>> {
        let mut query = Vec::new();
        if let Some(min) = min_reputation {
            query.push(("min_reputation", min.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        Client::send(
            self.client
                .request(Method::GET, &["collaboration", "memories"])?
                .query(&query),
        )
        .await
    }

    /// Rank agents on `metrics` (all metrics when empty).
    pub async fn compare_agents<I, S>(&self, agent_ids: I, metrics: &[&str]) -> Result<AgentComparison>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body = CompareBody {
            agent_ids: agent_ids.into_iter().map(Into::into).collect(),
            metrics: metrics.iter().map(ToString::to_string).collect(),
        };
        Client::send(
            self.client
                .request(Method::POST, &["collaboration", "compare"])?
                .json(&body),
        )
        .await
    }
}
