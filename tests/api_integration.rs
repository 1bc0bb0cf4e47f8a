//! End-to-end tests of the `/api/v1` contract against the in-memory server.

use axum::http::StatusCode;
use axum_test::TestServer;
use recallbricks_local::{
    config::AppConfig,
    server::{build_app, build_state},
};
use serde_json::{Value, json};
use std::sync::Arc;

// =============================================================================
// Test Utilities
// =============================================================================

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.resilience.rate_limit_enabled = false;
    config
}

fn server_with(config: AppConfig) -> TestServer {
    let app = build_app(build_state(Arc::new(config)));
    TestServer::new(app).expect("failed to start test server")
}

fn server() -> TestServer {
    server_with(test_config())
}

async fn create_memory(server: &TestServer, content: &str, metadata: Value) -> Value {
    let response = server
        .post("/api/v1/memories")
        .json(&json!({ "content": content, "metadata": metadata }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

// =============================================================================
// Memory Store
// =============================================================================

#[tokio::test]
async fn created_memory_can_be_fetched_unchanged() {
    let server = server();
    let created = create_memory(
        &server,
        "User prefers dark mode interface",
        json!({"category": "user_preferences", "importance": "high"}),
    )
    .await;

    let id = created["id"].as_str().unwrap();
    let fetched = server
        .get(&format!("/api/v1/memories/{id}"))
        .await
        .json::<Value>();

    assert_eq!(fetched["content"], "User prefers dark mode interface");
    assert_eq!(fetched["metadata"], created["metadata"]);
    assert!(fetched["created_at"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn update_preserves_fields_not_provided() {
    let server = server();
    let created = create_memory(
        &server,
        "User timezone is PST",
        json!({"category": "user_preferences", "importance": "medium"}),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let updated = server
        .patch(&format!("/api/v1/memories/{id}"))
        .json(&json!({"metadata": {"importance": "critical"}}))
        .await
        .json::<Value>();

    assert_eq!(updated["content"], "User timezone is PST");
    assert_eq!(updated["metadata"]["category"], "user_preferences");
    assert_eq!(updated["metadata"]["importance"], "critical");
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn deleted_memory_is_not_found() {
    let server = server();
    let created = create_memory(&server, "Temporary note", json!({})).await;
    let path = format!("/api/v1/memories/{}", created["id"].as_str().unwrap());

    server
        .delete(&path)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let missing = server.get(&path).await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&missing.json::<Value>()), "MEMORY_NOT_FOUND");

    let again = server.delete(&path).await;
    again.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_pagination_is_consistent() {
    let server = server();
    let items: Vec<Value> = (0..7)
        .map(|i| json!({"content": format!("Conversation turn {i}"), "metadata": {"turn": i}}))
        .collect();
    server
        .post("/api/v1/memories/batch")
        .json(&json!({ "memories": items }))
        .await
        .assert_status(StatusCode::CREATED);

    for page in 1..=4 {
        let body = server
            .get("/api/v1/memories")
            .add_query_param("page", page)
            .add_query_param("limit", 3)
            .add_query_param("sort", "-createdAt")
            .await
            .json::<Value>();
        let data = body["data"].as_array().unwrap();
        let pagination = &body["pagination"];
        assert!(3 * page >= data.len());
        assert_eq!(pagination["total"], 7);
        assert_eq!(pagination["totalPages"], 3);
        if page == 4 {
            assert!(data.is_empty());
        }
    }
}

#[tokio::test]
async fn invalid_batch_writes_nothing() {
    let server = server();
    let response = server
        .post("/api/v1/memories/batch")
        .json(&json!({"memories": [{"content": "ok"}, {"content": "  "}]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "VALIDATION_ERROR");

    let body = server.get("/api/v1/memories").await.json::<Value>();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let server = server();
    let response = server
        .post("/api/v1/memories")
        .json(&json!({"metadata": {}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().is_some());
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn search_results_are_sorted_and_thresholded() {
    let server = server();
    for content in [
        "API authentication uses Bearer tokens",
        "Comprehensive guide to API authentication",
        "User viewed pricing page",
        "Rate limits are 1000 requests per hour",
    ] {
        create_memory(&server, content, json!({})).await;
    }

    let results = server
        .post("/api/v1/memories/search")
        .json(&json!({
            "query": "API authentication",
            "limit": 10,
            "weights": {"semantic": 0.7, "recency": 0.3}
        }))
        .await
        .json::<Vec<Value>>();
    let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(results[0]["content"].as_str().unwrap().contains("authentication"));

    let strict = server
        .post("/api/v1/memories/search")
        .json(&json!({"query": "API authentication", "min_score": 0.7}))
        .await
        .json::<Vec<Value>>();
    assert!(!strict.is_empty());
    assert!(strict.iter().all(|r| r["score"].as_f64().unwrap() >= 0.7));
    assert!(strict.len() < results.len());
}

#[tokio::test]
async fn search_rejects_degenerate_weights() {
    let server = server();
    let response = server
        .post("/api/v1/memories/search")
        .json(&json!({"query": "x", "weights": {"semantic": 0.0, "recency": 0.0}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// Metacognition
// =============================================================================

#[tokio::test]
async fn prediction_feedback_and_introspection() {
    let server = server();
    create_memory(&server, "API authentication uses Bearer tokens", json!({})).await;
    create_memory(&server, "API rate limits are 1000 requests/hour", json!({})).await;

    let prediction = server
        .post("/api/v1/metacognition/predict")
        .json(&json!({"context": "User is asking about API authentication"}))
        .await
        .json::<Value>();
    let confidence = prediction["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!(prediction["suggested_strategy"]["weights"]["semantic"].is_number());
    let suggestions = prediction["suggested_memories"].as_array().unwrap();
    assert!(!suggestions.is_empty());

    let used = suggestions[0]["id"].clone();
    server
        .post("/api/v1/metacognition/feedback")
        .json(&json!({
            "prediction_id": prediction["id"],
            "useful": true,
            "used_memories": [used]
        }))
        .await
        .assert_status_ok();

    let unknown = server
        .post("/api/v1/metacognition/feedback")
        .json(&json!({"prediction_id": "pred_missing", "useful": false}))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&unknown.json::<Value>()), "PREDICTION_NOT_FOUND");

    let patterns = server
        .get("/api/v1/metacognition/patterns")
        .await
        .json::<Value>();
    assert_eq!(patterns["query_patterns"]["total_queries"], 1);
    assert!(patterns["query_patterns"]["most_queried"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "api"));

    let metrics = server
        .get("/api/v1/metacognition/metrics")
        .await
        .json::<Value>();
    let level = metrics["learning_progress"]["confidence_level"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&level));
    assert!(metrics["optimization_gains"]["cache_efficiency"]
        .as_str()
        .unwrap()
        .ends_with('%'));
}

// =============================================================================
// Collaboration
// =============================================================================

#[tokio::test]
async fn agents_reputation_synthesis_and_comparison() {
    let server = server();
    for (agent, role) in [("web-researcher", "research"), ("data-analyst", "analysis")] {
        let agent = server
            .post("/api/v1/collaboration/agents")
            .json(&json!({"agent_id": agent, "role": role, "capabilities": ["web_search"]}))
            .await
            .json::<Value>();
        assert_eq!(agent["reputation_score"], 0.5);
    }

    let web = create_memory(
        &server,
        "Study shows 73% of developers use AI coding tools",
        json!({"agentId": "web-researcher", "confidence": 0.95}),
    )
    .await;
    let data = create_memory(
        &server,
        "Internal survey: 68% of users adopted AI coding tools",
        json!({"agentId": "data-analyst", "confidence": 0.92}),
    )
    .await;

    let reputation = server
        .get("/api/v1/collaboration/agents/web-researcher/reputation")
        .await
        .json::<Value>();
    let score = reputation["reputation_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert_eq!(reputation["total_contributions"], 1);

    let synthesis = server
        .post("/api/v1/collaboration/synthesize")
        .json(&json!({
            "agent_memories": [
                {"agent_id": "web-researcher", "memories": [web["id"]], "reputation": 0.94},
                {"agent_id": "data-analyst", "memories": [data["id"]], "reputation": 0.91}
            ],
            "topic": "AI developer tools adoption",
            "min_confidence": 0.5
        }))
        .await
        .json::<Value>();
    let aggregate = synthesis["aggregate_confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&aggregate));
    assert_eq!(synthesis["top_contributors"].as_array().unwrap().len(), 2);

    let comparison = server
        .post("/api/v1/collaboration/compare")
        .json(&json!({
            "agent_ids": ["web-researcher", "data-analyst"],
            "metrics": ["reputation_score", "total_contributions", "average_confidence"]
        }))
        .await
        .json::<Value>();
    assert_eq!(comparison["agents"][0]["rank"], 1);
    assert_eq!(comparison["top_performer"], comparison["agents"][0]["agent_id"]);

    let bad_metric = server
        .post("/api/v1/collaboration/compare")
        .json(&json!({"agent_ids": ["web-researcher"], "metrics": ["vibes"]}))
        .await;
    bad_metric.assert_status(StatusCode::BAD_REQUEST);

    let missing = server
        .get("/api/v1/collaboration/agents/ghost/reputation")
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&missing.json::<Value>()), "AGENT_NOT_FOUND");

    let filtered = server
        .get("/api/v1/collaboration/memories")
        .add_query_param("min_reputation", 0.0)
        .add_query_param("limit", 5)
        .await
        .json::<Vec<Value>>();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|m| m["agent_reputation"].as_f64().unwrap() <= 1.0));
}

// =============================================================================
// Security & Resilience
// =============================================================================

#[tokio::test]
async fn configured_api_keys_are_enforced() {
    let mut config = test_config();
    config.security.auth_required = true;
    config.security.api_keys = vec!["rb_test_key".to_string()];
    let server = server_with(config);

    let anonymous = server.get("/api/v1/memories").await;
    anonymous.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&anonymous.json::<Value>()), "UNAUTHORIZED");

    server
        .get("/api/v1/memories")
        .authorization_bearer("rb_wrong_key")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/v1/memories")
        .authorization_bearer("rb_test_key")
        .await
        .assert_status_ok();

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn rate_limit_returns_429() {
    let mut config = AppConfig::default();
    config.resilience.requests_per_second = 1;
    config.resilience.burst_size = 2;
    let server = server_with(config);

    server.get("/api/v1/memories").await.assert_status_ok();
    server.get("/api/v1/memories").await.assert_status_ok();
    let limited = server.get("/api/v1/memories").await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&limited.json::<Value>()), "RATE_LIMITED");
}
