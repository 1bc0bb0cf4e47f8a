use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};

use crate::AppState;
use crate::domain::Agent;
use crate::domain::agent::{
    AgentComparison, AgentMemoriesQuery, AgentMemory, CompareRequest, RegisterAgentRequest,
    Reputation, SynthesisResult, SynthesizeRequest, UpdateAgentRequest,
};
use crate::error::ApiResult;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_agents).post(register_agent))
        .route("/agents/{id}", get(get_agent).patch(update_agent))
        .route("/agents/{id}/reputation", get(get_reputation))
        .route("/synthesize", post(synthesize))
        .route("/memories", get(agent_memories))
        .route("/compare", post(compare_agents))
}

// =============================================================================
// Agents
// =============================================================================

/// POST /agents - register or re-register an agent
async fn register_agent(
    State(state): State<AppState>,
    payload: Result<Json<RegisterAgentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let Json(req) = payload?;
    let agent = state.engine.collaboration.register_agent(req).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<Agent>>> {
    Ok(Json(state.engine.collaboration.list_agents().await?))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.engine.collaboration.get_agent(&id).await?))
}

async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAgentRequest>, JsonRejection>,
) -> ApiResult<Json<Agent>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.collaboration.update_agent(&id, req).await?))
}

async fn get_reputation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Reputation>> {
    Ok(Json(state.engine.collaboration.get_reputation(&id).await?))
}

// =============================================================================
// Knowledge
// =============================================================================

async fn synthesize(
    State(state): State<AppState>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> ApiResult<Json<SynthesisResult>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.collaboration.synthesize(req).await?))
}

/// GET /memories?min_reputation&limit
async fn agent_memories(
    State(state): State<AppState>,
    query: Result<Query<AgentMemoriesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AgentMemory>>> {
    let Query(query) = query?;
    Ok(Json(state.engine.collaboration.get_agent_memories(query).await?))
}

async fn compare_agents(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<Json<AgentComparison>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.collaboration.compare_agents(req).await?))
}
