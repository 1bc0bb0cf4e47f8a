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
use crate::domain::Memory;
use crate::domain::SearchResult;
use crate::domain::search::{ListQuery, Page, SearchRequest};
use crate::engine::store::{BatchCreateRequest, CreateMemoryRequest, UpdateMemoryRequest};
use crate::error::ApiResult;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_memories).post(create_memory))
        .route("/batch", post(create_batch))
        .route("/search", post(search_memories))
        .route(
            "/{id}",
            get(get_memory).patch(update_memory).delete(delete_memory),
        )
}

/// POST /memories
async fn create_memory(
    State(state): State<AppState>,
    payload: Result<Json<CreateMemoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Memory>)> {
    let Json(req) = payload?;
    let memory = state.engine.memories.create(req).await?;
    Ok((StatusCode::CREATED, Json(memory)))
}

/// POST /memories/batch
async fn create_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchCreateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<Memory>>)> {
    let Json(req) = payload?;
    let memories = state.engine.memories.create_batch(req).await?;
    Ok((StatusCode::CREATED, Json(memories)))
}

/// GET /memories?page&limit&sort
async fn list_memories(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Memory>>> {
    let Query(query) = query?;
    Ok(Json(state.engine.memories.list(query).await?))
}

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Memory>> {
    Ok(Json(state.engine.memories.get(&id).await?))
}

async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMemoryRequest>, JsonRejection>,
) -> ApiResult<Json<Memory>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.memories.update(&id, req).await?))
}

async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.engine.memories.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /memories/search
async fn search_memories(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.search.search(req).await?))
}
