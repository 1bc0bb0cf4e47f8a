use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};

use crate::AppState;
use crate::domain::Prediction;
use crate::domain::prediction::{FeedbackAck, FeedbackRequest, Metrics, Patterns, PredictRequest};
use crate::error::ApiResult;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/feedback", post(feedback))
        .route("/patterns", get(patterns))
        .route("/metrics", get(metrics))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<Prediction>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.metacognition.predict(req).await?))
}

async fn feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackAck>> {
    let Json(req) = payload?;
    Ok(Json(state.engine.metacognition.feedback(req).await?))
}

async fn patterns(State(state): State<AppState>) -> Json<Patterns> {
    Json(state.engine.metacognition.patterns())
}

async fn metrics(State(state): State<AppState>) -> Json<Metrics> {
    Json(state.engine.metacognition.metrics())
}
