use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use application::{ConversationSummaryView, MessageView, Page};

use crate::{auth::CurrentUser, error::ApiError, state::AppState, stream};

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/{partner}/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/{partner}/read", post(mark_read))
        .route("/stream", get(stream::subscribe))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ConversationSummaryView>>, ApiError> {
    let request = state.page_policy.resolve(query.page, query.size);
    let conversations = state.service.list_conversations(&me, request).await?;
    Ok(Json(conversations))
}

async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(partner): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<MessageView>>, ApiError> {
    let request = state.page_policy.resolve(query.page, query.size);
    let page = state.service.list_messages(&me, &partner, request).await?;
    Ok(Json(page))
}

async fn send_message(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(partner): Path<String>,
    payload: Result<Json<SendMessagePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    let Json(payload) = payload?;
    let view = state.service.send(&me, &partner, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(partner): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.mark_read(&me, &partner).await?;
    Ok(StatusCode::NO_CONTENT)
}
