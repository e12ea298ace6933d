//! 实时推送端点（SSE）
//!
//! 浏览器的 EventSource 不能附加自定义请求头，因此同时接受查询参数中的 token。
//! 客户端断开时 axum 丢弃响应流，连接随之从注册表注销。

use std::convert::Infallible;

use application::LiveFrame;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{future, Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{auth::bearer_token, error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    token: Option<String>,
}

pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let connection = state
        .service
        .subscribe(query.token.as_deref(), bearer_token(&headers))
        .await?;
    info!(user_id = %connection.user_id(), connection_id = %connection.id(), "live stream opened");

    let events = connection
        .into_stream()
        .filter_map(|frame| future::ready(frame_to_event(&frame)))
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

fn frame_to_event(frame: &LiveFrame) -> Option<Event> {
    match frame.data() {
        Ok(data) => Some(Event::default().event(frame.event_name()).data(data)),
        Err(err) => {
            warn!(error = %err, "failed to encode live frame");
            None
        }
    }
}
