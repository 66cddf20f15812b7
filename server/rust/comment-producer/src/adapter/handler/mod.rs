pub mod comment_handler;
pub mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use comments_telemetry::Metrics;

use crate::usecase::PushCommentUseCase;

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub push_comment_uc: Arc<PushCommentUseCase>,
    pub metrics: Arc<Metrics>,
    /// リクエストボディの上限バイト数
    pub max_body_bytes: usize,
}

/// ルーターに登録しているパス。メトリクスの path ラベルに使う。
pub const ROUTES: &[&str] = &["/healthz", "/readyz", "/metrics", "/api/v1/comments"];

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/healthz", get(comment_handler::healthz))
        .route("/readyz", get(comment_handler::readyz))
        .route("/metrics", get(comment_handler::metrics))
        .route("/api/v1/comments", post(comment_handler::push_comment))
        // 上限超過は CommentPayload のリジェクションとして 400 JSON で返す
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
