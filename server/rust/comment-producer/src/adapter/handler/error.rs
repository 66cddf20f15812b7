use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::comment_handler::CommentResponse;
use crate::usecase::PushCommentError;

/// CommentError はコメント投稿 API のエラー型。
///
/// Decode はクライアント起因でメッセージをそのまま返す。
/// それ以外はサーバー起因で、詳細はログにのみ残し固定文言を返す。
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("{0}")]
    Decode(String),

    #[error("Error processing comment data")]
    Processing,

    #[error("Error pushing to queue")]
    Queue,
}

impl From<PushCommentError> for CommentError {
    fn from(err: PushCommentError) -> Self {
        match err {
            PushCommentError::Serialization(_) => CommentError::Processing,
            PushCommentError::Publish(_) => CommentError::Queue,
        }
    }
}

impl CommentError {
    pub fn status(&self) -> StatusCode {
        match self {
            CommentError::Decode(_) => StatusCode::BAD_REQUEST,
            CommentError::Processing | CommentError::Queue => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CommentError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = CommentResponse::failure(self.to_string());
        (status, Json(body)).into_response()
    }
}
