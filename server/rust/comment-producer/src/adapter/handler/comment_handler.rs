use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::{Form, Json};
use serde::Serialize;

use super::error::CommentError;
use super::AppState;
use crate::domain::entity::Comment;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";
const TEXT_FIELD: &str = "text";

/// BodyFormat は Content-Type から判定したボディ形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
    Multipart,
}

impl BodyFormat {
    fn of(req: &Request) -> Self {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with(FORM_CONTENT_TYPE) {
            Self::Form
        } else if content_type.starts_with(MULTIPART_CONTENT_TYPE) {
            Self::Multipart
        } else {
            Self::Json
        }
    }
}

/// CommentPayload は JSON・フォーム・multipart のボディから Comment を取り出す extractor。
///
/// Content-Type がフォームまたは multipart ならその形式で、それ以外は JSON として解釈する。
/// 失敗時（ボディ上限超過を含む）は axum のリジェクション文言を持つ
/// `CommentError::Decode` を返す。
pub struct CommentPayload(pub Comment);

impl<S> FromRequest<S> for CommentPayload
where
    S: Send + Sync,
{
    type Rejection = CommentError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let decoded = match BodyFormat::of(&req) {
            BodyFormat::Form => Form::<Comment>::from_request(req, state)
                .await
                .map(|Form(comment)| comment)
                .map_err(|e| e.body_text()),
            BodyFormat::Multipart => comment_from_multipart(req, state).await,
            BodyFormat::Json => Json::<Comment>::from_request(req, state)
                .await
                .map(|Json(comment)| comment)
                .map_err(|e| e.body_text()),
        };

        decoded.map(CommentPayload).map_err(|message| {
            tracing::debug!(error = %message, "rejected comment payload");
            CommentError::Decode(message)
        })
    }
}

/// multipart ボディから `text` フィールドを探す。他のフィールドは読み捨てる。
async fn comment_from_multipart<S>(req: Request, state: &S) -> Result<Comment, String>
where
    S: Send + Sync,
{
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| e.body_text())?;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        if field.name() == Some(TEXT_FIELD) {
            let text = field.text().await.map_err(|e| e.body_text())?;
            return Ok(Comment::new(text));
        }
    }
    Err(format!("missing multipart field `{TEXT_FIELD}`"))
}

/// CommentResponse はコメント投稿 API のレスポンスボディ。
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

impl CommentResponse {
    pub fn pushed(comment: Comment) -> Self {
        Self {
            success: true,
            message: "Comment pushed successfully".to_string(),
            comment: Some(comment),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            comment: None,
        }
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.gather_metrics()
}

/// POST /api/v1/comments
///
/// publish の確認応答（またはリトライ上限到達）までこのリクエストのタスクで待つ。
pub async fn push_comment(
    State(state): State<AppState>,
    CommentPayload(comment): CommentPayload,
) -> Result<Json<CommentResponse>, CommentError> {
    state.push_comment_uc.execute(&comment).await?;
    Ok(Json(CommentResponse::pushed(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pushed_response_shape() {
        let body = serde_json::to_string(&CommentResponse::pushed(Comment::new("hello"))).unwrap();
        assert_eq!(
            body,
            r#"{"success":true,"message":"Comment pushed successfully","comment":{"text":"hello"}}"#
        );
    }

    #[test]
    fn test_failure_response_omits_comment() {
        let body = serde_json::to_string(&CommentResponse::failure("Error pushing to queue")).unwrap();
        assert_eq!(body, r#"{"success":false,"message":"Error pushing to queue"}"#);
    }

    #[tokio::test]
    async fn test_extract_json_payload() {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let CommentPayload(comment) = CommentPayload::from_request(req, &()).await.unwrap();
        assert_eq!(comment, Comment::new("hi"));
    }

    #[tokio::test]
    async fn test_extract_form_payload() {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(axum::body::Body::from("text=hello+world%21"))
            .unwrap();
        let CommentPayload(comment) = CommentPayload::from_request(req, &()).await.unwrap();
        assert_eq!(comment.text, "hello world!");
    }

    #[tokio::test]
    async fn test_extract_empty_body_is_decode_error() {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::empty())
            .unwrap();
        let result = CommentPayload::from_request(req, &()).await;
        assert!(matches!(result, Err(CommentError::Decode(ref msg)) if !msg.is_empty()));
    }

    #[tokio::test]
    async fn test_extract_without_content_type_is_decode_error() {
        let req = Request::builder()
            .method("POST")
            .body(axum::body::Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let result = CommentPayload::from_request(req, &()).await;
        assert!(matches!(result, Err(CommentError::Decode(_))));
    }

    fn multipart_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X-COMMENT")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extract_multipart_payload() {
        let body = "--X-COMMENT\r\n\
            Content-Disposition: form-data; name=\"author\"\r\n\r\n\
            someone\r\n\
            --X-COMMENT\r\n\
            Content-Disposition: form-data; name=\"text\"\r\n\r\n\
            hello multipart\r\n\
            --X-COMMENT--\r\n";
        let CommentPayload(comment) = CommentPayload::from_request(multipart_request(body), &())
            .await
            .unwrap();
        assert_eq!(comment, Comment::new("hello multipart"));
    }

    #[tokio::test]
    async fn test_extract_multipart_without_text_field_is_decode_error() {
        let body = "--X-COMMENT\r\n\
            Content-Disposition: form-data; name=\"body\"\r\n\r\n\
            hello\r\n\
            --X-COMMENT--\r\n";
        let result = CommentPayload::from_request(multipart_request(body), &()).await;
        assert!(matches!(result, Err(CommentError::Decode(ref msg)) if msg.contains("text")));
    }

    #[test]
    fn test_body_format_from_content_type() {
        let with_type = |ct: &str| {
            Request::builder()
                .header(header::CONTENT_TYPE, ct)
                .body(axum::body::Body::empty())
                .unwrap()
        };
        assert_eq!(BodyFormat::of(&with_type("application/json")), BodyFormat::Json);
        assert_eq!(
            BodyFormat::of(&with_type("application/x-www-form-urlencoded")),
            BodyFormat::Form
        );
        assert_eq!(
            BodyFormat::of(&with_type("multipart/form-data; boundary=b")),
            BodyFormat::Multipart
        );
        let bare = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(BodyFormat::of(&bare), BodyFormat::Json);
    }
}
