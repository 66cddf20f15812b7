/// MessagingError はブローカー操作に関するエラーを表す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 起動時の接続・購読開始の失敗。呼び出し側にとって致命的。
    #[error("connection error: {0}")]
    Connection(String),

    /// リトライ予算を使い切った publish の失敗。
    #[error("publish error: {0}")]
    Publish(String),

    /// 購読中のトランスポートエラー。ストリームは継続する。
    #[error("transport error: {0}")]
    Transport(String),
}
