use async_trait::async_trait;

use crate::error::MessagingError;
use crate::record::PublishReceipt;

/// RecordPublisher は確認応答付きの同期 publish インターフェース。
///
/// 実装は `Send + Sync` であり、1 つのハンドルを複数リクエストから同時に
/// 呼び出せなければならない。呼び出し側から見ると各呼び出しは独立した
/// 1 往復で、設定した確認応答レベルに達するかリトライ予算を使い切るまで戻らない。
///
/// リトライ中に確認応答だけが失われた場合、同じ内容のレコードが
/// 重複して追記されることがある（at-least-once）。
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// payload を topic に追記し、保存位置を返す。
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishReceipt, MessagingError>;

    /// 送信待ちのメッセージを配信し切る（シャットダウン時に使用）。
    async fn flush(&self) -> Result<(), MessagingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_publisher_receipt() {
        let mut mock = MockRecordPublisher::new();
        mock.expect_publish()
            .withf(|topic, payload| topic.to_string() == "comments" && payload.to_vec() == b"{}".to_vec())
            .returning(|_, _| {
                Ok(PublishReceipt {
                    partition: 0,
                    offset: 41,
                })
            });

        let receipt = mock.publish("comments", b"{}").await.unwrap();
        assert_eq!(receipt.offset, 41);
    }

    #[tokio::test]
    async fn test_mock_publisher_error() {
        let mut mock = MockRecordPublisher::new();
        mock.expect_publish()
            .returning(|_, _| Err(MessagingError::Publish("broker unavailable".to_string())));

        let result = mock.publish("comments", b"{}").await;
        assert!(matches!(result, Err(MessagingError::Publish(_))));
    }
}
