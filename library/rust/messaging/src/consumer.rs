use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::MessagingError;
use crate::record::Record;

/// RecordStream は 1 パーティション分のレコードまたはトランスポートエラーのストリーム。
/// パーティション内の順序はブローカーが保証する順序のまま流れる。
pub type RecordStream = BoxStream<'static, Result<Record, MessagingError>>;

/// StartOffset は購読開始位置のポリシー。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    /// 保持されている最古のオフセットから読む
    #[default]
    Oldest,
    /// 購読開始以降に追記されたレコードのみ読む
    Latest,
}

/// PartitionSubscriber は単一パーティションの購読インターフェース。
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PartitionSubscriber: Send + Sync {
    /// 接続を確立してストリームを開く。ここでのエラーは呼び出し側にとって致命的。
    async fn subscribe(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<RecordStream, MessagingError>;
}
