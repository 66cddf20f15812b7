use std::borrow::Cow;

use serde::Serialize;

/// Record はブローカー上に保存される 1 件のメッセージを表す。
/// オフセットはコミット時にブローカーが採番する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// トピック名
    pub topic: String,
    /// パーティション番号
    pub partition: i32,
    /// パーティション内で単調増加するオフセット
    pub offset: i64,
    /// シリアライズ済みペイロード
    pub payload: Vec<u8>,
}

impl Record {
    /// ペイロードを UTF-8 文字列として返す（不正なバイト列は置換文字になる）。
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// PublishReceipt は publish 成功時にブローカーが返す保存位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub partition: i32,
    pub offset: i64,
}
