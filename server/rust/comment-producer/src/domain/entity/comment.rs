use serde::{Deserialize, Serialize};

/// Comment は投稿されたコメント 1 件を表す。
/// リクエストボディから生成され、publish 1 回分の間だけ存在する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
