/// ConsumptionProgress は 1 プロセス内で受信したレコード数を保持する。
///
/// 書き込むのはイベントループだけなので同期は不要。永続化はせず、
/// 再起動すると 0 から数え直す。
#[derive(Debug, Default)]
pub struct ConsumptionProgress {
    message_count: u64,
}

impl ConsumptionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 件受信したことを記録し、更新後の件数を返す。
    pub fn record(&mut self) -> u64 {
        self.message_count += 1;
        self.message_count
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }
}
