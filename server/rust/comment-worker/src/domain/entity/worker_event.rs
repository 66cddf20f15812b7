use std::fmt;

/// WorkerState はコンシューマーワーカーの状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// ブローカーに接続し、パーティションのストリームを開いている
    Connecting,
    /// レコード・トランスポートエラー・停止要求を待ち受けている
    Running,
    /// ループを抜け、完了通知を送ろうとしている
    Draining,
    /// 最終件数を報告済み
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Connecting => "connecting",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// DrainReason は Running を抜けた理由。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    ShutdownRequested,
    StreamClosed,
}

impl fmt::Display for DrainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainReason::ShutdownRequested => f.write_str("shutdown requested"),
            DrainReason::StreamClosed => f.write_str("stream closed"),
        }
    }
}

/// WorkerEvent はワーカーが観測用シンクへ送るイベント。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Connecting / Running / Draining への遷移。
    /// Terminated への遷移は `Terminated` イベントで表す。
    StateChanged(WorkerState),
    RecordReceived {
        topic: String,
        partition: i32,
        offset: i64,
        value: String,
        count: u64,
    },
    TransportError {
        topic: String,
        message: String,
    },
    Terminated {
        message_count: u64,
    },
}

/// WorkerReport は完了通知で返される最終結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub message_count: u64,
    pub reason: DrainReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_state_display() {
        assert_eq!(WorkerState::Connecting.to_string(), "connecting");
        assert_eq!(WorkerState::Terminated.to_string(), "terminated");
    }

    #[test]
    fn test_drain_reason_display() {
        assert_eq!(DrainReason::ShutdownRequested.to_string(), "shutdown requested");
        assert_eq!(DrainReason::StreamClosed.to_string(), "stream closed");
    }
}
