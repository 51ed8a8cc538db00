//! 错误类型
//!
//! 配置错误会以 `Err` 返回给调用方；接收端的拒收原因（[`Rejection`]）只是本地可恢复的状态，
//! 由发送端的超时重传兜底，不会作为错误向外传播。

use thiserror::Error;

/// 构造仿真时的参数错误。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("chunk_size must be at least 1")]
    ZeroChunkSize,
    #[error("window_size must be at least 1")]
    ZeroWindow,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("iteration budget must be at least 1")]
    ZeroBudget,
    /// 概率参数必须落在 `[0.0, 1.0]`（NaN 也会被拒绝）
    #[error("{name} must be in [0.0, 1.0], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("invalid config json: {0}")]
    Parse(String),
}

/// 接收端拒收一个数据包的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// 载荷与创建时的摘要不一致（传输途中被损坏）
    #[error("integrity check failed for packet {seq}")]
    IntegrityFailure { seq: u64 },
    /// 序号落在接收窗口之外
    #[error("packet {seq} outside receive window [{base}, {base}+{window})")]
    OutOfWindow { seq: u64, base: u64, window: usize },
}

impl Rejection {
    pub fn seq(&self) -> u64 {
        match *self {
            Rejection::IntegrityFailure { seq } | Rejection::OutOfWindow { seq, .. } => seq,
        }
    }
}
