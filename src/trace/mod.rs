//! 事件轨迹记录（用于离线分析和对比）
//!
//! 结构化的 JSON 事件，而不是解析文本日志；仿真结束后可整体写出。

mod types;

pub use types::{TraceEvent, TraceEventKind, TraceLog};
