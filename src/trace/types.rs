use serde::{Deserialize, Serialize};

/// 轨迹事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 发送端把包交给网络（`retrans` 表示超时重传）
    Send { seq: u64, retrans: bool },
    /// 数据包在网络中丢失
    PacketLost { seq: u64 },
    /// 数据包副本在网络中被损坏
    PacketCorrupted { seq: u64 },
    /// 接收端接受了包（`duplicate` 表示仅用于确认）
    Accepted { seq: u64, ack: u64, duplicate: bool },
    /// 接收端拒收
    Rejected { seq: u64, reason: String },
    /// ACK 在回程丢失
    AckLost { ack: u64 },
    /// ACK 到达发送端（`advanced` 表示产生了效果）
    AckApplied { ack: u64, advanced: bool },
    /// 超时触发，`seqs` 为本次重传的序号
    Timeout { seqs: Vec<u64> },
    /// 全部确认完成
    Done,
}

/// 一条轨迹（JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub iteration: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束可写成 JSON 文件）
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    /// 按发生顺序列出所有超时重传的序号
    pub fn retransmitted_seqs(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|ev| match ev.kind {
                TraceEventKind::Send { seq, retrans: true } => Some(seq),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&TraceEventKind) -> bool) -> usize {
        self.events.iter().filter(|ev| pred(&ev.kind)).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
