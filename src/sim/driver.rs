//! 仿真驱动
//!
//! 轮询式主循环，每轮固定顺序：
//! 1. 超时检查，重传发送端给出的包；
//! 2. 在窗口允许的范围内发送所有新包；
//! 3. 取出网络中排队的每个包交给接收端，接受则把 ACK 经回程信道送回发送端。
//!
//! 发送端全部确认即结束；迭代/仿真时间预算用尽也会结束，此时视为失败。

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::clock::{Clock, ManualClock};
use super::config::{RunBudget, SimConfig};
use super::time::SimTime;
use crate::arq::{Delivery, Packet, Protocol, Receiver, Sender, segment};
use crate::error::ConfigError;
use crate::net::{FaultModel, NetStats, Network, RandomFaults, Transit};
use crate::trace::{TraceEvent, TraceEventKind, TraceLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Done,
}

/// 一次运行的统计结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub protocol: String,
    pub total_sent: u64,
    pub retransmissions: u64,
    /// 有效包数（分段数）
    pub useful_packets: u64,
    /// `useful_packets / total_sent`
    pub efficiency: f64,
    pub iterations: u64,
    pub sim_time_ns: u64,
    pub net: NetStats,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: total_sent={} retransmissions={} efficiency={:.3} iterations={} sim_time_us={}",
            self.protocol,
            self.total_sent,
            self.retransmissions,
            self.efficiency,
            self.iterations,
            self.sim_time_ns / 1_000
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// 在预算内完成，且接收端重组结果与原始消息逐字节一致
    pub success: bool,
    /// 发送端是否在预算内收到全部确认
    pub completed: bool,
    pub stats: RunStats,
}

pub struct Simulation {
    message: Vec<u8>,
    protocol: Protocol,
    window_size: usize,
    sender: Sender,
    receiver: Receiver,
    network: Network,
    clock: Box<dyn Clock>,
    budget: RunBudget,
    reack_on_reject: bool,
    iterations: u64,
    state: RunState,
    trace: Option<TraceLog>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("protocol", &self.protocol)
            .field("window_size", &self.window_size)
            .field("base", &self.sender.base())
            .field("next_seq", &self.sender.next_seq())
            .field("iterations", &self.iterations)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// 按配置构造：概率故障（种子取自 `cfg.seed`）+ 手动时钟。
    pub fn new(message: impl Into<Vec<u8>>, cfg: &SimConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let faults = RandomFaults::new(&cfg.faults, cfg.seed)?;
        Self::with_faults(message, cfg, Box::new(faults))
    }

    /// 使用自定义故障模型构造（`cfg.faults` 与 `cfg.seed` 被忽略）。
    pub fn with_faults(
        message: impl Into<Vec<u8>>,
        cfg: &SimConfig,
        faults: Box<dyn FaultModel>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let message = message.into();
        let window_size = cfg.effective_window();
        let packets = segment(&message, cfg.chunk_size);
        let sender = Sender::new(cfg.protocol, packets, window_size, cfg.timeout());
        let receiver = Receiver::new(cfg.protocol, window_size);
        debug!(
            protocol = %cfg.protocol,
            window_size,
            packets = sender.total_packets(),
            "构造仿真"
        );
        Ok(Self {
            message,
            protocol: cfg.protocol,
            window_size,
            sender,
            receiver,
            network: Network::new(faults),
            clock: Box::new(ManualClock::new(cfg.tick())),
            budget: cfg.budget(),
            reack_on_reject: cfg.reack_on_reject,
            iterations: 0,
            state: RunState::Running,
            trace: None,
        })
    }

    /// 替换时钟（例如 [`WallClock`](super::WallClock)）
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 记录逐事件轨迹
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(TraceLog::default());
        self
    }

    pub fn protocol_name(&self) -> String {
        self.protocol.display_name(self.window_size)
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn trace(&self) -> Option<&TraceLog> {
        self.trace.as_ref()
    }

    /// 按发生顺序列出超时重传的序号（未开启轨迹时为空）
    pub fn retransmitted_seqs(&self) -> Vec<u64> {
        self.trace
            .as_ref()
            .map(TraceLog::retransmitted_seqs)
            .unwrap_or_default()
    }

    pub fn take_trace(&mut self) -> Option<TraceLog> {
        self.trace.take()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn state(&self) -> RunState {
        if self.sender.is_done() {
            RunState::Done
        } else {
            self.state
        }
    }

    /// 接收端当前的重组结果；运行前后都可以调用
    pub fn reassembled(&self) -> Vec<u8> {
        self.receiver.reassemble()
    }

    /// 推进一轮
    pub fn step(&mut self) -> RunState {
        if self.state() == RunState::Done {
            return RunState::Done;
        }
        let now = self.clock.now();
        trace!(iteration = self.iterations, now = ?now, "开始一轮");

        let resent = self.sender.on_timeout_check(now);
        if !resent.is_empty() {
            let seqs = resent.iter().map(|p| p.seq).collect();
            self.record(now, TraceEventKind::Timeout { seqs });
        }
        for pkt in &resent {
            self.transmit(pkt, true, now);
        }

        while let Some(pkt) = self.sender.send_next(now) {
            self.transmit(&pkt, false, now);
        }

        while let Some(pkt) = self.network.next_delivery() {
            match self.receiver.on_packet(&pkt) {
                Delivery::Accepted { ack, duplicate } => {
                    self.record(
                        now,
                        TraceEventKind::Accepted {
                            seq: pkt.seq,
                            ack,
                            duplicate,
                        },
                    );
                    self.return_ack(ack, now);
                }
                Delivery::Rejected { reason, reack } => {
                    self.record(
                        now,
                        TraceEventKind::Rejected {
                            seq: pkt.seq,
                            reason: reason.to_string(),
                        },
                    );
                    if self.reack_on_reject {
                        if let Some(ack) = reack {
                            self.return_ack(ack, now);
                        }
                    }
                }
            }
        }

        debug_assert!(self.sender.base() <= self.sender.next_seq());
        debug_assert!(
            self.sender.next_seq()
                <= self
                    .sender
                    .base()
                    .saturating_add(self.sender.window_size() as u64)
        );

        self.iterations += 1;
        if self.sender.is_done() {
            self.state = RunState::Done;
            self.record(now, TraceEventKind::Done);
        } else {
            self.clock.advance();
        }
        self.state
    }

    /// 运行到全部确认或预算耗尽
    #[tracing::instrument(skip(self), fields(protocol = %self.protocol, window = self.window_size))]
    pub fn run_to_completion(&mut self) -> RunReport {
        info!(packets = self.sender.total_packets(), "▶️  开始传输");
        while self.state() == RunState::Running {
            if self.budget.exhausted(self.iterations, self.clock.now()) {
                warn!(
                    iterations = self.iterations,
                    base = self.sender.base(),
                    total = self.sender.total_packets(),
                    "预算耗尽，放弃传输"
                );
                break;
            }
            self.step();
        }
        let report = self.report();
        info!(
            success = report.success,
            total_sent = report.stats.total_sent,
            retransmissions = report.stats.retransmissions,
            iterations = report.stats.iterations,
            "✅ 传输结束"
        );
        report
    }

    pub fn stats(&self) -> RunStats {
        let sender = self.sender.stats();
        let useful = self.sender.total_packets();
        RunStats {
            protocol: self.protocol_name(),
            total_sent: sender.total_sent,
            retransmissions: sender.retransmissions,
            useful_packets: useful,
            efficiency: sender.efficiency(useful),
            iterations: self.iterations,
            sim_time_ns: self.clock.now().0,
            net: self.network.stats,
        }
    }

    pub fn report(&self) -> RunReport {
        let completed = self.sender.is_done();
        RunReport {
            success: completed && self.reassembled() == self.message,
            completed,
            stats: self.stats(),
        }
    }

    fn transmit(&mut self, pkt: &Packet, retrans: bool, now: SimTime) {
        self.record(now, TraceEventKind::Send { seq: pkt.seq, retrans });
        match self.network.transmit_packet(pkt) {
            Transit::Lost => self.record(now, TraceEventKind::PacketLost { seq: pkt.seq }),
            Transit::Queued { corrupted: true } => {
                self.record(now, TraceEventKind::PacketCorrupted { seq: pkt.seq })
            }
            Transit::Queued { corrupted: false } => {}
        }
    }

    fn return_ack(&mut self, ack: u64, now: SimTime) {
        if !self.network.transmit_ack(ack) {
            self.record(now, TraceEventKind::AckLost { ack });
            return;
        }
        let advanced = self.sender.on_ack(ack, now);
        self.record(now, TraceEventKind::AckApplied { ack, advanced });
    }

    fn record(&mut self, now: SimTime, kind: TraceEventKind) {
        if let Some(log) = self.trace.as_mut() {
            log.push(TraceEvent {
                t_ns: now.0,
                iteration: self.iterations,
                kind,
            });
        }
    }
}

/// 一次完整传输的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub report: RunReport,
    pub payload: Vec<u8>,
}

/// 在两个端点之间可靠地传输 `message`，返回接收端拿到的数据。
pub fn transfer(message: &[u8], cfg: &SimConfig) -> Result<Transfer, ConfigError> {
    let mut sim = Simulation::new(message, cfg)?;
    let report = sim.run_to_completion();
    Ok(Transfer {
        report,
        payload: sim.reassembled(),
    })
}
