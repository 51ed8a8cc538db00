//! 发送端状态机
//!
//! 一个 [`Sender`] 持有全部待发送的数据包，维护滑动窗口 `[base, next_seq)`：
//! - 累计确认（Stop-and-Wait / Go-Back-N）：整个窗口共用一个计时器，超时后从 `base`
//!   起重传所有在途包；
//! - 选择重传（Selective-Repeat）：每个在途序号一个计时器，超时只重传到期的那个序号。
//!
//! 超时采用轮询：调用方每轮把当前时间传给 [`Sender::on_timeout_check`]，这里不做任何阻塞等待。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::packet::Packet;
use super::protocol::Protocol;
use super::stats::SenderStats;
use crate::sim::SimTime;

/// 计时器与确认记录，按协议区分
#[derive(Debug, Clone)]
enum Discipline {
    /// 累计确认：一个共享计时器（`None` 表示未启动）
    Cumulative { timer: Option<SimTime> },
    /// 选择重传：逐序号确认 + 逐序号计时器
    Selective {
        acked: Vec<bool>,
        timers: BTreeMap<u64, SimTime>,
    },
}

#[derive(Debug, Clone)]
pub struct Sender {
    protocol: Protocol,
    packets: Vec<Packet>,
    window_size: usize,
    timeout: SimTime,
    base: u64,
    next_seq: u64,
    discipline: Discipline,
    stats: SenderStats,
}

impl Sender {
    /// `window_size` 为 0 时按 1 处理；Stop-and-Wait 总是使用窗口 1。
    pub fn new(protocol: Protocol, packets: Vec<Packet>, window_size: usize, timeout: SimTime) -> Self {
        let window_size = protocol.effective_window(window_size).max(1);
        let discipline = if protocol.is_cumulative() {
            Discipline::Cumulative { timer: None }
        } else {
            Discipline::Selective {
                acked: vec![false; packets.len()],
                timers: BTreeMap::new(),
            }
        };
        Self {
            protocol,
            packets,
            window_size,
            timeout,
            base: 0,
            next_seq: 0,
            discipline,
            stats: SenderStats::default(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// 最早未确认的序号
    pub fn base(&self) -> u64 {
        self.base
    }

    /// 下一个尚未使用的序号
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn total_packets(&self) -> u64 {
        self.packets.len() as u64
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    pub fn packet(&self, seq: u64) -> Option<&Packet> {
        self.packets.get(seq as usize)
    }

    /// 在途（已发送未确认）的包数
    pub fn in_flight(&self) -> u64 {
        match &self.discipline {
            Discipline::Cumulative { .. } => self.next_seq - self.base,
            Discipline::Selective { timers, .. } => timers.len() as u64,
        }
    }

    /// 计时器启动时刻（选择重传时取最早的一个）
    pub fn timer_started_at(&self) -> Option<SimTime> {
        match &self.discipline {
            Discipline::Cumulative { timer } => *timer,
            Discipline::Selective { timers, .. } => timers.values().min().copied(),
        }
    }

    /// 窗口未满且还有新包可发
    pub fn can_send_next(&self) -> bool {
        self.next_seq < self.total_packets()
            && self.next_seq < self.base.saturating_add(self.window_size as u64)
    }

    /// 发送下一个新包：打时间戳、必要时启动计时器、推进 `next_seq`。
    ///
    /// 窗口已满或没有新包时返回 `None`。
    pub fn send_next(&mut self, now: SimTime) -> Option<Packet> {
        if !self.can_send_next() {
            return None;
        }
        let seq = self.next_seq;
        match &mut self.discipline {
            Discipline::Cumulative { timer } => {
                if self.base == self.next_seq {
                    *timer = Some(now);
                }
            }
            Discipline::Selective { timers, .. } => {
                timers.insert(seq, now);
            }
        }
        let pkt = &mut self.packets[seq as usize];
        pkt.sent_at = Some(now);
        self.next_seq += 1;
        self.stats.record_send();
        debug!(seq, base = self.base, next_seq = self.next_seq, "发送新包");
        Some(pkt.clone())
    }

    /// 处理一个确认号，返回是否产生了效果。
    ///
    /// - 累计确认：确认 `[base, ack]` 内的全部包，`base = ack + 1`；
    ///   `ack < base`（过期/重复）或指向尚未发送的包时为空操作并返回 `false`。
    /// - 选择重传：只确认 `ack` 这一个序号并撤销它的计时器，然后把 `base`
    ///   推过已确认的前缀；重复确认返回 `false`。
    pub fn on_ack(&mut self, ack: u64, now: SimTime) -> bool {
        if ack >= self.next_seq {
            trace!(ack, next_seq = self.next_seq, "忽略未发送序号的 ACK");
            return false;
        }
        match &mut self.discipline {
            Discipline::Cumulative { timer } => {
                if ack < self.base {
                    trace!(ack, base = self.base, "过期或重复的 ACK");
                    return false;
                }
                for pkt in &mut self.packets[self.base as usize..=ack as usize] {
                    pkt.acknowledged = true;
                }
                self.base = ack + 1;
                *timer = if self.base < self.next_seq {
                    Some(now)
                } else {
                    None
                };
                debug!(ack, base = self.base, "累计确认");
                true
            }
            Discipline::Selective { acked, timers } => {
                let idx = ack as usize;
                if acked[idx] {
                    trace!(ack, "重复的选择确认");
                    return false;
                }
                acked[idx] = true;
                timers.remove(&ack);
                self.packets[idx].acknowledged = true;
                while (self.base as usize) < acked.len() && acked[self.base as usize] {
                    self.base += 1;
                }
                debug!(ack, base = self.base, "选择确认");
                true
            }
        }
    }

    /// 检查超时并返回需要重传的包（已重新打时间戳并计入统计）。
    ///
    /// 判定条件为 `now - start > timeout`。
    pub fn on_timeout_check(&mut self, now: SimTime) -> Vec<Packet> {
        let timeout = self.timeout;
        let total = self.total_packets();
        let expired: Vec<u64> = match &mut self.discipline {
            Discipline::Cumulative { timer } => {
                let Some(start) = *timer else {
                    return Vec::new();
                };
                if now.since(start) <= timeout || self.base >= total {
                    return Vec::new();
                }
                if self.base < self.next_seq {
                    *timer = Some(now);
                }
                (self.base..self.next_seq).collect()
            }
            Discipline::Selective { acked, timers } => {
                let expired: Vec<u64> = timers
                    .iter()
                    .filter(|&(&seq, &start)| {
                        !acked[seq as usize] && now.since(start) > timeout
                    })
                    .map(|(&seq, _)| seq)
                    .collect();
                for seq in &expired {
                    timers.insert(*seq, now);
                }
                expired
            }
        };

        if !expired.is_empty() {
            debug!(
                protocol = %self.protocol,
                base = self.base,
                count = expired.len(),
                first = expired[0],
                "超时重传"
            );
        }

        expired
            .into_iter()
            .map(|seq| {
                let pkt = &mut self.packets[seq as usize];
                pkt.sent_at = Some(now);
                self.stats.record_resend();
                pkt.clone()
            })
            .collect()
    }

    /// 所有包都已被确认
    pub fn is_done(&self) -> bool {
        match &self.discipline {
            Discipline::Cumulative { .. } => self.base >= self.total_packets(),
            Discipline::Selective { acked, .. } => acked.iter().all(|&a| a),
        }
    }
}
