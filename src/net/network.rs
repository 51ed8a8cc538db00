//! 不可靠链路
//!
//! 发送端的包以副本形式进入网络：副本可能被丢弃或损坏，原包不受影响。
//! 网络不重排、不建模传播时延，幸存副本按进入顺序排队等待驱动循环取走。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::fault::FaultModel;
use crate::arq::Packet;

/// 网络计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStats {
    pub packets_offered: u64,
    pub packets_lost: u64,
    pub packets_corrupted: u64,
    pub packets_delivered: u64,
    pub acks_offered: u64,
    pub acks_lost: u64,
}

/// 传输一个数据包的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transit {
    Lost,
    /// 已排队（`corrupted` 表示副本载荷已被改写）
    Queued { corrupted: bool },
}

#[derive(Debug)]
pub struct Network {
    faults: Box<dyn FaultModel>,
    in_transit: VecDeque<Packet>,
    pub stats: NetStats,
}

impl Network {
    pub fn new(faults: Box<dyn FaultModel>) -> Self {
        Self {
            faults,
            in_transit: VecDeque::new(),
            stats: NetStats::default(),
        }
    }

    /// 把包的副本放上链路；丢失时返回 [`Transit::Lost`]。
    pub fn transmit_packet(&mut self, pkt: &Packet) -> Transit {
        self.stats.packets_offered += 1;
        if self.faults.lose_packet(pkt) {
            self.stats.packets_lost += 1;
            trace!(seq = pkt.seq, "数据包丢失");
            return Transit::Lost;
        }
        let mut copy = pkt.clone();
        let corrupted = self.faults.corrupt(&mut copy);
        if corrupted {
            self.stats.packets_corrupted += 1;
            trace!(seq = pkt.seq, "数据包损坏");
        }
        self.in_transit.push_back(copy);
        Transit::Queued { corrupted }
    }

    /// 回送 ACK；丢失时返回 `false`。
    pub fn transmit_ack(&mut self, ack: u64) -> bool {
        self.stats.acks_offered += 1;
        if self.faults.lose_ack(ack) {
            self.stats.acks_lost += 1;
            trace!(ack, "ACK 丢失");
            return false;
        }
        true
    }

    /// 取出下一个在途包（每个包只会被取走一次）
    pub fn next_delivery(&mut self) -> Option<Packet> {
        let pkt = self.in_transit.pop_front()?;
        self.stats.packets_delivered += 1;
        Some(pkt)
    }

    pub fn in_transit(&self) -> usize {
        self.in_transit.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_transit.is_empty()
    }
}
