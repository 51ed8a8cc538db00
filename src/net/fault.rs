//! 故障注入模型
//!
//! [`Network`](super::Network) 把"丢不丢、坏不坏"的决定交给一个 [`FaultModel`]：
//! - [`RandomFaults`]：按概率独立采样，随机源为可设种子的 ChaCha8；
//! - [`ScriptedFaults`]：按脚本精确地丢/损坏指定序号，用于可复现的故障轨迹。

use std::collections::HashMap;
use std::fmt;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::probability::Probability;
use crate::arq::Packet;
use crate::error::ConfigError;

/// 故障概率参数（每个事件独立采样）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultConfig {
    #[serde(default)]
    pub packet_loss: f64,
    #[serde(default)]
    pub corruption: f64,
    #[serde(default)]
    pub ack_loss: f64,
}

impl FaultConfig {
    pub fn new(packet_loss: f64, corruption: f64, ack_loss: f64) -> Self {
        Self {
            packet_loss,
            corruption,
            ack_loss,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates().map(|_| ())
    }

    fn rates(&self) -> Result<[Probability; 3], ConfigError> {
        Ok([
            Probability::new("packet_loss", self.packet_loss)?,
            Probability::new("corruption", self.corruption)?,
            Probability::new("ack_loss", self.ack_loss)?,
        ])
    }
}

/// 故障注入接口
pub trait FaultModel: fmt::Debug + Send {
    /// 数据包是否在传输中丢失
    fn lose_packet(&mut self, pkt: &Packet) -> bool;
    /// 对幸存的副本决定是否损坏；损坏时就地改写载荷并返回 `true`
    fn corrupt(&mut self, pkt: &mut Packet) -> bool;
    /// ACK 是否丢失
    fn lose_ack(&mut self, ack: u64) -> bool;
}

/// 概率故障：丢包、损坏、ACK 丢失各自独立采样
pub struct RandomFaults {
    packet_loss: Probability,
    corruption: Probability,
    ack_loss: Probability,
    rng: ChaCha8Rng,
}

impl RandomFaults {
    pub fn new(cfg: &FaultConfig, seed: u64) -> Result<Self, ConfigError> {
        let [packet_loss, corruption, ack_loss] = cfg.rates()?;
        Ok(Self {
            packet_loss,
            corruption,
            ack_loss,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }
}

impl fmt::Debug for RandomFaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomFaults")
            .field("packet_loss", &self.packet_loss.to_string())
            .field("corruption", &self.corruption.to_string())
            .field("ack_loss", &self.ack_loss.to_string())
            .finish_non_exhaustive()
    }
}

impl FaultModel for RandomFaults {
    fn lose_packet(&mut self, _pkt: &Packet) -> bool {
        self.packet_loss.sample(&mut self.rng)
    }

    fn corrupt(&mut self, pkt: &mut Packet) -> bool {
        if pkt.payload.is_empty() || !self.corruption.sample(&mut self.rng) {
            return false;
        }
        // 同长度随机字节替换载荷；摘要保持不变。随机字节可能恰好与原载荷相同，此时不算损坏
        let before = pkt.payload.clone();
        self.rng.fill_bytes(&mut pkt.payload);
        pkt.payload != before
    }

    fn lose_ack(&mut self, _ack: u64) -> bool {
        self.ack_loss.sample(&mut self.rng)
    }
}

/// 脚本化故障：对指定序号的接下来 `n` 次事件生效，其余一律正常送达。
#[derive(Debug, Clone, Default)]
pub struct ScriptedFaults {
    lose_packets: HashMap<u64, u32>,
    corrupt_packets: HashMap<u64, u32>,
    lose_acks: HashMap<u64, u32>,
}

impl ScriptedFaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// 序号 `seq` 的接下来 `times` 次发送都会丢失
    pub fn lose_packet(mut self, seq: u64, times: u32) -> Self {
        if times > 0 {
            *self.lose_packets.entry(seq).or_default() += times;
        }
        self
    }

    /// 序号 `seq` 的接下来 `times` 次幸存发送都会被损坏（逐字节取反）
    pub fn corrupt_packet(mut self, seq: u64, times: u32) -> Self {
        if times > 0 {
            *self.corrupt_packets.entry(seq).or_default() += times;
        }
        self
    }

    /// 确认号 `ack` 的接下来 `times` 次回送都会丢失
    pub fn lose_ack(mut self, ack: u64, times: u32) -> Self {
        if times > 0 {
            *self.lose_acks.entry(ack).or_default() += times;
        }
        self
    }

    /// 脚本中的故障是否已全部触发
    pub fn is_exhausted(&self) -> bool {
        self.lose_packets.is_empty() && self.corrupt_packets.is_empty() && self.lose_acks.is_empty()
    }
}

fn take_one(script: &mut HashMap<u64, u32>, key: u64) -> bool {
    let Some(left) = script.get_mut(&key) else {
        return false;
    };
    *left -= 1;
    if *left == 0 {
        script.remove(&key);
    }
    true
}

impl FaultModel for ScriptedFaults {
    fn lose_packet(&mut self, pkt: &Packet) -> bool {
        take_one(&mut self.lose_packets, pkt.seq)
    }

    fn corrupt(&mut self, pkt: &mut Packet) -> bool {
        if !take_one(&mut self.corrupt_packets, pkt.seq) {
            return false;
        }
        if pkt.payload.is_empty() {
            // 空载荷无从损坏，视为正常送达
            return false;
        }
        for b in &mut pkt.payload {
            *b = !*b;
        }
        true
    }

    fn lose_ack(&mut self, ack: u64) -> bool {
        take_one(&mut self.lose_acks, ack)
    }
}
