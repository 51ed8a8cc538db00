//! 数据包与分段
//!
//! 消息按固定大小切成有序的数据包，每个包在创建时计算一次 SHA-256 摘要。
//! 摘要之后不再重算：网络只会改动副本的载荷，接收端据此识别损坏。

use sha2::{Digest, Sha256};

use crate::sim::SimTime;

/// SHA-256 摘要
pub type IntegrityDigest = [u8; 32];

/// 数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq: u64,
    pub payload: Vec<u8>,
    digest: IntegrityDigest,
    /// 最近一次放上链路的时间
    pub sent_at: Option<SimTime>,
    pub acknowledged: bool,
}

impl Packet {
    pub fn new(seq: u64, payload: Vec<u8>) -> Self {
        let digest = digest_of(&payload);
        Self {
            seq,
            payload,
            digest,
            sent_at: None,
            acknowledged: false,
        }
    }

    /// 创建时的摘要（不随载荷变化）
    pub fn digest(&self) -> &IntegrityDigest {
        &self.digest
    }

    /// 重新计算当前载荷的摘要并与创建时的摘要比较
    pub fn verify(&self) -> bool {
        digest_of(&self.payload) == self.digest
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

pub fn digest_of(payload: &[u8]) -> IntegrityDigest {
    Sha256::digest(payload).into()
}

/// 把消息切成 `ceil(len / chunk_size)` 个包，序号从 0 开始；最后一个包可以更短。
///
/// `chunk_size` 为 0 时返回空序列（配置校验会先拒绝这种情况）。
pub fn segment(message: &[u8], chunk_size: usize) -> Vec<Packet> {
    if chunk_size == 0 {
        return Vec::new();
    }
    message
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| Packet::new(i as u64, chunk.to_vec()))
        .collect()
}
