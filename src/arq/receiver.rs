//! 接收端状态机
//!
//! - 累计确认接收端只接受 `expected` 这一个序号，不缓存乱序包；
//! - 选择重传接收端接受 `[base, base + window)` 内的任何包并缓存，`base` 到齐后整段滑动。
//!
//! 两者都先做完整性校验，摘要不符的包一律拒收。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::packet::Packet;
use super::protocol::Protocol;
use crate::error::Rejection;

/// 一次投递的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 接受（或作为重复包仅用于确认），`ack` 应回送给发送端
    Accepted { ack: u64, duplicate: bool },
    /// 拒收；`reack` 为累计接收端重新给出的最近一次有效 ACK
    Rejected {
        reason: Rejection,
        reack: Option<u64>,
    },
}

impl Delivery {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Delivery::Accepted { .. })
    }

    pub fn ack(&self) -> Option<u64> {
        match *self {
            Delivery::Accepted { ack, .. } => Some(ack),
            Delivery::Rejected { reack, .. } => reack,
        }
    }
}

#[derive(Debug, Clone)]
enum Window {
    Cumulative {
        expected: u64,
        last_ack: Option<u64>,
    },
    Selective {
        base: u64,
        window_size: usize,
        /// 提前到达（序号 > base）的包
        pending: BTreeMap<u64, Vec<u8>>,
    },
}

#[derive(Debug, Clone)]
pub struct Receiver {
    window: Window,
    /// 已按序交付的载荷（序号 -> 载荷）
    delivered: BTreeMap<u64, Vec<u8>>,
}

impl Receiver {
    pub fn new(protocol: Protocol, window_size: usize) -> Self {
        let window = if protocol.is_cumulative() {
            Window::Cumulative {
                expected: 0,
                last_ack: None,
            }
        } else {
            Window::Selective {
                base: 0,
                window_size: window_size.max(1),
                pending: BTreeMap::new(),
            }
        };
        Self {
            window,
            delivered: BTreeMap::new(),
        }
    }

    /// 下一个期望按序交付的序号（累计接收端的 `expected`，选择重传接收端的 `base`）
    pub fn expected(&self) -> u64 {
        match &self.window {
            Window::Cumulative { expected, .. } => *expected,
            Window::Selective { base, .. } => *base,
        }
    }

    /// 最近一次有效的累计 ACK（选择重传时为 `base - 1`）
    pub fn last_ack(&self) -> Option<u64> {
        match &self.window {
            Window::Cumulative { last_ack, .. } => *last_ack,
            Window::Selective { base, .. } => base.checked_sub(1),
        }
    }

    /// 缓存中尚未按序交付的包数（累计接收端恒为 0）
    pub fn buffered(&self) -> usize {
        match &self.window {
            Window::Cumulative { .. } => 0,
            Window::Selective { pending, .. } => pending.len(),
        }
    }

    pub fn on_packet(&mut self, pkt: &Packet) -> Delivery {
        let seq = pkt.seq;
        if !pkt.verify() {
            debug!(seq, "完整性校验失败，丢弃");
            let reack = match &self.window {
                Window::Cumulative { last_ack, .. } => *last_ack,
                Window::Selective { .. } => None,
            };
            return Delivery::Rejected {
                reason: Rejection::IntegrityFailure { seq },
                reack,
            };
        }

        match &mut self.window {
            Window::Cumulative { expected, last_ack } => {
                if seq == *expected {
                    self.delivered.insert(seq, pkt.payload.clone());
                    *expected += 1;
                    *last_ack = Some(seq);
                    trace!(seq, expected = *expected, "按序接收");
                    Delivery::Accepted {
                        ack: seq,
                        duplicate: false,
                    }
                } else if seq < *expected {
                    // expected > 0，因此 last_ack 一定存在
                    let ack = last_ack.unwrap_or(seq);
                    trace!(seq, ack, "重复包，重发最近 ACK");
                    Delivery::Accepted {
                        ack,
                        duplicate: true,
                    }
                } else {
                    debug!(seq, expected = *expected, "乱序到达，拒收");
                    Delivery::Rejected {
                        reason: Rejection::OutOfWindow {
                            seq,
                            base: *expected,
                            window: 1,
                        },
                        reack: *last_ack,
                    }
                }
            }
            Window::Selective {
                base,
                window_size,
                pending,
            } => {
                if seq < *base {
                    trace!(seq, base = *base, "重复包，再次确认");
                    return Delivery::Accepted {
                        ack: seq,
                        duplicate: true,
                    };
                }
                if seq >= base.saturating_add(*window_size as u64) {
                    debug!(seq, base = *base, "超出接收窗口，拒收");
                    return Delivery::Rejected {
                        reason: Rejection::OutOfWindow {
                            seq,
                            base: *base,
                            window: *window_size,
                        },
                        reack: None,
                    };
                }
                let duplicate = pending.insert(seq, pkt.payload.clone()).is_some();
                while let Some(payload) = pending.remove(&*base) {
                    self.delivered.insert(*base, payload);
                    *base += 1;
                }
                trace!(seq, base = *base, buffered = pending.len(), "窗口内接收");
                Delivery::Accepted {
                    ack: seq,
                    duplicate,
                }
            }
        }
    }

    /// 按序号拼接已交付的载荷；可随时调用，不改变状态。
    pub fn reassemble(&self) -> Vec<u8> {
        self.delivered.values().flatten().copied().collect()
    }
}
