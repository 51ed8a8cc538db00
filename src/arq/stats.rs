//! 发送端统计

use serde::{Deserialize, Serialize};

/// 发送端计数器：只在发送/重传时由 [`Sender`](super::Sender) 递增。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStats {
    pub total_sent: u64,
    pub retransmissions: u64,
}

impl SenderStats {
    pub(crate) fn record_send(&mut self) {
        self.total_sent = self.total_sent.saturating_add(1);
    }

    pub(crate) fn record_resend(&mut self) {
        self.total_sent = self.total_sent.saturating_add(1);
        self.retransmissions = self.retransmissions.saturating_add(1);
    }

    /// `useful / total_sent`；还没发过包时为 0
    pub fn efficiency(&self, useful: u64) -> f64 {
        if self.total_sent == 0 {
            return 0.0;
        }
        useful as f64 / self.total_sent as f64
    }
}
