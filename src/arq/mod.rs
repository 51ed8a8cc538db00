//! ARQ 协议模块
//!
//! 包含数据包/分段、发送端与接收端状态机（Stop-and-Wait / Go-Back-N / Selective-Repeat）。

mod packet;
mod protocol;
mod receiver;
mod sender;
mod stats;

pub use packet::{IntegrityDigest, Packet, digest_of, segment};
pub use protocol::Protocol;
pub use receiver::{Delivery, Receiver};
pub use sender::Sender;
pub use stats::SenderStats;
