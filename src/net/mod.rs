//! 网络故障模型模块
//!
//! 此模块包含不可靠链路、故障注入模型及其统计。

// 子模块声明
mod fault;
mod network;
mod probability;

// 重新导出公共接口
pub use fault::{FaultConfig, FaultModel, RandomFaults, ScriptedFaults};
pub use network::{NetStats, Network, Transit};
pub use probability::Probability;
