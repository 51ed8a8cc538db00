//! 仿真核心模块
//!
//! 此模块包含仿真时间、时钟、运行配置以及轮询式驱动循环。

// 子模块声明
mod clock;
mod config;
mod driver;
mod time;

// 重新导出公共接口
pub use clock::{Clock, ManualClock, WallClock};
pub use config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ITERATIONS, DEFAULT_TICK_US, DEFAULT_TIMEOUT_US,
    DEFAULT_WINDOW_SIZE, RunBudget, SimConfig,
};
pub use driver::{RunReport, RunState, RunStats, Simulation, Transfer, transfer};
pub use time::SimTime;
