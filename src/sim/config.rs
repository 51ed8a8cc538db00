use serde::{Deserialize, Serialize};

use super::time::SimTime;
use crate::arq::Protocol;
use crate::error::ConfigError;
use crate::net::FaultConfig;

pub const DEFAULT_CHUNK_SIZE: usize = 2;
pub const DEFAULT_WINDOW_SIZE: usize = 4;
pub const DEFAULT_TIMEOUT_US: u64 = 5_000;
pub const DEFAULT_TICK_US: u64 = 1_000;
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;

/// 一次仿真的全部参数（可从 JSON 读取，缺省字段取默认值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Stop-and-Wait 忽略此值
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_timeout_us")]
    pub timeout_us: u64,
    /// 手动时钟每轮前进的时长
    #[serde(default = "default_tick_us")]
    pub tick_us: u64,
    #[serde(default)]
    pub faults: FaultConfig,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default)]
    pub max_sim_time_us: Option<u64>,
    /// 拒收时也把接收端重发的累计 ACK 送回发送端
    #[serde(default)]
    pub reack_on_reject: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_timeout_us() -> u64 {
    DEFAULT_TIMEOUT_US
}

fn default_tick_us() -> u64 {
    DEFAULT_TICK_US
}

fn default_max_iterations() -> u64 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            timeout_us: DEFAULT_TIMEOUT_US,
            tick_us: DEFAULT_TICK_US,
            faults: FaultConfig::default(),
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_sim_time_us: None,
            reack_on_reject: false,
        }
    }
}

impl SimConfig {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: SimConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.timeout_us == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        self.faults.validate()
    }

    /// 实际使用的窗口（Stop-and-Wait 为 1）
    pub fn effective_window(&self) -> usize {
        self.protocol.effective_window(self.window_size)
    }

    pub fn timeout(&self) -> SimTime {
        SimTime::from_micros(self.timeout_us)
    }

    pub fn tick(&self) -> SimTime {
        SimTime::from_micros(self.tick_us)
    }

    pub fn budget(&self) -> RunBudget {
        RunBudget {
            max_iterations: self.max_iterations,
            max_sim_time: self.max_sim_time_us.map(SimTime::from_micros),
        }
    }
}

/// 运行预算：迭代次数上限，以及可选的仿真时间上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBudget {
    pub max_iterations: u64,
    pub max_sim_time: Option<SimTime>,
}

impl RunBudget {
    pub fn iterations(max_iterations: u64) -> Self {
        Self {
            max_iterations,
            max_sim_time: None,
        }
    }

    pub(crate) fn exhausted(&self, iterations: u64, now: SimTime) -> bool {
        iterations >= self.max_iterations || self.max_sim_time.is_some_and(|limit| now > limit)
    }
}
