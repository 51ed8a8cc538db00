//! 时钟
//!
//! 驱动循环每轮读一次 `now()`，结束时调用 `advance()`。超时判定完全基于这两个调用，
//! 所以同一套发送端/接收端既能逐步推进（测试），也能按真实时间运行（演示）。

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use super::time::SimTime;

pub trait Clock: fmt::Debug + Send {
    fn now(&self) -> SimTime;
    /// 进入下一轮
    fn advance(&mut self);
}

/// 手动时钟：每轮固定前进 `step`，完全确定。
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: SimTime,
    step: SimTime,
}

impl ManualClock {
    pub fn new(step: SimTime) -> Self {
        Self {
            now: SimTime::ZERO,
            step,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SimTime {
        self.now
    }

    fn advance(&mut self) {
        self.now = self.now.saturating_add(self.step);
    }
}

/// 真实时钟：读取单调时钟，每轮之间休眠 `pace`。
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
    pace: Duration,
}

impl WallClock {
    pub fn new(pace: Duration) -> Self {
        Self {
            start: Instant::now(),
            pace,
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> SimTime {
        SimTime::from_duration(self.start.elapsed())
    }

    fn advance(&mut self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }
}
