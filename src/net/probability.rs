//! 经过校验的概率值

use std::fmt;

use rand::Rng;

use crate::error::ConfigError;

/// `[0.0, 1.0]` 内的概率
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    pub const NEVER: Probability = Probability(0.0);
    pub const ALWAYS: Probability = Probability(1.0);

    /// NaN、负数、大于 1 都会被拒绝
    pub fn new(name: &'static str, value: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidProbability { name, value });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// 每次调用都独立采样一次（概率为 0 时不消耗随机数）
    pub fn sample<R: Rng>(self, rng: &mut R) -> bool {
        if self.0 <= 0.0 {
            return false;
        }
        rng.gen_bool(self.0)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{pct:.2}%")
        }
    }
}
