use std::fmt;
use std::time::Duration;

pub type TokenCount = u64;

pub type CostValue = f64;

/// Unix 秒
pub type UnixTimestamp = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeoutSeconds(pub u64);

impl TimeoutSeconds {
    #[must_use]
    pub const fn new(seconds: u64) -> Self {
        Self(seconds)
    }

    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl fmt::Display for TimeoutSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// 平台费率（0.20 表示 20%）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRate(f64);

impl FeeRate {
    pub const DEFAULT: Self = Self(0.20);

    /// 费率必须是有限的非负数
    #[must_use]
    pub fn new(rate: f64) -> Option<Self> {
        (rate.is_finite() && rate >= 0.0).then_some(Self(rate))
    }

    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}
