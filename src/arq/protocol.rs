//! ARQ 协议变体

use std::fmt;

use serde::{Deserialize, Serialize};

/// 三种 ARQ 协议。Stop-and-Wait 就是窗口为 1 的 Go-Back-N。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    StopAndWait,
    #[default]
    GoBackN,
    SelectiveRepeat,
}

impl Protocol {
    /// 实际生效的窗口大小
    pub fn effective_window(self, window_size: usize) -> usize {
        match self {
            Protocol::StopAndWait => 1,
            Protocol::GoBackN | Protocol::SelectiveRepeat => window_size,
        }
    }

    /// 是否为累计确认（Stop-and-Wait / Go-Back-N）
    pub fn is_cumulative(self) -> bool {
        !matches!(self, Protocol::SelectiveRepeat)
    }

    /// 用于报告的协议名，例如 `Go-Back-N (window=4)`。
    ///
    /// 窗口为 1 的 Go-Back-N 按 Stop-and-Wait 报告。
    pub fn display_name(self, window_size: usize) -> String {
        let window = self.effective_window(window_size);
        match self {
            Protocol::StopAndWait => "Stop-and-Wait".to_string(),
            Protocol::GoBackN if window == 1 => "Stop-and-Wait".to_string(),
            Protocol::GoBackN => format!("Go-Back-N (window={window})"),
            Protocol::SelectiveRepeat => format!("Selective Repeat (window={window})"),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::StopAndWait => "stop_and_wait",
            Protocol::GoBackN => "go_back_n",
            Protocol::SelectiveRepeat => "selective_repeat",
        };
        f.write_str(s)
    }
}
