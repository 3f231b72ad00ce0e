//! 组件生命周期状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// 注册表条目状态
///
/// 单例按 `Uninitialized -> Initializing -> Ready` 转换且只转换一次；
/// `Destroyed` 仅能从 `Ready` 到达，`Failed` 仅能从 `Initializing` 到达。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
    Failed,
}

impl EntryStatus {
    /// 检查状态转换是否合法
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Initializing)
                | (Self::Initializing, Self::Ready)
                | (Self::Initializing, Self::Failed)
                | (Self::Initializing, Self::Uninitialized)
                | (Self::Ready, Self::Destroyed)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Initializing => "INITIALIZING",
            Self::Ready => "READY",
            Self::Destroyed => "DESTROYED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// 注册表阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryPhase {
    /// 可以预置外部实例和注册处理器
    #[default]
    Open,
    /// 正在执行注册批次
    Initializing,
    /// 可以查找组件
    Ready,
    /// 注册批次失败
    Failed,
    /// 已销毁
    Destroyed,
}

impl fmt::Display for RegistryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}
