//! 注册表事件

use crate::component::ComponentInstance;
use std::fmt;

/// 注册表事件
#[derive(Clone)]
pub enum RegistryEvent {
    /// 组件进入 READY 状态
    ComponentReady {
        name: String,
        instance: ComponentInstance,
    },
    /// 全部非延迟单例就绪，每个注册批次触发一次
    RegistryInitialized { components: Vec<String> },
    /// 注册表销毁完成
    RegistryDestroyed,
}

impl RegistryEvent {
    /// 事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::ComponentReady { .. } => "component-ready",
            Self::RegistryInitialized { .. } => "registry-initialized",
            Self::RegistryDestroyed => "registry-destroyed",
        }
    }
}

impl fmt::Debug for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComponentReady { name, .. } => f
                .debug_struct("ComponentReady")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::RegistryInitialized { components } => f
                .debug_struct("RegistryInitialized")
                .field("components", components)
                .finish(),
            Self::RegistryDestroyed => f.write_str("RegistryDestroyed"),
        }
    }
}

/// 监听器处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerControl {
    /// 继续接收事件
    #[default]
    Continue,
    /// 注销当前监听器
    Stop,
}

/// 事件监听器
///
/// 同一事件按监听器注册顺序分发
pub trait EventListener: Send + Sync + 'static {
    /// 处理事件
    fn on_event(&self, event: &RegistryEvent) -> ListenerControl;

    /// 监听器名称（用于日志）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
