//! 事件分发

use infrastructure_common::{EventListener, ListenerControl, RegistryEvent};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 监听器注册表
///
/// 按注册顺序分发事件；监听器返回 `Stop` 后被注销
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(u64, Arc<dyn EventListener>)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器，返回用于注销的标识
    pub fn register(&self, listener: Arc<dyn EventListener>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("注册事件监听器: {}", listener.name());
        self.listeners.write().push((id, listener));
        id
    }

    /// 注销指定标识的监听器
    pub fn remove(&self, ids: &[u64]) {
        if ids.is_empty() {
            return;
        }
        self.listeners.write().retain(|(id, _)| !ids.contains(id));
        debug!("注销 {} 个事件监听器", ids.len());
    }

    /// 分发事件
    ///
    /// 在快照上分发，监听器可以在回调中安全地触发新的注册
    pub fn publish(&self, event: &RegistryEvent) {
        let snapshot = self.listeners.read().clone();
        let mut stopped = Vec::new();
        for (id, listener) in snapshot {
            if listener.on_event(event) == ListenerControl::Stop {
                debug!("事件监听器已注销: {} ({})", listener.name(), event.name());
                stopped.push(id);
            }
        }
        if !stopped.is_empty() {
            self.listeners
                .write()
                .retain(|(id, _)| !stopped.contains(id));
        }
    }

    /// 当前监听器数量
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
