//! 注册表配置与报告

use serde::{Deserialize, Serialize};

/// 注册表配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 是否将所有单例视为延迟初始化
    pub lazy_by_default: bool,
    /// 批次失败时是否销毁已构建的单例
    pub destroy_on_failure: bool,
    /// 是否启用性能监控
    pub enable_performance_monitoring: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 64,
            lazy_by_default: false,
            destroy_on_failure: true,
            enable_performance_monitoring: false,
        }
    }
}

impl RegistryConfig {
    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// 设置默认延迟初始化
    pub fn with_lazy_by_default(mut self, lazy: bool) -> Self {
        self.lazy_by_default = lazy;
        self
    }

    /// 设置失败时销毁
    pub fn with_destroy_on_failure(mut self, destroy: bool) -> Self {
        self.destroy_on_failure = destroy;
        self
    }

    /// 设置性能监控
    pub fn with_performance_monitoring(mut self, enabled: bool) -> Self {
        self.enable_performance_monitoring = enabled;
        self
    }
}

/// 注册报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReport {
    /// 已构建的单例（构建顺序）
    pub built: Vec<String>,
    /// 延迟初始化的单例
    pub deferred: Vec<String>,
    /// 原型组件
    pub prototypes: Vec<String>,
    /// 预置的外部实例
    pub overrides: Vec<String>,
    /// 耗时（毫秒）
    pub elapsed_ms: u64,
}

impl RegistrationReport {
    /// 注册的组件总数（不含预置实例）
    pub fn component_count(&self) -> usize {
        self.built.len() + self.deferred.len() + self.prototypes.len()
    }
}

/// 单个组件的销毁失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownFailure {
    pub component: String,
    pub error: String,
}

/// 销毁报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// 已销毁的组件（销毁顺序）
    pub destroyed: Vec<String>,
    /// 销毁回调失败的组件
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// 是否全部成功
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 注册表统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
    /// 按需构建的延迟单例数量
    pub lazy_builds: usize,
    /// 原型实例构建数量
    pub prototype_builds: usize,
    /// 查找次数
    pub lookups: usize,
    /// 查找错误次数
    pub lookup_errors: usize,
    /// 构建总时间（毫秒，需启用性能监控）
    pub total_build_time_ms: u64,
}
