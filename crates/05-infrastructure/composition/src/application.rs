//! 应用主入口

use crate::builder::ApplicationBuilder;
use crate::settings::ContainerSettings;
use di_abstractions::{ComponentRegistry, RegistrationReport, ScanRequest, TeardownReport};
use di_impl::DefaultComponentRegistry;
use infrastructure_common::{
    InfrastructureError, InfrastructureResult, RegistryPhase, TypedLookup,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 应用
///
/// 持有组件注册表，负责启动时批量注册和关闭时逆序销毁
pub struct Application {
    id: Uuid,
    name: String,
    settings: ContainerSettings,
    registry: DefaultComponentRegistry,
    request: ScanRequest,
    status: Arc<RwLock<ApplicationStatus>>,
    metrics: Arc<RwLock<ApplicationMetrics>>,
}

impl Application {
    /// 创建应用构建器
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name)
    }

    pub(crate) fn new(
        name: String,
        settings: ContainerSettings,
        registry: DefaultComponentRegistry,
        request: ScanRequest,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            settings,
            registry,
            request,
            status: Arc::new(RwLock::new(ApplicationStatus::Initialized)),
            metrics: Arc::new(RwLock::new(ApplicationMetrics::default())),
        }
    }

    /// 启动应用：扫描并构建全部非延迟单例
    pub async fn start(&self) -> InfrastructureResult<RegistrationReport> {
        {
            let mut status = self.status.write().await;
            if *status != ApplicationStatus::Initialized {
                return Err(InfrastructureError::BootstrapFailed {
                    message: format!("应用状态为 {:?}, 无法启动", *status),
                });
            }
            *status = ApplicationStatus::Starting;
        }
        info!("启动应用: {} ({})", self.name, self.id);
        self.metrics.write().await.start_time = Some(chrono::Utc::now());

        let registry = self.registry.clone();
        let request = self.request.clone();
        let result = tokio::task::spawn_blocking(move || registry.register_all(&request))
            .await
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("注册任务异常退出: {}", e),
            })
            .and_then(|result| result.map_err(InfrastructureError::from));

        match result {
            Ok(report) => {
                {
                    let mut metrics = self.metrics.write().await;
                    metrics.built_components = report.built.len();
                    metrics.deferred_components = report.deferred.len();
                    metrics.prototype_components = report.prototypes.len();
                }
                *self.status.write().await = ApplicationStatus::Running;
                info!(
                    "应用启动完成: {}, 共 {} 个组件, 耗时 {}ms",
                    self.name,
                    report.component_count(),
                    report.elapsed_ms
                );
                Ok(report)
            }
            Err(e) => {
                error!("应用启动失败: {}", e);
                *self.status.write().await = ApplicationStatus::Failed;
                Err(e)
            }
        }
    }

    /// 停止应用：按构建顺序的逆序销毁单例
    pub async fn stop(&self) -> InfrastructureResult<TeardownReport> {
        {
            let mut status = self.status.write().await;
            if *status == ApplicationStatus::Stopped {
                return Ok(TeardownReport::default());
            }
            *status = ApplicationStatus::Stopping;
        }
        info!("停止应用: {}", self.name);

        let registry = self.registry.clone();
        let report = tokio::task::spawn_blocking(move || registry.destroy())
            .await
            .map_err(|e| InfrastructureError::ShutdownFailed {
                message: format!("销毁任务异常退出: {}", e),
            })?;

        if !report.is_clean() {
            for failure in &report.failures {
                warn!("组件销毁失败: {} ({})", failure.component, failure.error);
            }
        }

        *self.status.write().await = ApplicationStatus::Stopped;
        self.metrics.write().await.stop_time = Some(chrono::Utc::now());
        info!("应用已停止: {}, 销毁 {} 个组件", self.name, report.destroyed.len());
        Ok(report)
    }

    /// 启动应用并等待 Ctrl+C 后关闭
    pub async fn run_until_shutdown(&self) -> InfrastructureResult<TeardownReport> {
        if self.status().await == ApplicationStatus::Initialized {
            self.start().await?;
        }
        info!("应用运行中, 按 Ctrl+C 退出");
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| InfrastructureError::ShutdownFailed {
                message: format!("等待关闭信号失败: {}", e),
            })?;
        info!("收到关闭信号");
        self.stop().await
    }

    /// 按类型查找组件
    pub fn lookup<T: Any + Send + Sync>(&self) -> InfrastructureResult<Arc<T>> {
        Ok(self.registry.lookup::<T>()?)
    }

    /// 按名称查找组件
    pub fn lookup_named<T: Any + Send + Sync>(&self, name: &str) -> InfrastructureResult<Arc<T>> {
        Ok(self.registry.lookup_named::<T>(name)?)
    }

    /// 应用实例ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 应用名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 生效的配置
    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// 组件注册表
    pub fn registry(&self) -> &DefaultComponentRegistry {
        &self.registry
    }

    /// 注册表阶段
    pub fn phase(&self) -> RegistryPhase {
        self.registry.phase()
    }

    /// 运行状态
    pub async fn status(&self) -> ApplicationStatus {
        *self.status.read().await
    }

    /// 统计信息
    pub async fn metrics(&self) -> ApplicationMetrics {
        let mut metrics = self.metrics.read().await.clone();
        let stats = self.registry.stats();
        metrics.registered_components = stats.registered_components;
        metrics.component_lookups = stats.lookups;
        metrics
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// 已初始化
    Initialized,
    /// 启动中
    Starting,
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 失败
    Failed,
}

/// 应用统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    /// 启动时间
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 停止时间
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 已注册的组件数量
    pub registered_components: usize,
    /// 启动时构建的单例数量
    pub built_components: usize,
    /// 延迟单例数量
    pub deferred_components: usize,
    /// 原型组件数量
    pub prototype_components: usize,
    /// 组件查找次数
    pub component_lookups: usize,
}

impl ApplicationMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}
