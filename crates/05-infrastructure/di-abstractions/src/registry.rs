//! 组件注册表抽象接口

use crate::container::{RegistrationReport, RegistryStats, TeardownReport};
use crate::processor::ComponentProcessor;
use crate::scanner::ScanRequest;
use infrastructure_common::{
    ComponentInstance, ComponentLookup, DependencyResult, EntryStatus, EventListener,
    ExternalFactory, RegistryPhase, TypeInfo,
};
use std::sync::Arc;

/// 组件注册表 trait
///
/// 编排扫描、依赖图排序和按序实例化，持有全部单例
pub trait ComponentRegistry: ComponentLookup {
    /// 预置外部实例
    ///
    /// 只能在 `register_all` 之前调用，预置条目视为已就绪
    fn seed_instance(
        &self,
        name: &str,
        type_info: TypeInfo,
        instance: ComponentInstance,
    ) -> DependencyResult<()>;

    /// 注册组件处理器
    fn register_processor(&self, processor: Arc<dyn ComponentProcessor>) -> DependencyResult<()>;

    /// 注册外部工厂
    fn register_factory(&self, factory: Arc<dyn ExternalFactory>) -> DependencyResult<()>;

    /// 注册事件监听器
    fn register_listener(&self, listener: Arc<dyn EventListener>);

    /// 扫描、排序并构建全部非延迟单例
    ///
    /// 任何构建期错误都会使整个批次失败，不会暴露部分构建的容器
    fn register_all(&self, request: &ScanRequest) -> DependencyResult<RegistrationReport>;

    /// 组件条目状态
    fn status(&self, name: &str) -> Option<EntryStatus>;

    /// 注册表阶段
    fn phase(&self) -> RegistryPhase;

    /// 按构建顺序的逆序销毁全部就绪单例
    fn destroy(&self) -> TeardownReport;

    /// 统计信息快照
    fn stats(&self) -> RegistryStats;
}
