//! 组件处理器抽象接口

use infrastructure_common::{
    BoxError, ComponentInstance, ComponentLookup, FactoryLookup, TypeMetadata,
};
use std::sync::Arc;

/// 处理器上下文
#[derive(Clone)]
pub struct ProcessorContext {
    /// 注册表的非拥有查找句柄
    pub registry: Arc<dyn ComponentLookup>,
    /// 已初始化的外部工厂
    pub factories: Arc<dyn FactoryLookup>,
}

impl std::fmt::Debug for ProcessorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorContext")
            .field("factories", &self.factories.factory_names())
            .finish_non_exhaustive()
    }
}

/// 组件处理器 trait
///
/// 在每次实例化前后被调用，可以替换传递中的实例
pub trait ComponentProcessor: Send + Sync {
    /// 处理器名称，用于豁免匹配和错误报告
    fn name(&self) -> &str;

    /// 优先级，数值越小越先执行
    fn priority(&self) -> i32 {
        0
    }

    /// 实例化前回调
    ///
    /// 返回 `Some` 时该实例直接作为构造结果，实例工厂不再被调用
    fn before_component_initialization(
        &self,
        _metadata: &TypeMetadata,
        instance: Option<ComponentInstance>,
        _context: &ProcessorContext,
    ) -> Result<Option<ComponentInstance>, BoxError> {
        Ok(instance)
    }

    /// 实例化后回调
    fn after_component_initialization(
        &self,
        _metadata: &TypeMetadata,
        instance: ComponentInstance,
        _context: &ProcessorContext,
    ) -> Result<ComponentInstance, BoxError> {
        Ok(instance)
    }
}
