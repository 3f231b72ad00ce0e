//! 实例工厂抽象接口

use infrastructure_common::{ComponentInstance, DependencyRef, DependencyResult, TypeMetadata};

/// 依赖解析回调
pub type ResolveFn<'a> = dyn FnMut(&DependencyRef) -> DependencyResult<ComponentInstance> + 'a;

/// 实例工厂 trait
///
/// 按构造策略为单个 `TypeMetadata` 创建并装配实例
pub trait InstanceFactory: Send + Sync {
    /// 创建实例
    ///
    /// 成功时所有声明的依赖都已注入且 post-construct 回调已执行；
    /// 失败时实例被丢弃。
    fn instantiate(
        &self,
        metadata: &TypeMetadata,
        resolve: &mut ResolveFn<'_>,
    ) -> DependencyResult<ComponentInstance>;
}
