//! 组件能力接口
//!
//! 组件可以实现这些 trait 以获得注册表回引用或外部工厂。
//! 两者都是非拥有关系，不参与依赖图。

use crate::component::ComponentInstance;
use crate::errors::{BoxError, DependencyError, DependencyResult};
use crate::metadata::TypeInfo;
use std::any::Any;
use std::sync::Arc;

/// 组件查找接口
///
/// 注册表对外暴露的只读查找能力
pub trait ComponentLookup: Send + Sync {
    /// 按限定名称查找
    fn lookup_by_name(&self, name: &str) -> DependencyResult<ComponentInstance>;

    /// 按类型查找
    fn lookup_by_type(&self, type_info: &TypeInfo) -> DependencyResult<ComponentInstance>;

    /// 是否包含指定名称的组件
    fn contains(&self, name: &str) -> bool;
}

/// 类型化查找
///
/// 为所有 [`ComponentLookup`] 提供泛型辅助方法
pub trait TypedLookup: ComponentLookup {
    /// 按类型查找并转换
    fn lookup<T: Any + Send + Sync>(&self) -> DependencyResult<Arc<T>> {
        let type_info = TypeInfo::of::<T>();
        let instance = self.lookup_by_type(&type_info)?;
        downcast_instance(type_info.name, instance)
    }

    /// 按名称查找并转换
    fn lookup_named<T: Any + Send + Sync>(&self, name: &str) -> DependencyResult<Arc<T>> {
        let instance = self.lookup_by_name(name)?;
        downcast_instance(name, instance)
    }
}

impl<L: ComponentLookup + ?Sized> TypedLookup for L {}

fn downcast_instance<T: Any + Send + Sync>(
    name: &str,
    instance: ComponentInstance,
) -> DependencyResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DependencyError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// 注册表感知能力
///
/// 组件构造完成后由 `registry-aware` 处理器回调
pub trait RegistryAware: Send + Sync + 'static {
    fn set_registry(&self, registry: Arc<dyn ComponentLookup>) -> Result<(), BoxError>;
}

/// 外部工厂
///
/// 由外部子系统（调度、缓存等）提供，在任何组件构建前完成初始化
pub trait ExternalFactory: Send + Sync + 'static {
    /// 工厂名称
    fn name(&self) -> &str;

    /// 初始化工厂
    fn initialize(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// 用于向下转换到具体工厂类型
    fn as_any(&self) -> &dyn Any;
}

/// 工厂感知能力
pub trait FactoryAware: Send + Sync + 'static {
    fn set_factory(&self, name: &str, factory: Arc<dyn ExternalFactory>) -> Result<(), BoxError>;
}

/// 外部工厂查找接口
pub trait FactoryLookup: Send + Sync {
    /// 按名称获取已初始化的工厂
    fn factory(&self, name: &str) -> Option<Arc<dyn ExternalFactory>>;

    /// 全部工厂名称（注册顺序）
    fn factory_names(&self) -> Vec<String>;
}
