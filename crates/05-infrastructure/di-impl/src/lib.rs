//! # 依赖注入具体实现
//!
//! 提供组件扫描器、依赖图、实例工厂、处理器链和组件注册表的默认实现。
//!
//! ## 注册流程
//!
//! 1. [`DeclarativeScanner`] 从清单和显式声明中筛选组件
//! 2. [`DependencyGraph`] 解析依赖并给出构建顺序，拒绝循环依赖
//! 3. [`DefaultComponentRegistry`] 按序实例化非延迟单例

pub mod events;
pub mod factory;
pub mod graph;
pub mod processor;
pub mod registry;
pub mod scanner;

pub use events::ListenerRegistry;
pub use factory::DefaultInstanceFactory;
pub use graph::{BuildPlan, DependencyGraph, PlannedComponent, ResolvedDependency};
pub use processor::{
    ComponentProcessorChain, FactoryAwareProcessor, RegistryAwareProcessor,
    FACTORY_AWARE_PROCESSOR, REGISTRY_AWARE_PROCESSOR,
};
pub use registry::{DefaultComponentRegistry, RegistryBuilder, RegistryHandle};
pub use scanner::{DeclarativeScanner, ManifestSource, StaticSource};
