//! # Infrastructure Common
//!
//! 这个 crate 提供了 IoC 容器的公共数据模型和接口。
//!
//! ## 核心组件
//!
//! - [`TypeMetadata`] - 组件类型描述
//! - [`ComponentDeclaration`] - 组件注册声明及构建器
//! - [`ComponentLookup`] / [`RegistryAware`] / [`FactoryAware`] - 组件能力接口
//! - [`EventListener`] - 注册表事件监听
//! - [`DependencyError`] - 错误分类
//!
//! ## 设计原则
//!
//! - 声明式注册清单代替运行时反射
//! - 组件到注册表只持有非拥有的查找句柄
//! - 错误按阶段分类，注册批次失败时不暴露部分容器

pub mod capability;
pub mod component;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod manifest;
pub mod metadata;

pub use capability::*;
pub use component::*;
pub use errors::*;
pub use events::*;
pub use lifecycle::*;
pub use manifest::*;
pub use metadata::*;
