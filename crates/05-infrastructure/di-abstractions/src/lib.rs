//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`ComponentScanner`] - 组件扫描器接口
//! - [`InstanceFactory`] - 实例工厂接口
//! - [`ComponentProcessor`] - 组件处理器接口
//! - [`ComponentRegistry`] - 组件注册表接口

pub mod container;
pub mod factory;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::*;
pub use factory::*;
pub use processor::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
