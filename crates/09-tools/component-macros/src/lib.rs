//! # Component Macros
//!
//! 编译期生成组件注册声明的过程宏。
//!
//! `#[derive(Component)]` 为结构体实现 `infrastructure_common::Component`，
//! 并在程序启动时（通过 `ctor`）把声明提交到全局注册清单，扫描器按模块路径前缀筛选。
//! 使用该宏的 crate 需要同时依赖 `infrastructure-common` 和 `ctor`。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use component_macros::Component;
//! use std::sync::Arc;
//!
//! #[derive(Component, Default)]
//! #[component(markers(configuration))]
//! pub struct AppConfig {
//!     pub url: String,
//! }
//!
//! #[derive(Component)]
//! #[component(name = "userService", lazy, post_construct = "warm_up")]
//! pub struct UserService {
//!     #[inject]
//!     config: Arc<AppConfig>,
//!     hits: usize,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod component;
mod utils;

/// 组件派生宏
///
/// # 类型级参数 `#[component(...)]`
///
/// - `name = "..."` - 组件名称（默认为首字母小写的类型名）
/// - `scope = "singleton" | "prototype"` 或 `prototype` - 作用域
/// - `lazy` - 延迟初始化
/// - `markers(service, repository, ...)` - 注册标记，默认 `component`
/// - `skip_processors("a", "b")` / `skip_all_processors` - 处理器豁免
/// - `post_construct = "method"` - `fn(&mut self) -> Result<(), BoxError>`
/// - `pre_destroy = "method"` - `fn(&self) -> Result<(), BoxError>`
/// - `registry_aware` - 需要实现 `RegistryAware`
/// - `factory_aware = "factory"` - 需要实现 `FactoryAware`，可重复
/// - `listener` - 需要实现 `EventListener`
///
/// # 字段级参数
///
/// - `#[inject]` - 按类型注入 `Arc<T>` 字段
/// - `#[inject(name = "...")]` - 按名称注入
///
/// 含注入字段时生成可注入构造函数，其余字段取 `Default::default()`；
/// 没有注入字段时调用类型自身的 `Default` 实现，因此需要实现 `Default`。
#[proc_macro_derive(Component, attributes(component, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    component::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
