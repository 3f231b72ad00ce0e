//! # 基础设施组合层
//!
//! 负责把配置、日志和组件注册表组合成一个可运行的应用。
//!
//! ## 主要功能
//!
//! - **配置加载**: 默认值、TOML 文件和 `IOC_` 前缀环境变量
//! - **日志初始化**: 开发/生产预设，可选 JSON 输出
//! - **应用构建器**: 组装声明、处理器、监听器、外部工厂和预置实例
//! - **生命周期管理**: 启动时批量注册，关闭时逆序销毁
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Application::builder("demo")
//!         .for_caller(module_path!())
//!         .with_env_prefix("IOC")
//!         .build()?;
//!
//!     app.start().await?;
//!     app.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;
pub mod logging;
pub mod settings;

pub use application::{Application, ApplicationMetrics, ApplicationStatus};
pub use builder::ApplicationBuilder;
pub use logging::LoggingConfig;
pub use settings::{ContainerSettings, LoggingSettings, ScanSettings, SettingsLoader};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;

#[cfg(test)]
mod tests {
    mod integration_tests;
}
