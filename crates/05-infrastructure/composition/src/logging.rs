//! 日志初始化

use crate::settings::LoggingSettings;
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志过滤（`RUST_LOG` 优先）
    pub filter: String,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 开发环境日志配置
    pub fn development() -> Self {
        Self {
            filter: "debug".to_string(),
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 生产环境日志配置
    pub fn production() -> Self {
        Self {
            filter: "info".to_string(),
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 由配置项生成
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let preset = if settings.json {
            Self::production()
        } else {
            Self::default()
        };
        Self {
            filter: settings.level.clone(),
            ..preset
        }
    }

    fn env_filter(&self) -> InfrastructureResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.filter).map_err(|e| {
                InfrastructureError::ConfigurationError {
                    message: format!("无效的日志级别 {}: {}", self.filter, e),
                }
            }),
        }
    }

    /// 初始化全局日志订阅者
    ///
    /// 全局订阅者只能设置一次，重复调用返回错误
    pub fn init(&self) -> InfrastructureResult<()> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
