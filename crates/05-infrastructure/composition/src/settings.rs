//! 容器配置加载
//!
//! 依次合并内置默认值、可选的 TOML 配置文件和带前缀的环境变量。
//! 环境变量示例: `IOC_REGISTRY__LAZY_BY_DEFAULT=true`、`IOC_SCAN__ROOTS=app::services,app::jobs`。

use config::{Config, Environment, File, FileFormat};
use di_abstractions::{RegistryConfig, ScanRequest};
use infrastructure_common::{InfrastructureError, InfrastructureResult, Marker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "IOC";

/// 容器配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// 注册表配置
    pub registry: RegistryConfig,
    /// 扫描配置
    pub scan: ScanSettings,
    /// 日志配置
    pub logging: LoggingSettings,
}

/// 扫描配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// 模块根路径，为空时使用调用方所在 crate
    pub roots: Vec<String>,
    /// 注册标记名称，为空时接受全部标记
    pub markers: Vec<String>,
}

impl ScanSettings {
    /// 生成扫描请求
    pub fn to_request(&self, caller: Option<&str>) -> ScanRequest {
        let mut request = ScanRequest::new()
            .with_roots(self.roots.iter().cloned())
            .with_markers(self.markers.iter().map(|name| Marker::from_name(name)));
        if let Some(caller) = caller {
            request = request.with_caller(caller);
        }
        request
    }
}

/// 日志配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 日志级别过滤
    pub level: String,
    /// 是否输出 JSON
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    base: ContainerSettings,
    file: Option<PathBuf>,
    env_prefix: String,
    env_overrides: Option<HashMap<String, String>>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self {
            base: ContainerSettings::default(),
            file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            env_overrides: None,
        }
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置基础配置（优先级最低）
    pub fn with_base(mut self, base: ContainerSettings) -> Self {
        self.base = base;
        self
    }

    /// 设置 TOML 配置文件
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// 设置环境变量前缀
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 用给定的键值代替进程环境变量
    pub fn with_env_overrides(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = Some(vars);
        self
    }

    /// 加载配置
    pub fn load(&self) -> InfrastructureResult<ContainerSettings> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&self.base)
                .map_err(|e| configuration_error("序列化默认配置失败", e))?,
        );

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(InfrastructureError::ConfigurationError {
                    message: format!("配置文件不存在: {}", path.display()),
                });
            }
            info!("加载配置文件: {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("scan.roots")
                .with_list_parse_key("scan.markers")
                .source(self.env_overrides.clone()),
        );

        let settings: ContainerSettings = builder
            .build()
            .map_err(|e| configuration_error("构建配置失败", e))?
            .try_deserialize()
            .map_err(|e| configuration_error("解析配置失败", e))?;

        debug!("容器配置: {:?}", settings);
        Ok(settings)
    }
}

fn configuration_error(context: &str, error: config::ConfigError) -> InfrastructureError {
    InfrastructureError::ConfigurationError {
        message: format!("{context}: {error}"),
    }
}
