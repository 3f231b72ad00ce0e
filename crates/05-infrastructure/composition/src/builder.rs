//! 应用构建器

use crate::application::Application;
use crate::logging::LoggingConfig;
use crate::settings::{ContainerSettings, SettingsLoader};
use di_abstractions::{ComponentProcessor, ComponentRegistry};
use di_impl::DefaultComponentRegistry;
use infrastructure_common::{
    ComponentDeclaration, ComponentInstance, EventListener, ExternalFactory, InfrastructureResult,
    TypeInfo,
};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 日志初始化方式
#[derive(Debug, Clone)]
enum LoggingMode {
    Disabled,
    Explicit(LoggingConfig),
    FromSettings,
}

/// 应用构建器
///
/// 使用建造者模式组装配置、日志和组件注册表
pub struct ApplicationBuilder {
    name: String,
    settings: ContainerSettings,
    settings_file: Option<PathBuf>,
    env_prefix: Option<String>,
    logging: LoggingMode,
    caller: Option<String>,
    include_manifest: bool,
    declarations: Vec<ComponentDeclaration>,
    processors: Vec<Arc<dyn ComponentProcessor>>,
    listeners: Vec<Arc<dyn EventListener>>,
    factories: Vec<Arc<dyn ExternalFactory>>,
    instances: Vec<(String, TypeInfo, ComponentInstance)>,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: ContainerSettings::default(),
            settings_file: None,
            env_prefix: None,
            logging: LoggingMode::Disabled, // 默认不初始化日志
            caller: None,
            include_manifest: true,
            declarations: Vec::new(),
            processors: Vec::new(),
            listeners: Vec::new(),
            factories: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// 使用给定配置
    pub fn with_settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从 TOML 文件加载配置
    pub fn with_settings_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// 从带前缀的环境变量加载配置
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 使用给定日志配置初始化日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = LoggingMode::Explicit(config);
        self
    }

    /// 按加载后的配置初始化日志
    pub fn with_settings_logging(mut self) -> Self {
        self.logging = LoggingMode::FromSettings;
        self
    }

    /// 设置调用方模块，扫描根为空时使用其所在 crate
    pub fn for_caller(mut self, module_path: impl Into<String>) -> Self {
        self.caller = Some(module_path.into());
        self
    }

    /// 添加扫描根
    pub fn scan_root(mut self, root: impl Into<String>) -> Self {
        self.settings.scan.roots.push(root.into());
        self
    }

    /// 添加注册标记过滤
    pub fn scan_marker(mut self, marker: impl Into<String>) -> Self {
        self.settings.scan.markers.push(marker.into());
        self
    }

    /// 不读取全局清单
    pub fn without_manifest(mut self) -> Self {
        self.include_manifest = false;
        self
    }

    /// 添加显式声明
    pub fn with_declaration(mut self, declaration: ComponentDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// 添加多个显式声明
    pub fn with_declarations(mut self, declarations: Vec<ComponentDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// 添加组件处理器
    pub fn with_processor(mut self, processor: Arc<dyn ComponentProcessor>) -> Self {
        debug!("添加组件处理器: {}", processor.name());
        self.processors.push(processor);
        self
    }

    /// 添加事件监听器
    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 添加外部工厂
    pub fn with_external_factory(mut self, factory: Arc<dyn ExternalFactory>) -> Self {
        info!("添加外部工厂: {}", factory.name());
        self.factories.push(factory);
        self
    }

    /// 预置外部实例，覆盖同名扫描组件
    pub fn with_instance<T: Any + Send + Sync>(
        mut self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> Self {
        self.instances
            .push((name.into(), TypeInfo::of::<T>(), instance as ComponentInstance));
        self
    }

    fn load_settings(&self) -> InfrastructureResult<ContainerSettings> {
        if self.settings_file.is_none() && self.env_prefix.is_none() {
            return Ok(self.settings.clone());
        }
        let mut loader = SettingsLoader::new().with_base(self.settings.clone());
        if let Some(path) = &self.settings_file {
            loader = loader.with_file(path);
        }
        if let Some(prefix) = &self.env_prefix {
            loader = loader.with_env_prefix(prefix.as_str());
        }
        loader.load()
    }

    /// 构建应用
    pub fn build(self) -> InfrastructureResult<Application> {
        let settings = self.load_settings()?;

        match &self.logging {
            LoggingMode::Disabled => {}
            LoggingMode::Explicit(config) => config.init()?,
            LoggingMode::FromSettings => LoggingConfig::from_settings(&settings.logging).init()?,
        }
        info!("开始构建应用: {}", self.name);

        let mut builder = DefaultComponentRegistry::builder()
            .with_config(settings.registry.clone())
            .with_declarations(self.declarations);
        if !self.include_manifest {
            builder = builder.without_manifest();
        }
        for processor in self.processors {
            builder = builder.with_processor(processor);
        }
        for listener in self.listeners {
            builder = builder.with_listener(listener);
        }
        let registry = builder.build();

        for factory in self.factories {
            registry.register_factory(factory)?;
        }
        for (name, type_info, instance) in self.instances {
            registry.seed_instance(&name, type_info, instance)?;
        }

        let request = settings.scan.to_request(self.caller.as_deref());
        info!("应用构建完成: {}", self.name);
        Ok(Application::new(self.name, settings, registry, request))
    }
}
