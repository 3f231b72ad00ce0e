//! 错误类型定义

use thiserror::Error;

/// 用户钩子（构造函数、注入器、生命周期回调、处理器）返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 错误分类
///
/// 与容器的各个阶段一一对应，用于决定错误是否对整个注册批次致命
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 发现阶段错误：注册输入不合法
    Discovery,
    /// 解析阶段错误：依赖图结构问题
    Resolution,
    /// 实例化阶段错误：单个组件构造、注入或钩子失败
    Instantiation,
    /// 查找阶段错误：仅影响单次查找调用
    Lookup,
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("扫描请求无效: {message}")]
    InvalidScanRequest { message: String },

    #[error("组件声明无效: {component}, 原因: {message}")]
    InvalidDeclaration { component: String, message: String },

    #[error("组件存在多个可注入构造函数: {component} (共 {count} 个)")]
    AmbiguousConstructor { component: String, count: usize },

    #[error("组件名称重复: {component} (声明位置: {first}, {second})")]
    DuplicateComponent {
        component: String,
        first: String,
        second: String,
    },

    #[error("无法解析依赖: {component} 需要 {dependency}")]
    UnresolvedDependency {
        component: String,
        dependency: String,
    },

    #[error("依赖存在多个候选: {component} 需要 {dependency}, 候选: {candidates:?}")]
    AmbiguousDependency {
        component: String,
        dependency: String,
        candidates: Vec<String>,
    },

    #[error("检测到循环依赖: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("外部工厂初始化失败: {factory}, 原因: {source}")]
    FactoryInitialization {
        factory: String,
        #[source]
        source: BoxError,
    },

    #[error("组件实例化失败: {component} [{point}], 原因: {source}")]
    Instantiation {
        component: String,
        point: String,
        #[source]
        source: BoxError,
    },

    #[error("组件不存在: {name}")]
    NotFound { name: String },

    #[error("组件类型存在多个实例: {type_name}, 候选: {candidates:?}")]
    AmbiguousComponent {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("按需构建时检测到循环依赖: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("解析深度超出上限 {limit}: {component}")]
    ResolutionDepthExceeded { component: String, limit: usize },

    #[error("组件类型不匹配: {name}, 期望类型: {expected}")]
    TypeMismatch { name: String, expected: String },

    #[error("注册表尚未就绪, 当前阶段: {phase}")]
    RegistryNotReady { phase: String },

    #[error("当前阶段不允许执行 {operation}: {phase}")]
    IllegalPhase { operation: String, phase: String },

    #[error("注册表已释放")]
    RegistryDropped,
}

impl DependencyError {
    /// 错误所属的阶段分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidScanRequest { .. }
            | Self::InvalidDeclaration { .. }
            | Self::AmbiguousConstructor { .. }
            | Self::DuplicateComponent { .. } => ErrorKind::Discovery,
            Self::UnresolvedDependency { .. }
            | Self::AmbiguousDependency { .. }
            | Self::Cycle { .. } => ErrorKind::Resolution,
            Self::FactoryInitialization { .. } | Self::Instantiation { .. } => {
                ErrorKind::Instantiation
            }
            Self::NotFound { .. }
            | Self::AmbiguousComponent { .. }
            | Self::CyclicDependency { .. }
            | Self::ResolutionDepthExceeded { .. }
            | Self::TypeMismatch { .. }
            | Self::RegistryNotReady { .. }
            | Self::IllegalPhase { .. }
            | Self::RegistryDropped => ErrorKind::Lookup,
        }
    }

    /// 出错组件名称（如果错误与某个组件相关）
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::InvalidDeclaration { component, .. }
            | Self::AmbiguousConstructor { component, .. }
            | Self::DuplicateComponent { component, .. }
            | Self::UnresolvedDependency { component, .. }
            | Self::AmbiguousDependency { component, .. }
            | Self::Instantiation { component, .. }
            | Self::ResolutionDepthExceeded { component, .. } => Some(component),
            Self::NotFound { name } | Self::TypeMismatch { name, .. } => Some(name),
            Self::Cycle { path } | Self::CyclicDependency { path } => {
                path.first().map(String::as_str)
            }
            _ => None,
        }
    }

    /// 创建实例化错误
    pub fn instantiation(
        component: impl Into<String>,
        point: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Instantiation {
            component: component.into(),
            point: point.into(),
            source: source.into(),
        }
    }

    /// 创建组件不存在错误
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

/// 构造参数错误
///
/// 由 [`crate::Arguments`] 在取出构造参数时返回，携带出错的注入点名称
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("构造参数不足: 第 {index} 个参数不存在")]
    Missing { index: usize },

    #[error("构造参数类型不匹配: {point}, 期望类型: {expected}")]
    TypeMismatch { point: String, expected: String },
}

impl ArgumentError {
    /// 出错的注入点名称
    pub fn point(&self) -> Option<&str> {
        match self {
            Self::Missing { .. } => None,
            Self::TypeMismatch { point, .. } => Some(point),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("配置加载失败: {message}")]
    ConfigurationError { message: String },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
