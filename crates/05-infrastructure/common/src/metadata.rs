//! 元数据定义
//!
//! 提供组件类型描述（`TypeMetadata`）及其依赖声明

use crate::component::TypeHandle;
use crate::errors::DependencyError;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::BTreeSet;
use std::fmt;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称
    pub name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// 获取声明该类型的模块路径
    pub fn module_path(&self) -> &str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit_once("::").map_or("", |(module, _)| module)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 组件作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentScope {
    /// 单例模式，注册表内唯一实例
    #[default]
    Singleton,
    /// 原型模式，每次查找创建新实例
    Prototype,
}

impl fmt::Display for ComponentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Prototype => f.write_str("prototype"),
        }
    }
}

impl std::str::FromStr for ComponentScope {
    type Err = DependencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "prototype" => Ok(Self::Prototype),
            _ => Err(DependencyError::InvalidDeclaration {
                component: String::new(),
                message: format!("未知的组件作用域: {s}"),
            }),
        }
    }
}

/// 注入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjectionKind {
    /// 构造函数参数
    Constructor,
    /// 字段
    Field,
    /// 方法（setter）
    Method,
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor => f.write_str("constructor"),
            Self::Field => f.write_str("field"),
            Self::Method => f.write_str("method"),
        }
    }
}

/// 依赖目标：按名称或按类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyTarget {
    /// 按组件名称
    Name(String),
    /// 按组件类型
    Type(TypeInfo),
}

impl DependencyTarget {
    /// 按类型依赖
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    /// 按名称依赖
    pub fn named(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl fmt::Display for DependencyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Type(type_info) => write!(f, "<{}>", type_info.name),
        }
    }
}

/// 依赖声明
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRef {
    /// 依赖目标
    pub target: DependencyTarget,
    /// 注入方式
    pub kind: InjectionKind,
    /// 注入点名称（参数名、字段名或方法名）
    pub point: String,
}

impl DependencyRef {
    /// 创建依赖声明
    pub fn new(kind: InjectionKind, point: impl Into<String>, target: DependencyTarget) -> Self {
        Self {
            target,
            kind,
            point: point.into(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.point, self.target)
    }
}

/// 注册标记
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    Component,
    Service,
    Repository,
    Configuration,
    Cache,
    Listener,
    Scheduled,
    Aspect,
    Custom(String),
}

impl Marker {
    /// 按名称解析标记，未知名称视为自定义标记
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "component" => Self::Component,
            "service" => Self::Service,
            "repository" => Self::Repository,
            "configuration" => Self::Configuration,
            "cache" => Self::Cache,
            "listener" => Self::Listener,
            "scheduled" => Self::Scheduled,
            "aspect" => Self::Aspect,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Component => "component",
            Self::Service => "service",
            Self::Repository => "repository",
            Self::Configuration => "configuration",
            Self::Cache => "cache",
            Self::Listener => "listener",
            Self::Scheduled => "scheduled",
            Self::Aspect => "aspect",
            Self::Custom(name) => name,
        };
        f.write_str(name)
    }
}

/// 处理器豁免设置
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessorExemption {
    /// 不豁免
    #[default]
    None,
    /// 豁免全部处理器
    All,
    /// 豁免指定名称的处理器
    Only(BTreeSet<String>),
}

impl ProcessorExemption {
    /// 是否豁免指定处理器
    pub fn exempts(&self, processor: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.contains(processor),
        }
    }
}

/// 构造策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionStrategy {
    /// 指定构造函数 + 有序参数依赖
    Constructor { parameters: Vec<DependencyRef> },
    /// 无参构造，随后执行字段/方法注入
    ZeroArg,
}

/// 组件类型描述
///
/// 扫描阶段创建，依赖图构建后不再变化。`handle` 是声明类型的不透明句柄，
/// 持有构造函数、注入器和生命周期回调。
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    /// 限定名称（注册表内唯一）
    pub name: String,
    /// 类型信息
    pub type_info: TypeInfo,
    /// 声明模块路径
    pub module_path: String,
    /// 作用域
    pub scope: ComponentScope,
    /// 是否延迟初始化
    pub lazy: bool,
    /// 注册标记
    pub markers: BTreeSet<Marker>,
    /// 构造策略
    pub strategy: ConstructionStrategy,
    /// 构造完成后的字段/方法注入点（声明顺序）
    pub injections: Vec<DependencyRef>,
    /// 处理器豁免
    pub exemption: ProcessorExemption,
    /// 类型句柄
    pub handle: TypeHandle,
}

impl TypeMetadata {
    /// 全部依赖声明：先构造函数参数，后字段/方法注入点
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyRef> {
        let parameters: &[DependencyRef] = match &self.strategy {
            ConstructionStrategy::Constructor { parameters } => parameters,
            ConstructionStrategy::ZeroArg => &[],
        };
        parameters.iter().chain(self.injections.iter())
    }

    /// 是否为单例
    pub fn is_singleton(&self) -> bool {
        self.scope == ComponentScope::Singleton
    }

    /// 是否带有指定标记
    pub fn has_marker(&self, marker: &Marker) -> bool {
        self.markers.contains(marker)
    }
}

// 结构相等：比较描述本身，不比较句柄中的函数指针
impl PartialEq for TypeMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_info == other.type_info
            && self.module_path == other.module_path
            && self.scope == other.scope
            && self.lazy == other.lazy
            && self.markers == other.markers
            && self.strategy == other.strategy
            && self.injections == other.injections
            && self.exemption == other.exemption
    }
}
