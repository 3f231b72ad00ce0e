//! 组件扫描器抽象接口
//!
//! 从注册清单中发现带有注册标记的组件

use infrastructure_common::{
    ComponentDeclaration, DependencyError, DependencyResult, Marker, TypeMetadata,
};
use std::collections::BTreeSet;

/// 组件扫描器 trait
pub trait ComponentScanner: Send + Sync {
    /// 扫描指定模块根下的组件
    fn scan(&self, request: &ScanRequest) -> DependencyResult<Vec<TypeMetadata>>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}

/// 声明来源 trait
///
/// 全局清单、显式声明列表等都可以作为扫描输入
pub trait DeclarationSource: Send + Sync {
    /// 按来源顺序返回全部声明
    fn declarations(&self) -> Vec<ComponentDeclaration>;

    /// 来源名称
    fn name(&self) -> &str;
}

/// 扫描请求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// 注册标记（为空表示接受全部标记）
    pub markers: BTreeSet<Marker>,
    /// 模块根路径
    pub roots: Vec<String>,
    /// 调用方模块路径
    pub caller: Option<String>,
}

impl ScanRequest {
    /// 创建空扫描请求
    pub fn new() -> Self {
        Self::default()
    }

    /// 以调用方模块创建扫描请求（通常传入 `module_path!()`）
    pub fn for_caller(caller: impl Into<String>) -> Self {
        Self::new().with_caller(caller)
    }

    /// 添加注册标记
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    /// 添加多个注册标记
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.markers.extend(markers);
        self
    }

    /// 添加模块根路径
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// 添加多个模块根路径
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// 设置调用方模块路径
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// 实际生效的模块根
    ///
    /// 未指定根时使用调用方所在 crate 的根模块
    pub fn effective_roots(&self) -> DependencyResult<Vec<String>> {
        let roots: Vec<String> = self
            .roots
            .iter()
            .map(|root| root.trim().trim_end_matches("::").to_string())
            .filter(|root| !root.is_empty())
            .collect();
        if !roots.is_empty() {
            return Ok(roots);
        }

        let caller = self
            .caller
            .as_deref()
            .ok_or_else(|| DependencyError::InvalidScanRequest {
                message: "未指定模块根路径且缺少调用方模块".to_string(),
            })?;
        let crate_root = caller.split("::").next().unwrap_or(caller).trim();
        if crate_root.is_empty() {
            return Err(DependencyError::InvalidScanRequest {
                message: format!("无效的调用方模块: {caller}"),
            });
        }
        Ok(vec![crate_root.to_string()])
    }

    /// 是否接受带有指定标记集合的声明
    pub fn accepts(&self, markers: &BTreeSet<Marker>) -> bool {
        self.markers.is_empty() || markers.iter().any(|m| self.markers.contains(m))
    }
}

/// 模块路径是否位于某个根下
pub fn module_matches_root(module_path: &str, root: &str) -> bool {
    module_path == root
        || module_path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with("::"))
}
