//! 全局注册清单
//!
//! `#[derive(Component)]` 在程序启动时把声明构造函数提交到这里，
//! 扫描器按模块路径前缀从清单中筛选组件。

use crate::component::ComponentDeclaration;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;

/// 清单条目
#[derive(Clone, Copy)]
pub struct ManifestEntry {
    /// 声明所在模块（`module_path!()`）
    pub module_path: &'static str,
    /// 类型名称
    pub type_name: &'static str,
    /// 声明构造函数
    pub declare: fn() -> ComponentDeclaration,
}

impl fmt::Debug for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestEntry")
            .field("module_path", &self.module_path)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// 全局组件清单
static COMPONENT_MANIFEST: Lazy<RwLock<Vec<ManifestEntry>>> =
    Lazy::new(|| RwLock::new(Vec::new()));

/// 提交组件声明
///
/// 同一模块下的同名类型只保留第一次提交
pub fn submit_declaration(entry: ManifestEntry) {
    let mut manifest = COMPONENT_MANIFEST.write();
    let exists = manifest
        .iter()
        .any(|e| e.module_path == entry.module_path && e.type_name == entry.type_name);
    if !exists {
        tracing::debug!(
            "提交组件声明: {}::{}",
            entry.module_path,
            entry.type_name
        );
        manifest.push(entry);
    }
}

/// 获取全部清单条目，按模块路径和类型名排序
pub fn manifest_entries() -> Vec<ManifestEntry> {
    let mut entries = COMPONENT_MANIFEST.read().clone();
    entries.sort_by(|a, b| {
        a.module_path
            .cmp(b.module_path)
            .then_with(|| a.type_name.cmp(b.type_name))
    });
    entries
}
