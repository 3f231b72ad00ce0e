//! 解析上下文
//!
//! 记录当前线程的按需构建链，用于检测循环依赖和限制解析深度

use infrastructure_common::{DependencyError, DependencyResult};

/// 解析上下文
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<String>,
    /// 最大解析深度
    pub max_depth: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            max_depth,
        }
    }

    /// 添加组件到解析链
    ///
    /// 组件已在链上时返回从该组件开始、以其重复出现结尾的路径
    pub fn push(&mut self, name: &str) -> DependencyResult<()> {
        if let Some(start) = self.resolution_chain.iter().position(|n| n == name) {
            let mut path = self.resolution_chain[start..].to_vec();
            path.push(name.to_string());
            return Err(DependencyError::CyclicDependency { path });
        }
        if self.resolution_chain.len() >= self.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                component: name.to_string(),
                limit: self.max_depth,
            });
        }
        self.resolution_chain.push(name.to_string());
        Ok(())
    }

    /// 从解析链中移除组件
    pub fn pop(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    /// 解析链是否为空
    pub fn is_empty(&self) -> bool {
        self.resolution_chain.is_empty()
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(64)
    }
}
