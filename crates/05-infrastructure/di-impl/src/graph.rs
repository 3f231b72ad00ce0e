//! 依赖图
//!
//! 把每个组件声明的依赖解析到具体节点，检测循环依赖，
//! 并按声明顺序做深度优先拓扑排序。

use infrastructure_common::{
    ComponentScope, DependencyError, DependencyRef, DependencyResult, DependencyTarget, TypeInfo,
    TypeMetadata,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 解析后的依赖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// 原始依赖声明
    pub reference: DependencyRef,
    /// 目标组件的限定名称
    pub target: String,
    /// 目标是否为预置的外部实例
    pub external: bool,
}

/// 构建计划中的组件
#[derive(Debug, Clone)]
pub struct PlannedComponent {
    pub metadata: Arc<TypeMetadata>,
    /// 延迟单例：跳过批量构建，首次查找时构建
    pub deferred: bool,
    /// 依赖（与 `TypeMetadata::dependencies` 顺序一致）
    pub dependencies: Vec<ResolvedDependency>,
}

impl PlannedComponent {
    /// 是否在批量构建中实例化
    pub fn is_eager(&self) -> bool {
        !self.deferred && self.metadata.scope == ComponentScope::Singleton
    }
}

/// 构建计划：依赖在前、依赖方在后
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub components: Vec<PlannedComponent>,
}

impl BuildPlan {
    /// 按顺序的组件名称
    pub fn names(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|c| c.metadata.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// 依赖图
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<Arc<TypeMetadata>>,
    index: HashMap<String, usize>,
    resolved: Vec<Vec<ResolvedDependency>>,
    /// 节点 -> 其依赖的节点（去重，保持声明顺序）
    adjacency_list: Vec<Vec<usize>>,
    /// 节点 -> 依赖它的节点
    reverse_adjacency_list: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// 构建依赖图
    ///
    /// `externals` 为预置的外部实例，按名称依赖时优先匹配
    pub fn build(
        metadata: Vec<TypeMetadata>,
        externals: &[(String, TypeInfo)],
    ) -> DependencyResult<Self> {
        let nodes: Vec<Arc<TypeMetadata>> = metadata.into_iter().map(Arc::new).collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if let Some(&first) = index.get(&node.name) {
                let first: &Arc<TypeMetadata> = &nodes[first];
                return Err(DependencyError::DuplicateComponent {
                    component: node.name.clone(),
                    first: first.type_info.name.to_string(),
                    second: node.type_info.name.to_string(),
                });
            }
            index.insert(node.name.clone(), i);
        }

        let mut graph = Self {
            resolved: Vec::with_capacity(nodes.len()),
            adjacency_list: vec![Vec::new(); nodes.len()],
            reverse_adjacency_list: vec![Vec::new(); nodes.len()],
            nodes,
            index,
        };

        for i in 0..graph.nodes.len() {
            let node = Arc::clone(&graph.nodes[i]);
            let mut dependencies = Vec::new();
            for reference in node.dependencies() {
                let resolved = graph.resolve(&node, reference, externals)?;
                if !resolved.external {
                    let target = graph.index[&resolved.target];
                    if !graph.adjacency_list[i].contains(&target) {
                        graph.adjacency_list[i].push(target);
                        graph.reverse_adjacency_list[target].push(i);
                    }
                }
                dependencies.push(resolved);
            }
            graph.resolved.push(dependencies);
        }

        Ok(graph)
    }

    fn resolve(
        &self,
        node: &TypeMetadata,
        reference: &DependencyRef,
        externals: &[(String, TypeInfo)],
    ) -> DependencyResult<ResolvedDependency> {
        let unresolved = || DependencyError::UnresolvedDependency {
            component: node.name.clone(),
            dependency: reference.target.to_string(),
        };

        match &reference.target {
            DependencyTarget::Name(name) => {
                if externals.iter().any(|(external, _)| external == name) {
                    return Ok(self.resolved_to(reference, name, true));
                }
                if self.index.contains_key(name) {
                    return Ok(self.resolved_to(reference, name, false));
                }
                Err(unresolved())
            }
            DependencyTarget::Type(type_info) => {
                let mut candidates: Vec<(&str, bool)> = externals
                    .iter()
                    .filter(|(_, info)| info.id == type_info.id)
                    .map(|(name, _)| (name.as_str(), true))
                    .collect();
                candidates.extend(
                    self.nodes
                        .iter()
                        .filter(|n| n.type_info.id == type_info.id)
                        .map(|n| (n.name.as_str(), false)),
                );

                match candidates.as_slice() {
                    [] => Err(unresolved()),
                    [(name, external)] => Ok(self.resolved_to(reference, name, *external)),
                    many => {
                        // 多个候选时按注入点名称消歧
                        if let Some((name, external)) =
                            many.iter().find(|(name, _)| *name == reference.point)
                        {
                            return Ok(self.resolved_to(reference, name, *external));
                        }
                        Err(DependencyError::AmbiguousDependency {
                            component: node.name.clone(),
                            dependency: reference.target.to_string(),
                            candidates: many.iter().map(|(name, _)| name.to_string()).collect(),
                        })
                    }
                }
            }
        }
    }

    fn resolved_to(
        &self,
        reference: &DependencyRef,
        target: &str,
        external: bool,
    ) -> ResolvedDependency {
        ResolvedDependency {
            reference: reference.clone(),
            target: target.to_string(),
            external,
        }
    }

    /// 拓扑排序
    ///
    /// 按声明顺序依次从每个未访问节点开始深度优先遍历；
    /// 遇到当前路径上的节点时返回完整循环路径。
    /// 遍历使用显式栈，依赖链长度不受线程栈大小限制。
    pub fn topological_order(&self) -> DependencyResult<Vec<usize>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        // 当前路径：(节点, 下一条待访问的边)
        let mut path: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::Visiting;
            path.push((start, 0));

            while let Some(&(node, next)) = path.last() {
                let Some(&dependency) = self.adjacency_list[node].get(next) else {
                    path.pop();
                    marks[node] = Mark::Done;
                    order.push(node);
                    continue;
                };
                if let Some(top) = path.last_mut() {
                    top.1 += 1;
                }

                match marks[dependency] {
                    Mark::Done => {}
                    Mark::Visiting => return Err(self.cycle_error(&path, dependency)),
                    Mark::Unvisited => {
                        marks[dependency] = Mark::Visiting;
                        path.push((dependency, 0));
                    }
                }
            }
        }
        Ok(order)
    }

    fn cycle_error(&self, path: &[(usize, usize)], closing: usize) -> DependencyError {
        let start = path.iter().position(|&(n, _)| n == closing).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&(n, _)| self.nodes[n].name.clone())
            .collect();
        cycle.push(self.nodes[closing].name.clone());
        DependencyError::Cycle { path: cycle }
    }

    /// 生成构建计划，依赖图随之丢弃
    pub fn into_plan(self) -> DependencyResult<BuildPlan> {
        let order = self.topological_order()?;
        let components = order
            .into_iter()
            .map(|i| {
                let metadata = Arc::clone(&self.nodes[i]);
                PlannedComponent {
                    deferred: metadata.lazy && metadata.scope == ComponentScope::Singleton,
                    dependencies: self.resolved[i].clone(),
                    metadata,
                }
            })
            .collect::<Vec<_>>();
        debug!(
            "构建顺序: {:?}",
            components.iter().map(|c| c.metadata.name.as_str()).collect::<Vec<_>>()
        );
        Ok(BuildPlan { components })
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 组件的直接依赖（包括外部实例）
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&i| self.resolved[i].iter().map(|d| d.target.clone()).collect())
            .unwrap_or_default()
    }

    /// 直接依赖该组件的组件
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&i| {
                self.reverse_adjacency_list[i]
                    .iter()
                    .map(|&d| self.nodes[d].name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{ComponentScanner, ScanRequest};
    use crate::scanner::DeclarativeScanner;
    use infrastructure_common::ComponentDeclaration;

    struct Node;
    struct Other;

    /// 声明一个依赖若干名称的组件
    fn node(name: &str, deps: &[&str]) -> ComponentDeclaration {
        let parameters = deps
            .iter()
            .map(|d| (*d, DependencyTarget::named(*d)))
            .collect();
        ComponentDeclaration::builder::<Node>(name)
            .constructor(parameters, |_| Ok(Node))
            .build()
    }

    fn metadata(declarations: Vec<ComponentDeclaration>) -> Vec<TypeMetadata> {
        let root = declarations[0].module_path.clone();
        DeclarativeScanner::new()
            .with_declarations(declarations)
            .scan(&ScanRequest::new().with_root(root))
            .unwrap()
    }

    fn order(declarations: Vec<ComponentDeclaration>) -> DependencyResult<Vec<String>> {
        let plan = DependencyGraph::build(metadata(declarations), &[])?.into_plan()?;
        Ok(plan.names())
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let names = order(vec![
            node("serviceB", &["serviceA", "config"]),
            node("serviceA", &["config"]),
            node("config", &[]),
        ])
        .unwrap();
        assert_eq!(names, vec!["config", "serviceA", "serviceB"]);
    }

    #[test]
    fn test_independent_roots_keep_declaration_order() {
        let names = order(vec![node("c", &[]), node("a", &[]), node("b", &[])]).unwrap();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_direct_cycle_path() {
        let error = order(vec![node("a", &["b"]), node("b", &["a"])]).unwrap_err();
        match error {
            DependencyError::Cycle { path } => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transitive_cycle_path_excludes_entry_node() {
        let error = order(vec![
            node("entry", &["a"]),
            node("a", &["b"]),
            node("b", &["c"]),
            node("c", &["a"]),
        ])
        .unwrap_err();
        match error {
            DependencyError::Cycle { path } => assert_eq!(path, vec!["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let error = order(vec![node("loop", &["loop"])]).unwrap_err();
        assert!(matches!(error, DependencyError::Cycle { ref path } if path == &["loop", "loop"]));
    }

    #[test]
    fn test_unresolved_dependency() {
        let error = order(vec![node("a", &["missing"])]).unwrap_err();
        assert!(matches!(
            error,
            DependencyError::UnresolvedDependency { ref component, .. } if component == "a"
        ));
    }

    #[test]
    fn test_externals_satisfy_dependencies() {
        let externals = vec![("environment".to_string(), TypeInfo::of::<Other>())];
        let graph =
            DependencyGraph::build(metadata(vec![node("a", &["environment"])]), &externals)
                .unwrap();
        assert_eq!(graph.dependencies_of("a"), vec!["environment"]);
        let plan = graph.into_plan().unwrap();
        assert!(plan.components[0].dependencies[0].external);
    }

    #[test]
    fn test_by_type_ambiguity_and_point_name_disambiguation() {
        let consumer = |point: &str| {
            ComponentDeclaration::builder::<Other>("consumer")
                .constructor(vec![(point, DependencyTarget::of::<Node>())], |_| Ok(Other))
                .build()
        };

        let error = DependencyGraph::build(
            metadata(vec![consumer("node"), node("first", &[]), node("second", &[])]),
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            error,
            DependencyError::AmbiguousDependency { ref candidates, .. } if candidates.len() == 2
        ));

        let graph = DependencyGraph::build(
            metadata(vec![consumer("second"), node("first", &[]), node("second", &[])]),
            &[],
        )
        .unwrap();
        assert_eq!(graph.dependencies_of("consumer"), vec!["second"]);
        assert_eq!(graph.dependents_of("second"), vec!["consumer"]);
    }

    #[test]
    fn test_long_chain_does_not_exhaust_small_stack() {
        const LENGTH: usize = 20_000;
        let names = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let names: Vec<String> = (0..LENGTH).map(|i| format!("n{i}")).collect();
                let declarations = (0..LENGTH)
                    .rev()
                    .map(|i| match i {
                        0 => node(&names[0], &[]),
                        _ => node(&names[i], &[names[i - 1].as_str()]),
                    })
                    .collect();
                order(declarations)
            })
            .unwrap()
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(names.len(), LENGTH);
        assert_eq!(names[0], "n0");
        assert_eq!(names[LENGTH - 1], format!("n{}", LENGTH - 1));
    }

    #[test]
    fn test_topological_invariant_on_generated_dags() {
        // 线性同余生成器产生确定的随机 DAG：节点只依赖编号更小的节点
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for size in [5usize, 12, 30] {
            let mut declarations = Vec::new();
            let mut edges: Vec<(String, Vec<String>)> = Vec::new();
            for i in (0..size).rev() {
                let mut deps = Vec::new();
                for j in 0..i {
                    seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                    if (seed >> 33) % 3 == 0 {
                        deps.push(format!("n{j}"));
                    }
                }
                let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
                declarations.push(node(&format!("n{i}"), &dep_refs));
                edges.push((format!("n{i}"), deps));
            }

            let names = order(declarations).unwrap();
            let position = |name: &str| names.iter().position(|n| n == name).unwrap();
            for (name, deps) in &edges {
                for dep in deps {
                    assert!(position(dep) < position(name), "{dep} 应在 {name} 之前");
                }
            }
        }
    }
}
