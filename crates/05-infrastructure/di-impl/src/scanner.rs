//! 声明式组件扫描器
//!
//! 从一个或多个声明来源中筛选位于扫描根下、带有所需标记的组件，
//! 选定构造策略并生成 `TypeMetadata`。

use di_abstractions::{module_matches_root, ComponentScanner, DeclarationSource, ScanRequest};
use infrastructure_common::{
    manifest_entries, ComponentDeclaration, ConstructionStrategy, ConstructorDeclaration,
    DependencyError, DependencyResult, TypeHandle, TypeMetadata,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 全局清单来源
///
/// 读取 `#[derive(Component)]` 在程序启动时提交的声明
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestSource;

impl DeclarationSource for ManifestSource {
    fn declarations(&self) -> Vec<ComponentDeclaration> {
        manifest_entries()
            .into_iter()
            .map(|entry| (entry.declare)())
            .collect()
    }

    fn name(&self) -> &str {
        "manifest"
    }
}

/// 显式声明列表来源
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    declarations: Vec<ComponentDeclaration>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, declarations: Vec<ComponentDeclaration>) -> Self {
        Self {
            name: name.into(),
            declarations,
        }
    }
}

impl DeclarationSource for StaticSource {
    fn declarations(&self) -> Vec<ComponentDeclaration> {
        self.declarations.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 声明式组件扫描器
#[derive(Clone, Default)]
pub struct DeclarativeScanner {
    sources: Vec<Arc<dyn DeclarationSource>>,
}

impl DeclarativeScanner {
    /// 创建没有任何来源的扫描器
    pub fn new() -> Self {
        Self::default()
    }

    /// 以全局清单为来源的扫描器
    pub fn with_manifest() -> Self {
        Self::new().with_source(Arc::new(ManifestSource))
    }

    /// 添加声明来源
    pub fn with_source(mut self, source: Arc<dyn DeclarationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// 添加显式声明
    pub fn with_declarations(self, declarations: Vec<ComponentDeclaration>) -> Self {
        let name = format!("declarations-{}", self.sources.len());
        self.with_source(Arc::new(StaticSource::new(name, declarations)))
    }

    /// 选定构造函数并生成类型描述
    fn to_metadata(declaration: &ComponentDeclaration) -> DependencyResult<TypeMetadata> {
        if declaration.name.trim().is_empty() {
            return Err(DependencyError::InvalidDeclaration {
                component: declaration.type_info.name.to_string(),
                message: "组件名称不能为空".to_string(),
            });
        }

        let (constructor, strategy) = Self::select_constructor(declaration)?;
        let injectors = declaration
            .injections
            .iter()
            .map(|injection| injection.inject.clone())
            .collect();
        let handle = TypeHandle::new(
            constructor.construct.clone(),
            injectors,
            declaration.hooks.clone(),
            declaration.capabilities.clone(),
        );

        Ok(TypeMetadata {
            name: declaration.name.clone(),
            type_info: declaration.type_info.clone(),
            module_path: declaration.module_path.clone(),
            scope: declaration.scope,
            lazy: declaration.lazy,
            markers: declaration.markers.clone(),
            strategy,
            injections: declaration
                .injections
                .iter()
                .map(|injection| injection.dependency.clone())
                .collect(),
            exemption: declaration.exemption.clone(),
            handle,
        })
    }

    fn select_constructor(
        declaration: &ComponentDeclaration,
    ) -> DependencyResult<(&ConstructorDeclaration, ConstructionStrategy)> {
        let injectable: Vec<&ConstructorDeclaration> = declaration
            .constructors
            .iter()
            .filter(|c| c.injectable)
            .collect();

        match injectable.as_slice() {
            [constructor] => Ok((
                *constructor,
                ConstructionStrategy::Constructor {
                    parameters: constructor.parameters.clone(),
                },
            )),
            [] => declaration
                .constructors
                .iter()
                .find(|c| c.parameters.is_empty())
                .map(|c| (c, ConstructionStrategy::ZeroArg))
                .ok_or_else(|| DependencyError::InvalidDeclaration {
                    component: declaration.name.clone(),
                    message: "没有可注入构造函数，也没有无参构造函数".to_string(),
                }),
            many => Err(DependencyError::AmbiguousConstructor {
                component: declaration.name.clone(),
                count: many.len(),
            }),
        }
    }
}

impl ComponentScanner for DeclarativeScanner {
    fn scan(&self, request: &ScanRequest) -> DependencyResult<Vec<TypeMetadata>> {
        let roots = request.effective_roots()?;
        info!("开始扫描组件, 模块根: {:?}", roots);

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut metadata = Vec::new();

        for source in &self.sources {
            for declaration in source.declarations() {
                let in_roots = roots
                    .iter()
                    .any(|root| module_matches_root(&declaration.module_path, root));
                if !in_roots || !request.accepts(&declaration.markers) {
                    continue;
                }

                let location = format!("{} ({})", declaration.type_info.name, source.name());
                if let Some(first) = seen.get(&declaration.name) {
                    return Err(DependencyError::DuplicateComponent {
                        component: declaration.name.clone(),
                        first: first.clone(),
                        second: location,
                    });
                }

                let type_metadata = Self::to_metadata(&declaration)?;
                debug!(
                    "发现组件: {} ({}, {})",
                    type_metadata.name, type_metadata.type_info.name, type_metadata.scope
                );
                seen.insert(declaration.name.clone(), location);
                metadata.push(type_metadata);
            }
        }

        info!("扫描完成, 共发现 {} 个组件", metadata.len());
        Ok(metadata)
    }

    fn name(&self) -> &str {
        "declarative"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure_common::{DependencyTarget, Marker};

    mod app {
        pub mod services {
            #[derive(Default)]
            pub struct Mailer;
        }
        #[derive(Default)]
        pub struct Settings;
    }

    fn settings() -> ComponentDeclaration {
        ComponentDeclaration::builder::<app::Settings>("settings")
            .default_constructor()
            .marker(Marker::Configuration)
            .build()
    }

    fn mailer() -> ComponentDeclaration {
        ComponentDeclaration::builder::<app::services::Mailer>("mailer")
            .default_constructor()
            .build()
    }

    fn root_of(declaration: &ComponentDeclaration) -> String {
        declaration.module_path.clone()
    }

    #[test]
    fn test_scan_filters_by_root_and_marker() {
        let root = root_of(&settings());
        let scanner = DeclarativeScanner::new().with_declarations(vec![settings(), mailer()]);

        let all = scanner.scan(&ScanRequest::new().with_root(&root)).unwrap();
        assert_eq!(
            all.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["settings", "mailer"]
        );

        let nested = scanner
            .scan(&ScanRequest::new().with_root(root_of(&mailer())))
            .unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "mailer");

        let configs = scanner
            .scan(&ScanRequest::new().with_root(&root).with_marker(Marker::Configuration))
            .unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].strategy, ConstructionStrategy::ZeroArg);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let scanner = DeclarativeScanner::new().with_declarations(vec![settings(), mailer()]);
        let request = ScanRequest::new().with_root(root_of(&settings()));
        assert_eq!(scanner.scan(&request).unwrap(), scanner.scan(&request).unwrap());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let duplicate = ComponentDeclaration::builder::<app::services::Mailer>("settings")
            .default_constructor()
            .build();
        let scanner = DeclarativeScanner::new()
            .with_declarations(vec![settings()])
            .with_declarations(vec![duplicate]);

        let error = scanner
            .scan(&ScanRequest::new().with_root(root_of(&settings())))
            .unwrap_err();
        assert!(matches!(
            error,
            DependencyError::DuplicateComponent { ref component, .. } if component == "settings"
        ));
    }

    #[test]
    fn test_two_injectable_constructors_are_ambiguous() {
        let declaration = ComponentDeclaration::builder::<app::services::Mailer>("serviceX")
            .constructor(vec![("settings", DependencyTarget::named("settings"))], |_| {
                Ok(app::services::Mailer)
            })
            .constructor(vec![], |_| Ok(app::services::Mailer))
            .build();
        let scanner = DeclarativeScanner::new().with_declarations(vec![declaration]);

        let error = scanner
            .scan(&ScanRequest::new().with_root(root_of(&mailer())))
            .unwrap_err();
        assert!(matches!(
            error,
            DependencyError::AmbiguousConstructor { ref component, count: 2 }
                if component == "serviceX"
        ));
    }

    #[test]
    fn test_missing_constructor_is_invalid() {
        let declaration =
            ComponentDeclaration::builder::<app::services::Mailer>("mailer").build();
        let scanner = DeclarativeScanner::new().with_declarations(vec![declaration]);

        let error = scanner
            .scan(&ScanRequest::new().with_root(root_of(&mailer())))
            .unwrap_err();
        assert!(matches!(error, DependencyError::InvalidDeclaration { .. }));
    }
}
