//! 组件处理器链

use di_abstractions::{ComponentProcessor, ProcessorContext};
use infrastructure_common::{
    BoxError, ComponentInstance, DependencyError, DependencyResult, TypeMetadata,
};
use std::sync::Arc;
use tracing::debug;

/// 注册表感知处理器名称
pub const REGISTRY_AWARE_PROCESSOR: &str = "registry-aware";
/// 工厂感知处理器名称
pub const FACTORY_AWARE_PROCESSOR: &str = "factory-aware";

/// 组件处理器链
///
/// 按优先级升序执行，优先级相同时保持注册顺序
#[derive(Clone, Default)]
pub struct ComponentProcessorChain {
    processors: Vec<Arc<dyn ComponentProcessor>>,
}

impl ComponentProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带内置处理器的处理器链
    pub fn with_builtin() -> Self {
        let mut chain = Self::new();
        chain.add(Arc::new(RegistryAwareProcessor));
        chain.add(Arc::new(FactoryAwareProcessor));
        chain
    }

    /// 添加处理器
    pub fn add(&mut self, processor: Arc<dyn ComponentProcessor>) {
        debug!(
            "注册组件处理器: {} (优先级 {})",
            processor.name(),
            processor.priority()
        );
        self.processors.push(processor);
        self.processors.sort_by_key(|p| p.priority());
    }

    /// 处理器名称（执行顺序）
    pub fn names(&self) -> Vec<String> {
        self.processors.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    fn active<'a>(
        &'a self,
        metadata: &'a TypeMetadata,
    ) -> impl Iterator<Item = &'a Arc<dyn ComponentProcessor>> + 'a {
        self.processors
            .iter()
            .filter(move |p| !metadata.exemption.exempts(p.name()))
    }

    /// 执行全部实例化前回调
    ///
    /// 返回 `Some` 表示某个处理器提供了实例
    pub fn apply_before(
        &self,
        metadata: &TypeMetadata,
        context: &ProcessorContext,
    ) -> DependencyResult<Option<ComponentInstance>> {
        let mut current = None;
        for processor in self.active(metadata) {
            current = processor
                .before_component_initialization(metadata, current, context)
                .map_err(|e| Self::processor_error(metadata, processor.as_ref(), e))?;
        }
        Ok(current)
    }

    /// 执行全部实例化后回调，每个处理器都可以替换实例
    pub fn apply_after(
        &self,
        metadata: &TypeMetadata,
        instance: ComponentInstance,
        context: &ProcessorContext,
    ) -> DependencyResult<ComponentInstance> {
        let mut current = instance;
        for processor in self.active(metadata) {
            current = processor
                .after_component_initialization(metadata, current, context)
                .map_err(|e| Self::processor_error(metadata, processor.as_ref(), e))?;
        }
        Ok(current)
    }

    fn processor_error(
        metadata: &TypeMetadata,
        processor: &dyn ComponentProcessor,
        error: BoxError,
    ) -> DependencyError {
        // 处理器内部查找引发的实例化错误和循环错误保持原样
        match error.downcast::<DependencyError>() {
            Ok(inner) => match *inner {
                inner @ (DependencyError::Instantiation { .. }
                | DependencyError::CyclicDependency { .. }) => inner,
                other => DependencyError::instantiation(&metadata.name, processor.name(), other),
            },
            Err(error) => DependencyError::instantiation(&metadata.name, processor.name(), error),
        }
    }
}

impl std::fmt::Debug for ComponentProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentProcessorChain")
            .field("processors", &self.names())
            .finish()
    }
}

/// 注册表感知处理器
///
/// 向声明了注册表感知能力的组件交付非拥有的查找句柄
#[derive(Debug, Default)]
pub struct RegistryAwareProcessor;

impl ComponentProcessor for RegistryAwareProcessor {
    fn name(&self) -> &str {
        REGISTRY_AWARE_PROCESSOR
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn after_component_initialization(
        &self,
        metadata: &TypeMetadata,
        instance: ComponentInstance,
        context: &ProcessorContext,
    ) -> Result<ComponentInstance, BoxError> {
        let capabilities = metadata.handle.capabilities();
        if capabilities.is_registry_aware() {
            capabilities.apply_registry(&instance, Arc::clone(&context.registry))?;
        }
        Ok(instance)
    }
}

/// 工厂感知处理器
///
/// 向组件交付其声明的外部工厂，工厂必须已完成初始化
#[derive(Debug, Default)]
pub struct FactoryAwareProcessor;

impl ComponentProcessor for FactoryAwareProcessor {
    fn name(&self) -> &str {
        FACTORY_AWARE_PROCESSOR
    }

    fn priority(&self) -> i32 {
        i32::MIN + 1
    }

    fn after_component_initialization(
        &self,
        metadata: &TypeMetadata,
        instance: ComponentInstance,
        context: &ProcessorContext,
    ) -> Result<ComponentInstance, BoxError> {
        let capabilities = metadata.handle.capabilities();
        for name in capabilities.required_factories() {
            let factory = context
                .factories
                .factory(name)
                .ok_or_else(|| -> BoxError { format!("外部工厂不存在: {name}").into() })?;
            capabilities.apply_factory(&instance, name, factory)?;
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ranked(&'static str, i32);

    impl ComponentProcessor for Ranked {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }
    }

    #[test]
    fn test_chain_sorts_by_priority_then_registration() {
        let mut chain = ComponentProcessorChain::new();
        chain.add(Arc::new(Ranked("third", 3)));
        chain.add(Arc::new(Ranked("first", 1)));
        chain.add(Arc::new(Ranked("second-a", 2)));
        chain.add(Arc::new(Ranked("second-b", 2)));

        assert_eq!(chain.names(), vec!["first", "second-a", "second-b", "third"]);
    }

    #[test]
    fn test_builtin_processors_run_first() {
        let mut chain = ComponentProcessorChain::with_builtin();
        chain.add(Arc::new(Ranked("caching", -100)));
        assert_eq!(
            chain.names(),
            vec![REGISTRY_AWARE_PROCESSOR, FACTORY_AWARE_PROCESSOR, "caching"]
        );
    }
}
