//! 默认组件注册表
//!
//! 编排扫描 -> 依赖图 -> 按序实例化，持有全部单例并在关闭时逆序销毁。
//! 批量注册只在一个线程上执行；注册完成后单例查找可并发，
//! 延迟单例按条目串行构建，保证每个条目最多构建一次。

use crate::events::ListenerRegistry;
use crate::factory::DefaultInstanceFactory;
use crate::graph::{DependencyGraph, PlannedComponent, ResolvedDependency};
use crate::processor::ComponentProcessorChain;
use crate::scanner::DeclarativeScanner;
use dashmap::DashMap;
use di_abstractions::{
    ComponentProcessor, ComponentRegistry, ComponentScanner, InstanceFactory, ProcessorContext,
    RegistrationReport, RegistryConfig, RegistryStats, ResolveContext, ScanRequest,
    TeardownFailure, TeardownReport,
};
use infrastructure_common::{
    BoxError, ComponentDeclaration, ComponentInstance, ComponentLookup, ComponentScope,
    DependencyError, DependencyRef, DependencyResult, EntryStatus, EventListener,
    ExternalFactory, FactoryLookup, RegistryEvent, RegistryPhase, TypeInfo, TypeMetadata,
};
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 预置的外部实例
struct ExternalInstance {
    type_info: TypeInfo,
    instance: ComponentInstance,
}

struct EntryState {
    status: EntryStatus,
    /// 处理器替换前的实例，销毁回调作用于它
    raw: Option<ComponentInstance>,
    /// 对外暴露的实例
    exposed: Option<ComponentInstance>,
}

/// 注册表条目
struct Entry {
    metadata: Arc<TypeMetadata>,
    dependencies: Vec<ResolvedDependency>,
    deferred: bool,
    state: RwLock<EntryState>,
    build_guard: Mutex<()>,
}

impl Entry {
    fn new(planned: PlannedComponent) -> Self {
        Self {
            metadata: planned.metadata,
            dependencies: planned.dependencies,
            deferred: planned.deferred,
            state: RwLock::new(EntryState {
                status: EntryStatus::Uninitialized,
                raw: None,
                exposed: None,
            }),
            build_guard: Mutex::new(()),
        }
    }

    fn status(&self) -> EntryStatus {
        self.state.read().status
    }

    fn ready_instance(&self) -> Option<ComponentInstance> {
        let state = self.state.read();
        if state.status == EntryStatus::Ready {
            state.exposed.clone()
        } else {
            None
        }
    }

    fn transition(&self, next: EntryStatus) {
        let mut state = self.state.write();
        debug_assert!(
            state.status.can_transition_to(next),
            "非法状态转换: {} -> {}",
            state.status,
            next
        );
        state.status = next;
    }
}

/// 外部工厂注册表
#[derive(Default)]
struct FactoryRegistry {
    factories: RwLock<Vec<Arc<dyn ExternalFactory>>>,
}

impl FactoryRegistry {
    fn register(&self, factory: Arc<dyn ExternalFactory>) -> DependencyResult<()> {
        let mut factories = self.factories.write();
        if factories.iter().any(|f| f.name() == factory.name()) {
            return Err(DependencyError::InvalidDeclaration {
                component: factory.name().to_string(),
                message: "外部工厂名称重复".to_string(),
            });
        }
        debug!("注册外部工厂: {}", factory.name());
        factories.push(factory);
        Ok(())
    }

    /// 按注册顺序初始化全部工厂
    fn initialize_all(&self) -> DependencyResult<()> {
        let factories = self.factories.read().clone();
        for factory in factories {
            factory
                .initialize()
                .map_err(|source| DependencyError::FactoryInitialization {
                    factory: factory.name().to_string(),
                    source,
                })?;
            debug!("外部工厂初始化完成: {}", factory.name());
        }
        Ok(())
    }
}

impl FactoryLookup for FactoryRegistry {
    fn factory(&self, name: &str) -> Option<Arc<dyn ExternalFactory>> {
        self.factories
            .read()
            .iter()
            .find(|f| f.name() == name)
            .cloned()
    }

    fn factory_names(&self) -> Vec<String> {
        self.factories
            .read()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }
}

#[derive(Default)]
struct StatsCounters {
    lookups: AtomicUsize,
    lookup_errors: AtomicUsize,
    lazy_builds: AtomicUsize,
    prototype_builds: AtomicUsize,
    build_time_ms: AtomicU64,
}

struct RegistryInner {
    config: RegistryConfig,
    scanner: Arc<dyn ComponentScanner>,
    factory: Arc<dyn InstanceFactory>,
    processors: RwLock<ComponentProcessorChain>,
    listeners: ListenerRegistry,
    /// 由组件注册的监听器标识，批次回滚时注销
    component_listeners: Mutex<Vec<u64>>,
    factories: Arc<FactoryRegistry>,
    phase: RwLock<RegistryPhase>,
    entries: DashMap<String, Arc<Entry>>,
    externals: RwLock<Vec<(String, ExternalInstance)>>,
    by_type: RwLock<HashMap<TypeId, Vec<String>>>,
    creation_order: Mutex<Vec<String>>,
    /// 每个线程当前的按需构建链
    chains: Mutex<HashMap<ThreadId, ResolveContext>>,
    stats: StatsCounters,
    handle: Weak<RegistryInner>,
}

impl RegistryInner {
    fn phase(&self) -> RegistryPhase {
        *self.phase.read()
    }

    fn ensure_open(&self, operation: &str) -> DependencyResult<()> {
        let phase = self.phase();
        if phase == RegistryPhase::Open {
            Ok(())
        } else {
            Err(DependencyError::IllegalPhase {
                operation: operation.to_string(),
                phase: phase.to_string(),
            })
        }
    }

    /// 外部调用方只能在 Ready 阶段查找；回引用句柄在注册批次中也可查找
    fn ensure_lookup(&self, internal: bool) -> DependencyResult<()> {
        match self.phase() {
            RegistryPhase::Ready => Ok(()),
            RegistryPhase::Initializing if internal => Ok(()),
            phase => Err(DependencyError::RegistryNotReady {
                phase: phase.to_string(),
            }),
        }
    }

    fn entry(&self, name: &str) -> Option<Arc<Entry>> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    fn external(&self, name: &str) -> Option<ComponentInstance> {
        self.externals
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| Arc::clone(&e.instance))
    }

    fn candidates(&self, type_info: &TypeInfo) -> Vec<String> {
        let mut names: Vec<String> = self
            .externals
            .read()
            .iter()
            .filter(|(_, e)| e.type_info.id == type_info.id)
            .map(|(n, _)| n.clone())
            .collect();
        if let Some(registered) = self.by_type.read().get(&type_info.id) {
            names.extend(registered.iter().cloned());
        }
        names
    }

    fn record_lookup<T>(&self, result: DependencyResult<T>) -> DependencyResult<T> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        if let Err(error) = &result {
            self.stats.lookup_errors.fetch_add(1, Ordering::Relaxed);
            debug!("组件查找失败: {error}");
        }
        result
    }

    fn lookup_name(&self, name: &str, internal: bool) -> DependencyResult<ComponentInstance> {
        let result = self.ensure_lookup(internal).and_then(|()| self.obtain(name));
        self.record_lookup(result)
    }

    fn lookup_type(
        &self,
        type_info: &TypeInfo,
        internal: bool,
    ) -> DependencyResult<ComponentInstance> {
        let result = self.ensure_lookup(internal).and_then(|()| {
            let candidates = self.candidates(type_info);
            match candidates.len() {
                0 => Err(DependencyError::not_found(type_info.name)),
                1 => self.obtain(&candidates[0]),
                _ => Err(DependencyError::AmbiguousComponent {
                    type_name: type_info.name.to_string(),
                    candidates,
                }),
            }
        });
        self.record_lookup(result)
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.external(name).is_some()
    }

    /// 获取实例：预置实例、就绪单例直接返回，其余按需构建
    fn obtain(&self, name: &str) -> DependencyResult<ComponentInstance> {
        if let Some(instance) = self.external(name) {
            return Ok(instance);
        }
        let entry = self
            .entry(name)
            .ok_or_else(|| DependencyError::not_found(name))?;

        if entry.metadata.scope == ComponentScope::Prototype {
            return self.build_prototype(&entry);
        }
        if let Some(instance) = entry.ready_instance() {
            return Ok(instance);
        }
        self.build_singleton(&entry)
    }

    /// 把组件加入当前线程的构建链
    fn enter(&self, name: &str) -> DependencyResult<()> {
        let id = thread::current().id();
        let mut chains = self.chains.lock();
        let context = chains
            .entry(id)
            .or_insert_with(|| ResolveContext::new(self.config.max_resolution_depth));
        let result = context.push(name);
        if result.is_err() && context.is_empty() {
            chains.remove(&id);
        }
        result
    }

    fn exit(&self) {
        let id = thread::current().id();
        let mut chains = self.chains.lock();
        if let Some(context) = chains.get_mut(&id) {
            context.pop();
            if context.is_empty() {
                chains.remove(&id);
            }
        }
    }

    fn build_singleton(&self, entry: &Arc<Entry>) -> DependencyResult<ComponentInstance> {
        self.enter(&entry.metadata.name)?;
        let result = self.build_singleton_guarded(entry);
        self.exit();
        result
    }

    fn build_singleton_guarded(&self, entry: &Arc<Entry>) -> DependencyResult<ComponentInstance> {
        let name = entry.metadata.name.as_str();
        let _guard = entry.build_guard.lock();

        // 其他线程可能已经完成构建
        match entry.status() {
            EntryStatus::Uninitialized => {}
            EntryStatus::Ready => {
                return entry
                    .ready_instance()
                    .ok_or_else(|| DependencyError::not_found(name));
            }
            status => {
                return Err(DependencyError::IllegalPhase {
                    operation: format!("构建组件 {name}"),
                    phase: status.to_string(),
                });
            }
        }

        entry.transition(EntryStatus::Initializing);
        debug!("开始构建组件: {name}");

        match self.create(entry) {
            Ok((raw, exposed)) => {
                {
                    let mut state = entry.state.write();
                    state.raw = Some(Arc::clone(&raw));
                    state.exposed = Some(Arc::clone(&exposed));
                    state.status = EntryStatus::Ready;
                }
                self.creation_order.lock().push(name.to_string());
                if entry.deferred {
                    self.stats.lazy_builds.fetch_add(1, Ordering::Relaxed);
                }
                self.on_ready(entry, &raw, &exposed);
                Ok(exposed)
            }
            Err(error) => {
                if self.phase() == RegistryPhase::Initializing {
                    entry.transition(EntryStatus::Failed);
                    error!("组件构建失败: {name}, 原因: {error}");
                } else {
                    entry.transition(EntryStatus::Uninitialized);
                    warn!("延迟组件构建失败: {name}, 原因: {error}");
                }
                Err(error)
            }
        }
    }

    fn build_prototype(&self, entry: &Arc<Entry>) -> DependencyResult<ComponentInstance> {
        let name = entry.metadata.name.as_str();
        self.enter(name)?;
        let result = self.create(entry).map(|(_, exposed)| exposed);
        self.exit();
        if result.is_ok() {
            self.stats.prototype_builds.fetch_add(1, Ordering::Relaxed);
            debug!("原型组件实例已创建: {name}");
        }
        result
    }

    /// 处理器 before -> 实例工厂 -> 处理器 after
    fn create(&self, entry: &Entry) -> DependencyResult<(ComponentInstance, ComponentInstance)> {
        let metadata = entry.metadata.as_ref();
        let processors = self.processors.read().clone();
        let context = self.processor_context();
        let started = self
            .config
            .enable_performance_monitoring
            .then(Instant::now);

        let raw = match processors.apply_before(metadata, &context)? {
            Some(supplied) => {
                debug!("组件实例由处理器提供: {}", metadata.name);
                supplied
            }
            None => self
                .factory
                .instantiate(metadata, &mut |reference: &DependencyRef| {
                    self.resolve_dependency(entry, reference)
                })?,
        };
        let exposed = processors.apply_after(metadata, Arc::clone(&raw), &context)?;

        if let Some(started) = started {
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            self.stats.build_time_ms.fetch_add(elapsed, Ordering::Relaxed);
            debug!("组件 {} 构建耗时 {}ms", metadata.name, elapsed);
        }
        Ok((raw, exposed))
    }

    fn resolve_dependency(
        &self,
        entry: &Entry,
        reference: &DependencyRef,
    ) -> DependencyResult<ComponentInstance> {
        let target = entry
            .dependencies
            .iter()
            .find(|d| &d.reference == reference)
            .map(|d| d.target.as_str())
            .ok_or_else(|| DependencyError::UnresolvedDependency {
                component: entry.metadata.name.clone(),
                dependency: reference.target.to_string(),
            })?;
        self.obtain(target)
    }

    fn processor_context(&self) -> ProcessorContext {
        ProcessorContext {
            registry: Arc::new(RegistryHandle {
                inner: self.handle.clone(),
            }),
            factories: Arc::clone(&self.factories) as Arc<dyn FactoryLookup>,
        }
    }

    fn on_ready(&self, entry: &Entry, raw: &ComponentInstance, exposed: &ComponentInstance) {
        let name = &entry.metadata.name;
        debug!("组件已就绪: {name}");
        self.listeners.publish(&RegistryEvent::ComponentReady {
            name: name.clone(),
            instance: Arc::clone(exposed),
        });

        let capabilities = entry.metadata.handle.capabilities();
        if capabilities.is_listener() {
            match capabilities
                .as_listener(exposed)
                .or_else(|| capabilities.as_listener(raw))
            {
                Some(listener) => {
                    let id = self.listeners.register(listener);
                    self.component_listeners.lock().push(id);
                }
                None => warn!("组件声明为监听器但实例类型不匹配: {name}"),
            }
        }
    }

    fn run_batch(&self, request: &ScanRequest) -> DependencyResult<RegistrationReport> {
        let mut metadata = self.scanner.scan(request)?;

        let externals: Vec<(String, TypeInfo)> = self
            .externals
            .read()
            .iter()
            .map(|(name, e)| (name.clone(), e.type_info.clone()))
            .collect();
        metadata.retain(|m| {
            let overridden = externals.iter().any(|(name, _)| name == &m.name);
            if overridden {
                info!("组件被预置实例覆盖: {}", m.name);
            }
            !overridden
        });
        if self.config.lazy_by_default {
            metadata
                .iter_mut()
                .filter(|m| m.is_singleton())
                .for_each(|m| m.lazy = true);
        }

        let plan = DependencyGraph::build(metadata, &externals)?.into_plan()?;
        self.factories.initialize_all()?;

        let mut report = RegistrationReport {
            overrides: externals.into_iter().map(|(name, _)| name).collect(),
            ..RegistrationReport::default()
        };
        let mut eager = Vec::new();
        {
            let mut by_type = self.by_type.write();
            for planned in plan.components {
                let name = planned.metadata.name.clone();
                by_type
                    .entry(planned.metadata.type_info.id)
                    .or_default()
                    .push(name.clone());
                if planned.metadata.scope == ComponentScope::Prototype {
                    report.prototypes.push(name.clone());
                } else if planned.deferred {
                    report.deferred.push(name.clone());
                } else {
                    eager.push(name.clone());
                }
                self.entries.insert(name, Arc::new(Entry::new(planned)));
            }
        }

        for name in &eager {
            self.obtain(name)?;
        }

        report.built = self.creation_order.lock().clone();
        Ok(report)
    }

    /// 批次失败后的回滚：逆序销毁已构建单例并丢弃全部条目
    fn rollback(&self) {
        let registered = std::mem::take(&mut *self.component_listeners.lock());
        self.listeners.remove(&registered);

        let built = std::mem::take(&mut *self.creation_order.lock());
        if self.config.destroy_on_failure {
            for name in built.iter().rev() {
                if let Some(entry) = self.entry(name) {
                    if let Err(error) = Self::destroy_entry(&entry) {
                        warn!("回滚时组件销毁失败: {name}, 原因: {error}");
                    }
                }
            }
        }
        self.entries.clear();
        self.by_type.write().clear();
    }

    fn destroy_entry(entry: &Entry) -> Result<(), BoxError> {
        let raw = {
            let mut state = entry.state.write();
            if state.status != EntryStatus::Ready {
                return Ok(());
            }
            state.status = EntryStatus::Destroyed;
            state.exposed = None;
            state.raw.take()
        };
        match raw {
            Some(raw) => entry.metadata.handle.pre_destroy(&raw),
            None => Ok(()),
        }
    }
}

/// 注册表回引用句柄
///
/// 非拥有引用，交给处理器和注册表感知组件使用
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Weak<RegistryInner>,
}

impl RegistryHandle {
    fn upgrade(&self) -> DependencyResult<Arc<RegistryInner>> {
        self.inner.upgrade().ok_or(DependencyError::RegistryDropped)
    }
}

impl ComponentLookup for RegistryHandle {
    fn lookup_by_name(&self, name: &str) -> DependencyResult<ComponentInstance> {
        self.upgrade()?.lookup_name(name, true)
    }

    fn lookup_by_type(&self, type_info: &TypeInfo) -> DependencyResult<ComponentInstance> {
        self.upgrade()?.lookup_type(type_info, true)
    }

    fn contains(&self, name: &str) -> bool {
        self.upgrade().is_ok_and(|inner| inner.contains(name))
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// 默认组件注册表
#[derive(Clone)]
pub struct DefaultComponentRegistry {
    inner: Arc<RegistryInner>,
}

impl DefaultComponentRegistry {
    /// 使用全局清单和默认配置创建注册表
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// 注册表构建器
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// 预置类型化的外部实例
    pub fn seed<T: Any + Send + Sync>(&self, name: &str, instance: Arc<T>) -> DependencyResult<()> {
        self.seed_instance(name, TypeInfo::of::<T>(), instance)
    }

    /// 非拥有的回引用句柄
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// 配置
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// 组件的直接依赖
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.inner
            .entry(name)
            .map(|entry| entry.dependencies.iter().map(|d| d.target.clone()).collect())
            .unwrap_or_default()
    }

    /// 处理器名称（执行顺序）
    pub fn processor_names(&self) -> Vec<String> {
        self.inner.processors.read().names()
    }

    /// 当前监听器数量
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl Default for DefaultComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefaultComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultComponentRegistry")
            .field("phase", &self.inner.phase())
            .field("entries", &self.inner.entries.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ComponentLookup for DefaultComponentRegistry {
    fn lookup_by_name(&self, name: &str) -> DependencyResult<ComponentInstance> {
        self.inner.lookup_name(name, false)
    }

    fn lookup_by_type(&self, type_info: &TypeInfo) -> DependencyResult<ComponentInstance> {
        self.inner.lookup_type(type_info, false)
    }

    fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }
}

impl ComponentRegistry for DefaultComponentRegistry {
    fn seed_instance(
        &self,
        name: &str,
        type_info: TypeInfo,
        instance: ComponentInstance,
    ) -> DependencyResult<()> {
        self.inner.ensure_open("seed_instance")?;
        let mut externals = self.inner.externals.write();
        if externals.iter().any(|(n, _)| n == name) {
            return Err(DependencyError::DuplicateComponent {
                component: name.to_string(),
                first: "预置实例".to_string(),
                second: type_info.name.to_string(),
            });
        }
        debug!("预置外部实例: {name} ({type_info})");
        externals.push((name.to_string(), ExternalInstance { type_info, instance }));
        Ok(())
    }

    fn register_processor(&self, processor: Arc<dyn ComponentProcessor>) -> DependencyResult<()> {
        self.inner.ensure_open("register_processor")?;
        self.inner.processors.write().add(processor);
        Ok(())
    }

    fn register_factory(&self, factory: Arc<dyn ExternalFactory>) -> DependencyResult<()> {
        self.inner.ensure_open("register_factory")?;
        self.inner.factories.register(factory)
    }

    fn register_listener(&self, listener: Arc<dyn EventListener>) {
        self.inner.listeners.register(listener);
    }

    fn register_all(&self, request: &ScanRequest) -> DependencyResult<RegistrationReport> {
        {
            let mut phase = self.inner.phase.write();
            if *phase != RegistryPhase::Open {
                return Err(DependencyError::IllegalPhase {
                    operation: "register_all".to_string(),
                    phase: phase.to_string(),
                });
            }
            *phase = RegistryPhase::Initializing;
        }

        info!("开始注册组件");
        let started = Instant::now();
        match self.inner.run_batch(request) {
            Ok(mut report) => {
                report.elapsed_ms =
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                *self.inner.phase.write() = RegistryPhase::Ready;
                info!(
                    "组件注册完成: 构建 {} 个, 延迟 {} 个, 原型 {} 个, 预置 {} 个, 耗时 {}ms",
                    report.built.len(),
                    report.deferred.len(),
                    report.prototypes.len(),
                    report.overrides.len(),
                    report.elapsed_ms
                );
                self.inner
                    .listeners
                    .publish(&RegistryEvent::RegistryInitialized {
                        components: report.built.clone(),
                    });
                Ok(report)
            }
            Err(error) => {
                error!(
                    "组件注册失败: {error} (组件: {})",
                    error.component().unwrap_or("-")
                );
                self.inner.rollback();
                *self.inner.phase.write() = RegistryPhase::Failed;
                Err(error)
            }
        }
    }

    fn status(&self, name: &str) -> Option<EntryStatus> {
        if self.inner.external(name).is_some() {
            return Some(EntryStatus::Ready);
        }
        self.inner.entry(name).map(|entry| entry.status())
    }

    fn phase(&self) -> RegistryPhase {
        self.inner.phase()
    }

    fn destroy(&self) -> TeardownReport {
        {
            let mut phase = self.inner.phase.write();
            match *phase {
                RegistryPhase::Destroyed => return TeardownReport::default(),
                RegistryPhase::Initializing => {
                    warn!("注册批次进行中, 忽略销毁请求");
                    return TeardownReport::default();
                }
                _ => *phase = RegistryPhase::Destroyed,
            }
        }

        let order = std::mem::take(&mut *self.inner.creation_order.lock());
        info!("开始销毁 {} 个单例组件", order.len());

        let mut report = TeardownReport::default();
        for name in order.iter().rev() {
            let Some(entry) = self.inner.entry(name) else {
                continue;
            };
            match RegistryInner::destroy_entry(&entry) {
                Ok(()) => debug!("组件已销毁: {name}"),
                Err(error) => {
                    warn!("组件销毁失败: {name}, 原因: {error}");
                    report.failures.push(TeardownFailure {
                        component: name.clone(),
                        error: error.to_string(),
                    });
                }
            }
            report.destroyed.push(name.clone());
        }

        self.inner.listeners.publish(&RegistryEvent::RegistryDestroyed);
        info!(
            "组件销毁完成: {} 个, 失败 {} 个",
            report.destroyed.len(),
            report.failures.len()
        );
        report
    }

    fn stats(&self) -> RegistryStats {
        let active_singletons = self
            .inner
            .entries
            .iter()
            .filter(|e| e.metadata.is_singleton() && e.status() == EntryStatus::Ready)
            .count();
        let stats = &self.inner.stats;
        RegistryStats {
            registered_components: self.inner.entries.len(),
            active_singletons,
            lazy_builds: stats.lazy_builds.load(Ordering::Relaxed),
            prototype_builds: stats.prototype_builds.load(Ordering::Relaxed),
            lookups: stats.lookups.load(Ordering::Relaxed),
            lookup_errors: stats.lookup_errors.load(Ordering::Relaxed),
            total_build_time_ms: stats.build_time_ms.load(Ordering::Relaxed),
        }
    }
}

/// 注册表构建器
pub struct RegistryBuilder {
    config: RegistryConfig,
    scanner: Option<Arc<dyn ComponentScanner>>,
    include_manifest: bool,
    declarations: Vec<ComponentDeclaration>,
    factory: Arc<dyn InstanceFactory>,
    processors: Vec<Arc<dyn ComponentProcessor>>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            config: RegistryConfig::default(),
            scanner: None,
            include_manifest: true,
            declarations: Vec::new(),
            factory: Arc::new(DefaultInstanceFactory::new()),
            processors: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl RegistryBuilder {
    /// 设置配置
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用自定义扫描器（忽略清单和显式声明）
    pub fn with_scanner(mut self, scanner: Arc<dyn ComponentScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// 不读取全局清单
    pub fn without_manifest(mut self) -> Self {
        self.include_manifest = false;
        self
    }

    /// 添加显式声明
    pub fn with_declarations(mut self, declarations: Vec<ComponentDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// 添加单个显式声明
    pub fn with_declaration(mut self, declaration: ComponentDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// 使用自定义实例工厂
    pub fn with_instance_factory(mut self, factory: Arc<dyn InstanceFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// 添加组件处理器
    pub fn with_processor(mut self, processor: Arc<dyn ComponentProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// 添加事件监听器
    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 构建注册表
    pub fn build(self) -> DefaultComponentRegistry {
        let scanner = self.scanner.unwrap_or_else(|| {
            let mut scanner = if self.include_manifest {
                DeclarativeScanner::with_manifest()
            } else {
                DeclarativeScanner::new()
            };
            if !self.declarations.is_empty() {
                scanner = scanner.with_declarations(self.declarations);
            }
            Arc::new(scanner)
        });

        let mut processors = ComponentProcessorChain::with_builtin();
        for processor in self.processors {
            processors.add(processor);
        }
        let listeners = ListenerRegistry::new();
        for listener in self.listeners {
            listeners.register(listener);
        }

        let inner = Arc::new_cyclic(|handle| RegistryInner {
            config: self.config,
            scanner,
            factory: self.factory,
            processors: RwLock::new(processors),
            listeners,
            component_listeners: Mutex::new(Vec::new()),
            factories: Arc::new(FactoryRegistry::default()),
            phase: RwLock::new(RegistryPhase::Open),
            entries: DashMap::new(),
            externals: RwLock::new(Vec::new()),
            by_type: RwLock::new(HashMap::new()),
            creation_order: Mutex::new(Vec::new()),
            chains: Mutex::new(HashMap::new()),
            stats: StatsCounters::default(),
            handle: handle.clone(),
        });
        DefaultComponentRegistry { inner }
    }
}
