//! 组件声明
//!
//! `ComponentDeclaration` 是单个类型的注册清单：名称、作用域、标记、构造函数、
//! 注入点、生命周期回调以及可选能力。声明可以通过 [`DeclarationBuilder`]
//! 手写，也可以由 `#[derive(Component)]` 生成。

use crate::capability::{ComponentLookup, ExternalFactory, FactoryAware, RegistryAware};
use crate::errors::{ArgumentError, BoxError};
use crate::events::EventListener;
use crate::metadata::{
    ComponentScope, DependencyRef, DependencyTarget, InjectionKind, Marker, ProcessorExemption,
    TypeInfo,
};
use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// 注册表持有的组件实例
pub type ComponentInstance = Arc<dyn Any + Send + Sync>;

/// 构造完成但尚未共享的组件实例
pub type RawInstance = Box<dyn Any + Send + Sync>;

pub type ConstructFn = Arc<dyn Fn(&mut Arguments) -> Result<RawInstance, BoxError> + Send + Sync>;
pub type InjectFn = Arc<
    dyn Fn(&mut (dyn Any + Send + Sync), ComponentInstance) -> Result<(), BoxError>
        + Send
        + Sync,
>;
pub type PostConstructFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;
pub type PreDestroyFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;
type RegistryAwareFn =
    Arc<dyn Fn(&ComponentInstance, Arc<dyn ComponentLookup>) -> Result<(), BoxError> + Send + Sync>;
type FactoryAwareFn = Arc<
    dyn Fn(&ComponentInstance, &str, Arc<dyn ExternalFactory>) -> Result<(), BoxError>
        + Send
        + Sync,
>;
type ListenerFn = Arc<dyn Fn(&ComponentInstance) -> Option<Arc<dyn EventListener>> + Send + Sync>;

/// 可注册组件 trait
///
/// 由 `#[derive(Component)]` 实现，也可以手写
pub trait Component: Send + Sync + 'static {
    /// 组件注册声明
    fn declaration() -> ComponentDeclaration
    where
        Self: Sized;
}

/// 根据类型名生成默认组件名称（首字母小写）
pub fn default_component_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 构造参数
///
/// 按构造函数声明顺序依次取出已解析的依赖
pub struct Arguments {
    values: VecDeque<(String, ComponentInstance)>,
    taken: usize,
}

impl Arguments {
    /// 创建构造参数列表
    pub fn new(values: Vec<(String, ComponentInstance)>) -> Self {
        Self {
            values: values.into(),
            taken: 0,
        }
    }

    /// 空参数列表
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 取出下一个参数并转换为具体类型
    pub fn take<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>, ArgumentError> {
        let (point, instance) = self.next_value()?;
        instance
            .downcast::<T>()
            .map_err(|_| ArgumentError::TypeMismatch {
                point,
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 取出下一个参数（不做类型转换）
    pub fn take_instance(&mut self) -> Result<ComponentInstance, ArgumentError> {
        self.next_value().map(|(_, instance)| instance)
    }

    /// 剩余参数数量
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next_value(&mut self) -> Result<(String, ComponentInstance), ArgumentError> {
        let index = self.taken;
        let value = self
            .values
            .pop_front()
            .ok_or(ArgumentError::Missing { index })?;
        self.taken += 1;
        Ok(value)
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let points: Vec<&str> = self.values.iter().map(|(point, _)| point.as_str()).collect();
        f.debug_struct("Arguments")
            .field("remaining", &points)
            .field("taken", &self.taken)
            .finish()
    }
}

/// 构造函数声明
#[derive(Clone)]
pub struct ConstructorDeclaration {
    /// 参数依赖（按顺序）
    pub parameters: Vec<DependencyRef>,
    /// 是否带有注入标记
    pub injectable: bool,
    /// 构造函数
    pub construct: ConstructFn,
}

impl fmt::Debug for ConstructorDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDeclaration")
            .field("parameters", &self.parameters)
            .field("injectable", &self.injectable)
            .finish_non_exhaustive()
    }
}

/// 字段/方法注入点声明
#[derive(Clone)]
pub struct InjectionDeclaration {
    pub dependency: DependencyRef,
    pub inject: InjectFn,
}

impl fmt::Debug for InjectionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionDeclaration")
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// 生命周期回调
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub post_construct: Option<PostConstructFn>,
    pub pre_destroy: Option<PreDestroyFn>,
}

/// 组件可选能力
#[derive(Clone, Default)]
pub struct Capabilities {
    registry_aware: Option<RegistryAwareFn>,
    factories: Vec<String>,
    factory_aware: Option<FactoryAwareFn>,
    listener: Option<ListenerFn>,
}

impl Capabilities {
    /// 是否需要注册表回引用
    pub fn is_registry_aware(&self) -> bool {
        self.registry_aware.is_some()
    }

    /// 交付注册表回引用
    pub fn apply_registry(
        &self,
        instance: &ComponentInstance,
        registry: Arc<dyn ComponentLookup>,
    ) -> Result<(), BoxError> {
        match &self.registry_aware {
            Some(apply) => apply(instance, registry),
            None => Ok(()),
        }
    }

    /// 组件需要的外部工厂名称
    pub fn required_factories(&self) -> &[String] {
        &self.factories
    }

    /// 交付外部工厂
    pub fn apply_factory(
        &self,
        instance: &ComponentInstance,
        name: &str,
        factory: Arc<dyn ExternalFactory>,
    ) -> Result<(), BoxError> {
        match &self.factory_aware {
            Some(apply) => apply(instance, name, factory),
            None => Ok(()),
        }
    }

    /// 是否为事件监听器
    pub fn is_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// 将实例视为事件监听器
    pub fn as_listener(&self, instance: &ComponentInstance) -> Option<Arc<dyn EventListener>> {
        self.listener.as_ref().and_then(|convert| convert(instance))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("registry_aware", &self.is_registry_aware())
            .field("factories", &self.factories)
            .field("listener", &self.is_listener())
            .finish()
    }
}

/// 组件注册声明
#[derive(Clone)]
pub struct ComponentDeclaration {
    pub name: String,
    pub type_info: TypeInfo,
    pub module_path: String,
    pub scope: ComponentScope,
    pub lazy: bool,
    pub markers: BTreeSet<Marker>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub injections: Vec<InjectionDeclaration>,
    pub exemption: ProcessorExemption,
    pub hooks: LifecycleHooks,
    pub capabilities: Capabilities,
}

impl ComponentDeclaration {
    /// 为类型 `T` 创建声明构建器
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> DeclarationBuilder<T> {
        DeclarationBuilder::new(name.into())
    }

    /// 为类型 `T` 创建声明构建器，使用默认组件名称
    pub fn builder_for<T: Any + Send + Sync>() -> DeclarationBuilder<T> {
        let name = default_component_name(TypeInfo::of::<T>().short_name());
        DeclarationBuilder::new(name)
    }

    /// 获取实现了 [`Component`] 的类型的声明
    pub fn of<T: Component>() -> Self {
        T::declaration()
    }

    /// 可注入构造函数数量
    pub fn injectable_constructor_count(&self) -> usize {
        self.constructors.iter().filter(|c| c.injectable).count()
    }
}

impl fmt::Debug for ComponentDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDeclaration")
            .field("name", &self.name)
            .field("type_info", &self.type_info.name)
            .field("module_path", &self.module_path)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("markers", &self.markers)
            .field("constructors", &self.constructors)
            .field("injections", &self.injections)
            .field("exemption", &self.exemption)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// 组件声明构建器
pub struct DeclarationBuilder<T> {
    declaration: ComponentDeclaration,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> DeclarationBuilder<T> {
    fn new(name: String) -> Self {
        let type_info = TypeInfo::of::<T>();
        let module_path = type_info.module_path().to_string();
        Self {
            declaration: ComponentDeclaration {
                name,
                type_info,
                module_path,
                scope: ComponentScope::Singleton,
                lazy: false,
                markers: BTreeSet::new(),
                constructors: Vec::new(),
                injections: Vec::new(),
                exemption: ProcessorExemption::None,
                hooks: LifecycleHooks::default(),
                capabilities: Capabilities::default(),
            },
            _marker: std::marker::PhantomData,
        }
    }

    /// 设置声明模块路径（默认取类型名中的模块路径）
    pub fn module_path(mut self, module_path: impl Into<String>) -> Self {
        self.declaration.module_path = module_path.into();
        self
    }

    /// 设置作用域
    pub fn scope(mut self, scope: ComponentScope) -> Self {
        self.declaration.scope = scope;
        self
    }

    /// 原型作用域
    pub fn prototype(self) -> Self {
        self.scope(ComponentScope::Prototype)
    }

    /// 延迟初始化
    pub fn lazy(mut self) -> Self {
        self.declaration.lazy = true;
        self
    }

    /// 添加注册标记
    pub fn marker(mut self, marker: Marker) -> Self {
        self.declaration.markers.insert(marker);
        self
    }

    /// 豁免指定处理器
    pub fn skip_processor(mut self, processor: impl Into<String>) -> Self {
        let processor = processor.into();
        self.declaration.exemption = match self.declaration.exemption {
            ProcessorExemption::All => ProcessorExemption::All,
            ProcessorExemption::None => ProcessorExemption::Only(BTreeSet::from([processor])),
            ProcessorExemption::Only(mut names) => {
                names.insert(processor);
                ProcessorExemption::Only(names)
            }
        };
        self
    }

    /// 豁免全部处理器
    pub fn skip_all_processors(mut self) -> Self {
        self.declaration.exemption = ProcessorExemption::All;
        self
    }

    /// 可注入构造函数
    ///
    /// 参数依赖按顺序解析后通过 [`Arguments`] 交给构造闭包
    pub fn constructor<F>(mut self, parameters: Vec<(&str, DependencyTarget)>, construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let parameters = parameters
            .into_iter()
            .map(|(point, target)| DependencyRef::new(InjectionKind::Constructor, point, target))
            .collect();
        self.declaration.constructors.push(ConstructorDeclaration {
            parameters,
            injectable: true,
            construct: Arc::new(move |args: &mut Arguments| {
                construct(args).map(|value| Box::new(value) as RawInstance)
            }),
        });
        self
    }

    /// 无注入标记的无参构造函数
    pub fn zero_arg<F>(mut self, construct: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.declaration.constructors.push(ConstructorDeclaration {
            parameters: Vec::new(),
            injectable: false,
            construct: Arc::new(move |_: &mut Arguments| {
                construct().map(|value| Box::new(value) as RawInstance)
            }),
        });
        self
    }

    /// 使用 `Default` 作为无参构造函数
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.zero_arg(|| Ok(T::default()))
    }

    /// 按类型注入字段
    pub fn field<D, F>(self, point: &str, setter: F) -> Self
    where
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        self.injection::<D, _>(
            InjectionKind::Field,
            point,
            DependencyTarget::of::<D>(),
            move |t, d| {
                setter(t, d);
                Ok(())
            },
        )
    }

    /// 按名称注入字段
    pub fn field_named<D, F>(self, point: &str, name: &str, setter: F) -> Self
    where
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        self.injection::<D, _>(
            InjectionKind::Field,
            point,
            DependencyTarget::named(name),
            move |t, d| {
                setter(t, d);
                Ok(())
            },
        )
    }

    /// 按类型进行方法注入
    pub fn method<D, F>(self, point: &str, setter: F) -> Self
    where
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.injection(InjectionKind::Method, point, DependencyTarget::of::<D>(), setter)
    }

    /// 按名称进行方法注入
    pub fn method_named<D, F>(self, point: &str, name: &str, setter: F) -> Self
    where
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.injection(InjectionKind::Method, point, DependencyTarget::named(name), setter)
    }

    fn injection<D, F>(
        mut self,
        kind: InjectionKind,
        point: &str,
        target: DependencyTarget,
        setter: F,
    ) -> Self
    where
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let owned_point = point.to_string();
        let inject: InjectFn = Arc::new(
            move |target: &mut (dyn Any + Send + Sync),
                  value: ComponentInstance|
                  -> Result<(), BoxError> {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| type_mismatch::<T>(&owned_point))?;
                let value = value
                    .downcast::<D>()
                    .map_err(|_| type_mismatch::<D>(&owned_point))?;
                setter(target, value)
            },
        );
        self.declaration.injections.push(InjectionDeclaration {
            dependency: DependencyRef::new(kind, point, target),
            inject,
        });
        self
    }

    /// 构造与注入完成后调用的回调
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.declaration.hooks.post_construct = Some(Arc::new(
            move |target: &mut (dyn Any + Send + Sync)| -> Result<(), BoxError> {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| type_mismatch::<T>("post_construct"))?;
                hook(target)
            },
        ));
        self
    }

    /// 销毁回调
    pub fn pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.declaration.hooks.pre_destroy = Some(Arc::new(
            move |target: &(dyn Any + Send + Sync)| -> Result<(), BoxError> {
                let target = target
                    .downcast_ref::<T>()
                    .ok_or_else(|| type_mismatch::<T>("pre_destroy"))?;
                hook(target)
            },
        ));
        self
    }

    /// 注入注册表回引用
    pub fn registry_aware(mut self) -> Self
    where
        T: RegistryAware,
    {
        self.declaration.capabilities.registry_aware = Some(Arc::new(
            |instance: &ComponentInstance, registry: Arc<dyn ComponentLookup>| {
                match instance.downcast_ref::<T>() {
                    Some(component) => component.set_registry(registry),
                    None => Ok(()),
                }
            },
        ));
        self
    }

    /// 注入指定名称的外部工厂
    pub fn factory_aware(mut self, factory: impl Into<String>) -> Self
    where
        T: FactoryAware,
    {
        self.declaration.capabilities.factories.push(factory.into());
        self.declaration.capabilities.factory_aware = Some(Arc::new(
            |instance: &ComponentInstance, name: &str, factory: Arc<dyn ExternalFactory>| {
                match instance.downcast_ref::<T>() {
                    Some(component) => component.set_factory(name, factory),
                    None => Ok(()),
                }
            },
        ));
        self
    }

    /// 就绪后注册为事件监听器
    pub fn listener(mut self) -> Self
    where
        T: EventListener,
    {
        self.declaration.markers.insert(Marker::Listener);
        self.declaration.capabilities.listener = Some(Arc::new(|instance: &ComponentInstance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|listener| listener as Arc<dyn EventListener>)
        }));
        self
    }

    /// 完成声明
    pub fn build(mut self) -> ComponentDeclaration {
        if self.declaration.markers.is_empty() {
            self.declaration.markers.insert(Marker::Component);
        }
        self.declaration
    }
}

fn type_mismatch<T>(point: &str) -> BoxError {
    Box::new(ArgumentError::TypeMismatch {
        point: point.to_string(),
        expected: std::any::type_name::<T>().to_string(),
    })
}

/// 类型句柄
///
/// 扫描器选定构造函数后，由声明生成的不透明句柄。工厂只通过句柄操作实例。
#[derive(Clone)]
pub struct TypeHandle {
    construct: ConstructFn,
    injectors: Arc<[InjectFn]>,
    hooks: LifecycleHooks,
    capabilities: Capabilities,
}

impl TypeHandle {
    /// 创建类型句柄
    pub fn new(
        construct: ConstructFn,
        injectors: Vec<InjectFn>,
        hooks: LifecycleHooks,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            construct,
            injectors: injectors.into(),
            hooks,
            capabilities,
        }
    }

    /// 调用选定的构造函数
    pub fn construct(&self, arguments: &mut Arguments) -> Result<RawInstance, BoxError> {
        (self.construct)(arguments)
    }

    /// 执行第 `index` 个字段/方法注入
    pub fn inject(
        &self,
        index: usize,
        target: &mut (dyn Any + Send + Sync),
        value: ComponentInstance,
    ) -> Result<(), BoxError> {
        let inject = self
            .injectors
            .get(index)
            .ok_or_else(|| -> BoxError { format!("注入点索引越界: {index}").into() })?;
        inject(target, value)
    }

    /// 是否声明了 post-construct 回调
    pub fn has_post_construct(&self) -> bool {
        self.hooks.post_construct.is_some()
    }

    /// 调用 post-construct 回调
    pub fn post_construct(&self, target: &mut (dyn Any + Send + Sync)) -> Result<(), BoxError> {
        match &self.hooks.post_construct {
            Some(hook) => hook(target),
            None => Ok(()),
        }
    }

    /// 是否声明了销毁回调
    pub fn has_pre_destroy(&self) -> bool {
        self.hooks.pre_destroy.is_some()
    }

    /// 调用销毁回调
    pub fn pre_destroy(&self, instance: &ComponentInstance) -> Result<(), BoxError> {
        match &self.hooks.pre_destroy {
            Some(hook) => hook(instance.as_ref()),
            None => Ok(()),
        }
    }

    /// 组件能力
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("injectors", &self.injectors.len())
            .field("post_construct", &self.has_post_construct())
            .field("pre_destroy", &self.has_pre_destroy())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
