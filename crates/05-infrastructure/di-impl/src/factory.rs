//! 默认实例工厂

use di_abstractions::{InstanceFactory, ResolveFn};
use infrastructure_common::{
    ArgumentError, Arguments, BoxError, ComponentInstance, ConstructionStrategy, DependencyError,
    DependencyRef, DependencyResult, TypeMetadata,
};
use std::sync::Arc;
use tracing::debug;

/// 默认实例工厂
///
/// 构造函数策略先解析全部参数再调用构造函数；无参策略直接构造。
/// 两种策略随后都按声明顺序执行字段/方法注入，最后调用 post-construct 回调。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInstanceFactory;

impl DefaultInstanceFactory {
    pub fn new() -> Self {
        Self
    }

    /// 依赖解析失败时包装为实例化错误
    ///
    /// 内层组件的实例化错误和按需构建的循环错误原样传播
    fn resolution_error(
        metadata: &TypeMetadata,
        reference: &DependencyRef,
        error: DependencyError,
    ) -> DependencyError {
        match error {
            DependencyError::Instantiation { .. } | DependencyError::CyclicDependency { .. } => {
                error
            }
            other => DependencyError::instantiation(&metadata.name, &reference.point, other),
        }
    }

    /// 用户回调失败时包装为实例化错误
    ///
    /// 回调内部查找引发的实例化错误和循环错误原样传播
    fn hook_error(metadata: &TypeMetadata, point: &str, error: BoxError) -> DependencyError {
        let error = match error.downcast::<DependencyError>() {
            Ok(inner) => match *inner {
                inner @ (DependencyError::Instantiation { .. }
                | DependencyError::CyclicDependency { .. }) => return inner,
                other => return DependencyError::instantiation(&metadata.name, point, other),
            },
            Err(error) => error,
        };
        let point = error
            .downcast_ref::<ArgumentError>()
            .and_then(ArgumentError::point)
            .unwrap_or(point)
            .to_string();
        DependencyError::instantiation(&metadata.name, point, error)
    }
}

impl InstanceFactory for DefaultInstanceFactory {
    fn instantiate(
        &self,
        metadata: &TypeMetadata,
        resolve: &mut ResolveFn<'_>,
    ) -> DependencyResult<ComponentInstance> {
        let handle = &metadata.handle;

        let mut arguments = match &metadata.strategy {
            ConstructionStrategy::Constructor { parameters } => {
                let mut values = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    let value = resolve(parameter)
                        .map_err(|e| Self::resolution_error(metadata, parameter, e))?;
                    values.push((parameter.point.clone(), value));
                }
                Arguments::new(values)
            }
            ConstructionStrategy::ZeroArg => Arguments::empty(),
        };

        let mut instance = handle
            .construct(&mut arguments)
            .map_err(|e| Self::hook_error(metadata, "constructor", e))?;

        for (index, injection) in metadata.injections.iter().enumerate() {
            let value = resolve(injection)
                .map_err(|e| Self::resolution_error(metadata, injection, e))?;
            handle
                .inject(index, instance.as_mut(), value)
                .map_err(|e| Self::hook_error(metadata, &injection.point, e))?;
        }

        handle
            .post_construct(instance.as_mut())
            .map_err(|e| Self::hook_error(metadata, "post_construct", e))?;

        debug!("组件实例已创建: {}", metadata.name);
        Ok(Arc::from(instance))
    }
}
