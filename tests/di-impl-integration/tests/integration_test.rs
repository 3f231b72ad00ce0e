//! 组件注册引擎的集中集成测试
//!
//! 覆盖拓扑顺序、循环检测、单例/原型语义、延迟构建、处理器顺序和销毁顺序。

use di_abstractions::{
    ComponentProcessor, ComponentRegistry, ProcessorContext, RegistryConfig, ScanRequest,
};
use di_impl::DefaultComponentRegistry;
use infrastructure_common::{
    BoxError, ComponentDeclaration, ComponentInstance, DependencyError, DependencyTarget,
    EntryStatus, ErrorKind, TypeMetadata, TypedLookup,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

/// 通用节点组件，按名称依赖其他节点
struct Node {
    name: String,
    deps: Vec<Arc<Node>>,
}

#[derive(Debug)]
struct Config {
    url: String,
}

struct ServiceA {
    config: Arc<Config>,
}

struct ServiceB {
    service_a: Arc<ServiceA>,
    config: Arc<Config>,
}

fn request() -> ScanRequest {
    ScanRequest::new().with_root("integration_test")
}

fn registry(declarations: Vec<ComponentDeclaration>) -> DefaultComponentRegistry {
    DefaultComponentRegistry::builder()
        .without_manifest()
        .with_declarations(declarations)
        .build()
}

fn node(name: &str, deps: &[&str], log: &Log) -> ComponentDeclaration {
    let parameters = deps
        .iter()
        .map(|dep| (*dep, DependencyTarget::named(*dep)))
        .collect();
    let own = name.to_string();
    let log = Arc::clone(log);
    let destroy_log = Arc::clone(&log);
    ComponentDeclaration::builder::<Node>(name)
        .constructor(parameters, move |args| {
            let mut deps = Vec::new();
            while args.remaining() > 0 {
                deps.push(args.take::<Node>()?);
            }
            log.lock().push(format!("build:{own}"));
            Ok(Node {
                name: own.clone(),
                deps,
            })
        })
        .pre_destroy(move |node| {
            destroy_log.lock().push(format!("destroy:{}", node.name));
            Ok(())
        })
        .build()
}

fn config() -> ComponentDeclaration {
    ComponentDeclaration::builder::<Config>("config")
        .zero_arg(|| {
            Ok(Config {
                url: "postgres://localhost/app".to_string(),
            })
        })
        .build()
}

fn service_a() -> ComponentDeclaration {
    ComponentDeclaration::builder::<ServiceA>("serviceA")
        .constructor(vec![("config", DependencyTarget::of::<Config>())], |args| {
            Ok(ServiceA {
                config: args.take()?,
            })
        })
        .build()
}

fn service_b() -> ComponentDeclaration {
    ComponentDeclaration::builder::<ServiceB>("serviceB")
        .constructor(
            vec![
                ("serviceA", DependencyTarget::of::<ServiceA>()),
                ("config", DependencyTarget::of::<Config>()),
            ],
            |args| {
                Ok(ServiceB {
                    service_a: args.take()?,
                    config: args.take()?,
                })
            },
        )
        .build()
}

/// 线性同余生成器，保证随机依赖图可复现
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

#[test]
fn test_build_order_respects_dependencies_for_generated_graphs() {
    for seed in 1..=20u64 {
        let mut rng = Lcg(seed);
        let count = 3 + rng.next(10);
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        let log: Log = Arc::default();
        let mut declarations = Vec::new();

        for index in 0..count {
            let name = format!("node{index}");
            let deps: Vec<String> = (0..index)
                .filter(|_| rng.next(3) == 0)
                .map(|dep| format!("node{dep}"))
                .collect();
            let refs: Vec<&str> = deps.iter().map(String::as_str).collect();
            declarations.push(node(&name, &refs, &log));
            edges.insert(name, deps);
        }
        // 打乱声明顺序
        declarations.reverse();

        let registry = registry(declarations);
        let report = registry.register_all(&request()).unwrap();
        assert_eq!(report.built.len(), count);

        let position: HashMap<&str, usize> = report
            .built
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        for (name, deps) in &edges {
            for dep in deps {
                assert!(
                    position[dep.as_str()] < position[name.as_str()],
                    "seed {seed}: {dep} 应在 {name} 之前构建"
                );
            }
        }
    }
}

#[test]
fn test_declaration_order_breaks_ties() {
    let log: Log = Arc::default();
    let registry = registry(vec![
        node("gamma", &[], &log),
        node("alpha", &[], &log),
        node("beta", &[], &log),
    ]);
    let report = registry.register_all(&request()).unwrap();
    assert_eq!(report.built, vec!["gamma", "alpha", "beta"]);
}

#[test]
fn test_direct_cycle_is_reported_with_closing_name() {
    let log: Log = Arc::default();
    let registry = registry(vec![node("a", &["b"], &log), node("b", &["a"], &log)]);

    let error = registry.register_all(&request()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Resolution);
    match error {
        DependencyError::Cycle { path } => assert_eq!(path, vec!["a", "b", "a"]),
        other => panic!("期望循环依赖错误, 实际: {other:?}"),
    }
    assert!(log.lock().is_empty());
}

#[test]
fn test_transitive_cycle_lists_each_node_once() {
    let log: Log = Arc::default();
    let registry = registry(vec![
        node("root", &["a"], &log),
        node("a", &["b"], &log),
        node("b", &["c"], &log),
        node("c", &["a"], &log),
    ]);

    match registry.register_all(&request()).unwrap_err() {
        DependencyError::Cycle { path } => {
            assert_eq!(path.first(), path.last());
            let distinct: HashSet<String> = path[..path.len() - 1].iter().cloned().collect();
            let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
            assert_eq!(distinct.len(), path.len() - 1);
            assert_eq!(distinct, expected);
        }
        other => panic!("期望循环依赖错误, 实际: {other:?}"),
    }
}

#[test]
fn test_singleton_lookup_returns_identical_instance() {
    let registry = registry(vec![config(), service_a(), service_b()]);
    registry.register_all(&request()).unwrap();

    let b = registry.lookup::<ServiceB>().unwrap();
    let a = registry.lookup::<ServiceA>().unwrap();
    let config = registry.lookup_named::<Config>("config").unwrap();

    assert!(Arc::ptr_eq(&b.service_a, &a));
    assert!(Arc::ptr_eq(&b.config, &config));
    assert!(Arc::ptr_eq(&a.config, &config));
    assert_eq!(b.config.url, "postgres://localhost/app");
    assert!(Arc::ptr_eq(&b, &registry.lookup::<ServiceB>().unwrap()));
}

#[test]
fn test_prototype_lookup_returns_distinct_instances() {
    let registry = registry(vec![
        config(),
        ComponentDeclaration::builder::<ServiceA>("serviceA")
            .constructor(vec![("config", DependencyTarget::of::<Config>())], |args| {
                Ok(ServiceA {
                    config: args.take()?,
                })
            })
            .prototype()
            .build(),
    ]);
    registry.register_all(&request()).unwrap();

    let first = registry.lookup::<ServiceA>().unwrap();
    let second = registry.lookup::<ServiceA>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.config, &second.config));
    assert_eq!(registry.status("serviceA"), Some(EntryStatus::Uninitialized));
}

#[test]
fn test_two_injectable_constructors_fail_registration() {
    let registry = registry(vec![
        config(),
        ComponentDeclaration::builder::<ServiceA>("serviceX")
            .constructor(vec![("config", DependencyTarget::of::<Config>())], |args| {
                Ok(ServiceA {
                    config: args.take()?,
                })
            })
            .constructor(vec![("url", DependencyTarget::named("config"))], |args| {
                Ok(ServiceA {
                    config: args.take()?,
                })
            })
            .build(),
    ]);

    match registry.register_all(&request()).unwrap_err() {
        DependencyError::AmbiguousConstructor { component, count } => {
            assert_eq!(component, "serviceX");
            assert_eq!(count, 2);
        }
        other => panic!("期望构造函数歧义错误, 实际: {other:?}"),
    }
}

#[test]
fn test_lazy_component_waits_for_first_lookup() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let registry = registry(vec![
        ComponentDeclaration::builder::<ServiceA>("lazyY")
            .constructor(vec![("config", DependencyTarget::of::<Config>())], move |args| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ServiceA {
                    config: args.take()?,
                })
            })
            .lazy()
            .build(),
        config(),
    ]);
    registry.register_all(&request()).unwrap();

    assert_eq!(registry.status("lazyY"), Some(EntryStatus::Uninitialized));
    assert_eq!(built.load(Ordering::SeqCst), 0);

    let lazy = registry.lookup_named::<ServiceA>("lazyY").unwrap();
    assert_eq!(registry.status("lazyY"), Some(EntryStatus::Ready));
    assert!(Arc::ptr_eq(&lazy.config, &registry.lookup::<Config>().unwrap()));
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_lazy_lookups_build_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let registry = registry(vec![
        config(),
        ComponentDeclaration::builder::<ServiceA>("slow")
            .constructor(vec![("config", DependencyTarget::of::<Config>())], move |args| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(ServiceA {
                    config: args.take()?,
                })
            })
            .lazy()
            .build(),
    ]);
    registry.register_all(&request()).unwrap();

    let barrier = Barrier::new(8);
    let instances: Vec<Arc<ServiceA>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    registry.lookup_named::<ServiceA>("slow").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lookups_from_async_tasks_share_singletons() {
    let registry = registry(vec![config(), service_a(), service_b()]);
    registry.register_all(&request()).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry.lookup::<ServiceB>().map(|b| Arc::as_ptr(&b) as usize)
        }));
    }

    let mut addresses = HashSet::new();
    for task in tasks {
        addresses.insert(task.await.unwrap().unwrap());
    }
    assert_eq!(addresses.len(), 1);
}

/// 记录调用顺序的处理器
struct Tracing {
    name: &'static str,
    priority: i32,
    log: Log,
}

impl ComponentProcessor for Tracing {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn after_component_initialization(
        &self,
        metadata: &TypeMetadata,
        instance: ComponentInstance,
        _context: &ProcessorContext,
    ) -> Result<ComponentInstance, BoxError> {
        self.log.lock().push(format!("{}:{}", metadata.name, self.name));
        Ok(instance)
    }
}

#[test]
fn test_processors_run_in_priority_order() {
    let log: Log = Arc::default();
    let nodes: Log = Arc::default();
    let mut builder = DefaultComponentRegistry::builder()
        .without_manifest()
        .with_declarations(vec![node("left", &[], &nodes), node("right", &["left"], &nodes)]);
    for (name, priority) in [("p3", 3), ("p1", 1), ("p2", 2)] {
        builder = builder.with_processor(Arc::new(Tracing {
            name,
            priority,
            log: Arc::clone(&log),
        }));
    }
    let registry = builder.build();
    registry.register_all(&request()).unwrap();

    assert_eq!(
        *log.lock(),
        vec!["left:p1", "left:p2", "left:p3", "right:p1", "right:p2", "right:p3"]
    );
}

/// 在实例化前通过回引用句柄查找自身的处理器
struct SelfLookup;

impl ComponentProcessor for SelfLookup {
    fn name(&self) -> &str {
        "self-lookup"
    }

    fn before_component_initialization(
        &self,
        metadata: &TypeMetadata,
        instance: Option<ComponentInstance>,
        context: &ProcessorContext,
    ) -> Result<Option<ComponentInstance>, BoxError> {
        context.registry.lookup_by_name(&metadata.name)?;
        Ok(instance)
    }
}

#[test]
fn test_reentrant_lookup_is_reported_as_cycle() {
    let log: Log = Arc::default();
    let registry = DefaultComponentRegistry::builder()
        .without_manifest()
        .with_declaration(node("loop", &[], &log))
        .with_processor(Arc::new(SelfLookup))
        .build();

    match registry.register_all(&request()).unwrap_err() {
        DependencyError::CyclicDependency { path } => assert_eq!(path, vec!["loop", "loop"]),
        other => panic!("期望循环依赖错误, 实际: {other:?}"),
    }
}

#[test]
fn test_teardown_runs_in_reverse_build_order() {
    let log: Log = Arc::default();
    let registry = registry(vec![
        node("c", &["b"], &log),
        node("a", &[], &log),
        node("b", &["a"], &log),
    ]);
    registry.register_all(&request()).unwrap();

    let report = registry.destroy();
    assert!(report.is_clean());
    assert_eq!(report.destroyed, vec!["c", "b", "a"]);
    assert_eq!(
        *log.lock(),
        vec![
            "build:a", "build:b", "build:c", "destroy:c", "destroy:b", "destroy:a"
        ]
    );
}

#[test]
fn test_teardown_continues_after_hook_failure() {
    let log: Log = Arc::default();
    let registry = registry(vec![
        node("a", &[], &log),
        ComponentDeclaration::builder::<Config>("flaky")
            .zero_arg(|| Ok(Config { url: String::new() }))
            .pre_destroy(|_| Err("connection reset".into()))
            .build(),
        node("z", &["a"], &log),
    ]);
    registry.register_all(&request()).unwrap();

    let report = registry.destroy();
    assert_eq!(report.destroyed, vec!["z", "flaky", "a"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].component, "flaky");
    assert!(log.lock().contains(&"destroy:a".to_string()));
}

#[test]
fn test_unresolved_dependency_fails_batch() {
    let registry = registry(vec![service_a()]);

    let error = registry.register_all(&request()).unwrap_err();
    assert!(matches!(
        error,
        DependencyError::UnresolvedDependency { ref component, .. } if component == "serviceA"
    ));
    assert_eq!(error.kind(), ErrorKind::Resolution);
}

#[test]
fn test_ambiguous_type_dependency_fails_batch() {
    let second = ComponentDeclaration::builder::<Config>("replica")
        .zero_arg(|| Ok(Config { url: String::new() }))
        .build();
    let primary = ComponentDeclaration::builder::<Config>("primary")
        .zero_arg(|| Ok(Config { url: String::new() }))
        .build();
    let registry = registry(vec![primary, second, service_a()]);

    let error = registry.register_all(&request()).unwrap_err();
    assert!(matches!(error, DependencyError::AmbiguousDependency { .. }));
}

#[test]
fn test_lazy_by_default_defers_every_singleton() {
    let registry = DefaultComponentRegistry::builder()
        .without_manifest()
        .with_declarations(vec![config(), service_a()])
        .with_config(RegistryConfig::default().with_lazy_by_default(true))
        .build();
    let report = registry.register_all(&request()).unwrap();

    assert!(report.built.is_empty());
    assert_eq!(report.deferred, vec!["config", "serviceA"]);
    registry.lookup::<ServiceA>().unwrap();
    assert_eq!(registry.stats().lazy_builds, 2);
}

#[test]
fn test_reports_serialize_to_json() {
    let registry = registry(vec![config(), service_a()]);
    let report = registry.register_all(&request()).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["built"], serde_json::json!(["config", "serviceA"]));

    let stats = serde_json::to_value(registry.stats()).unwrap();
    assert_eq!(stats["active_singletons"], 2);
}
