//! 组件宏集成测试

use di_abstractions::{ComponentRegistry, ScanRequest};
use di_impl::DefaultComponentRegistry;
use infrastructure_common::{
    manifest_entries, Component, ComponentLookup, ComponentScope, EntryStatus, Marker,
    TypedLookup,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

mod shop {
    use component_macros::Component;
    use infrastructure_common::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub static CLOSED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Component)]
    #[component(markers(configuration))]
    pub struct ShopConfig {
        pub currency: String,
    }

    impl Default for ShopConfig {
        fn default() -> Self {
            Self {
                currency: "EUR".to_string(),
            }
        }
    }

    #[derive(Component)]
    #[component(markers(repository))]
    pub struct OrderRepository {
        #[inject]
        pub config: Arc<ShopConfig>,
    }

    #[derive(Component)]
    #[component(markers(service), post_construct = "warm_up", pre_destroy = "close")]
    pub struct OrderService {
        #[inject]
        pub repository: Arc<OrderRepository>,
        #[inject(name = "shopConfig")]
        pub config: Arc<ShopConfig>,
        pub warmed: bool,
    }

    impl OrderService {
        fn warm_up(&mut self) -> Result<(), BoxError> {
            self.warmed = true;
            Ok(())
        }

        fn close(&self) -> Result<(), BoxError> {
            CLOSED.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Component)]
    #[component(lazy)]
    pub struct ReportJob {
        #[inject]
        pub service: Arc<OrderService>,
    }

    #[derive(Component, Default)]
    #[component(prototype)]
    pub struct Cart {
        pub items: Vec<String>,
    }
}

mod aware {
    use component_macros::Component;
    use infrastructure_common::{
        BoxError, ComponentLookup, EventListener, ListenerControl, RegistryAware, RegistryEvent,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Component, Default)]
    pub struct Clock;

    #[derive(Component, Default)]
    #[component(name = "locator", registry_aware)]
    pub struct ServiceLocator {
        pub registry: Mutex<Option<Arc<dyn ComponentLookup>>>,
    }

    impl RegistryAware for ServiceLocator {
        fn set_registry(&self, registry: Arc<dyn ComponentLookup>) -> Result<(), BoxError> {
            *self.registry.lock() = Some(registry);
            Ok(())
        }
    }

    #[derive(Component, Default)]
    #[component(listener, skip_all_processors)]
    pub struct EventLog {
        pub events: Mutex<Vec<String>>,
    }

    impl EventListener for EventLog {
        fn on_event(&self, event: &RegistryEvent) -> ListenerControl {
            self.events.lock().push(event.name().to_string());
            ListenerControl::Continue
        }
    }
}

#[test]
fn test_derive_generates_declaration() {
    let declaration = shop::OrderService::declaration();

    assert_eq!(declaration.name, "orderService");
    assert_eq!(declaration.module_path, "integration_tests::shop");
    assert_eq!(declaration.scope, ComponentScope::Singleton);
    assert!(declaration.markers.contains(&Marker::Service));
    assert_eq!(declaration.injectable_constructor_count(), 1);
    assert_eq!(declaration.constructors[0].parameters.len(), 2);

    let cart = shop::Cart::declaration();
    assert_eq!(cart.scope, ComponentScope::Prototype);
    assert!(cart.markers.contains(&Marker::Component));
    assert_eq!(cart.injectable_constructor_count(), 0);
}

#[test]
fn test_manifest_is_populated_at_startup() {
    let entries = manifest_entries();
    let shop: Vec<&str> = entries
        .iter()
        .filter(|e| e.module_path == "integration_tests::shop")
        .map(|e| e.type_name)
        .collect();

    assert_eq!(
        shop,
        vec!["Cart", "OrderRepository", "OrderService", "ReportJob", "ShopConfig"]
    );
}

#[test]
fn test_registry_builds_scanned_components() {
    let registry = DefaultComponentRegistry::new();
    let report = registry
        .register_all(&ScanRequest::new().with_root("integration_tests::shop"))
        .unwrap();

    assert_eq!(report.built, vec!["shopConfig", "orderRepository", "orderService"]);
    assert_eq!(report.deferred, vec!["reportJob"]);
    assert_eq!(report.prototypes, vec!["cart"]);

    let service = registry.lookup::<shop::OrderService>().unwrap();
    assert!(service.warmed);
    assert_eq!(service.config.currency, "EUR");
    assert!(Arc::ptr_eq(&service.config, &service.repository.config));

    assert_eq!(registry.status("reportJob"), Some(EntryStatus::Uninitialized));
    let job = registry.lookup::<shop::ReportJob>().unwrap();
    assert!(Arc::ptr_eq(&job.service, &service));

    let before = shop::CLOSED.load(Ordering::SeqCst);
    let teardown = registry.destroy();
    assert_eq!(
        teardown.destroyed,
        vec!["reportJob", "orderService", "orderRepository", "shopConfig"]
    );
    assert_eq!(shop::CLOSED.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_plain_component_is_built_from_its_default_impl() {
    let registry = DefaultComponentRegistry::new();
    registry
        .register_all(&ScanRequest::new().with_root("integration_tests::shop"))
        .unwrap();

    let config = registry.lookup_named::<shop::ShopConfig>("shopConfig").unwrap();
    assert_eq!(config.currency, "EUR");
}

#[test]
fn test_marker_filter_limits_scan() {
    let registry = DefaultComponentRegistry::new();
    let report = registry
        .register_all(
            &ScanRequest::new()
                .with_root("integration_tests::shop")
                .with_marker(Marker::Configuration),
        )
        .unwrap();

    assert_eq!(report.built, vec!["shopConfig"]);
    assert!(!registry.contains("orderService"));
}

#[test]
fn test_capabilities_are_wired_from_derive() {
    let registry = DefaultComponentRegistry::new();
    registry
        .register_all(&ScanRequest::new().with_root("integration_tests::aware"))
        .unwrap();

    let locator = registry.lookup_named::<aware::ServiceLocator>("locator").unwrap();
    let handle = locator.registry.lock().clone().unwrap();
    assert!(handle.lookup::<aware::Clock>().is_ok());

    let log = registry.lookup::<aware::EventLog>().unwrap();
    let events = log.events.lock();
    assert!(events.iter().any(|e| e == "component-ready"));
    assert_eq!(events.last().map(String::as_str), Some("registry-initialized"));
}

#[test]
fn test_empty_roots_default_to_caller_crate() {
    let registry = DefaultComponentRegistry::new();
    let report = registry
        .register_all(&ScanRequest::for_caller(module_path!()))
        .unwrap();

    assert!(report.built.contains(&"shopConfig".to_string()));
    assert!(report.built.contains(&"locator".to_string()));
}
