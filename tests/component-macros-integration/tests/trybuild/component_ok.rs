use component_macros::Component;
use infrastructure_common::{
    BoxError, Component, ComponentDeclaration, ComponentScope, Marker, ProcessorExemption,
};
use std::sync::Arc;

#[derive(Component, Default)]
#[component(markers(configuration))]
struct OkConfig {
    retries: u32,
}

#[derive(Component)]
#[component(
    name = "okService",
    prototype,
    lazy,
    skip_processors("metrics"),
    post_construct = "start",
    pre_destroy = "stop"
)]
struct OkService {
    #[inject]
    config: Arc<OkConfig>,
    #[inject(name = "okConfig")]
    same_config: Arc<OkConfig>,
    started: bool,
}

impl OkService {
    fn start(&mut self) -> Result<(), BoxError> {
        self.started = self.config.retries == self.same_config.retries;
        Ok(())
    }

    fn stop(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn main() {
    let config: ComponentDeclaration = OkConfig::declaration();
    assert_eq!(config.name, "okConfig");
    assert!(config.markers.contains(&Marker::Configuration));

    let service = OkService::declaration();
    assert_eq!(service.name, "okService");
    assert_eq!(service.scope, ComponentScope::Prototype);
    assert!(service.lazy);
    assert_eq!(service.injectable_constructor_count(), 1);
    assert!(matches!(service.exemption, ProcessorExemption::Only(_)));
}
