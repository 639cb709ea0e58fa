//! 准入条件集成测试：profile、属性、能力、缺失组件与完整启动流程

use config_impl::MapPropertySource;
use di_impl::{Container, ContextScopeStore};
use infrastructure_common::{
    AdmissionPredicate, ComponentDescriptor, ContainerError, Environment, InfrastructureError,
    Scope,
};
use infrastructure_composition::{RuntimeBuilder, TimingDecorator};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn build_with(environment: Environment, descriptor: ComponentDescriptor) -> Container {
    Container::builder()
        .with_environment(environment)
        .register(descriptor)
        .build()
        .unwrap()
}

fn admitted(environment: Environment, predicate: AdmissionPredicate) -> bool {
    let container = build_with(
        environment,
        ComponentDescriptor::singleton("target", |_| Ok(())).when(predicate),
    );
    let admitted = container.contains("target");
    assert_eq!(admitted, !container.was_excluded("target"));
    container.close().unwrap();
    admitted
}

#[test]
fn test_profile_active() {
    let dev = || AdmissionPredicate::profile(["dev"]);
    assert!(admitted(Environment::new().with_profile("dev"), dev()));
    assert!(!admitted(Environment::new().with_profile("prod"), dev()));
    assert!(!admitted(Environment::new(), dev()));
}

#[test]
fn test_negated_profile() {
    let not_prod = || AdmissionPredicate::profile(["!prod"]);
    assert!(admitted(Environment::new().with_profile("dev"), not_prod()));
    assert!(admitted(Environment::new(), not_prod()));
    assert!(!admitted(Environment::new().with_profile("prod"), not_prod()));
}

#[test]
fn test_property_equals() {
    let flag = || AdmissionPredicate::property_equals("x", "true", false);
    assert!(admitted(Environment::new().with_property("x", "true"), flag()));
    assert!(!admitted(Environment::new().with_property("x", "false"), flag()));
    assert!(!admitted(Environment::new(), flag()));

    let lenient = AdmissionPredicate::property_equals("x", "true", true);
    assert!(admitted(Environment::new(), lenient));
}

#[test]
fn test_excluded_ids_and_lookup() {
    let container = Container::builder()
        .with_environment(Environment::new().with_profile("prod"))
        .register(
            ComponentDescriptor::singleton("mock-gateway", |_| Ok(()))
                .when(AdmissionPredicate::profile(["dev"])),
        )
        .register(
            ComponentDescriptor::singleton("gateway", |_| Ok(()))
                .when(AdmissionPredicate::missing_component("mock-gateway")),
        )
        .build()
        .unwrap();

    assert_eq!(
        container
            .excluded_ids()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        vec!["mock-gateway"]
    );
    assert!(container.is_profile_active("prod"));
    assert!(matches!(
        container.get("mock-gateway"),
        Err(ContainerError::NotFound { .. })
    ));
    assert!(container.get("gateway").is_ok());
    container.close().unwrap();
}

#[test]
fn test_request_scope_lives_in_store() {
    let request = Arc::new(ContextScopeStore::request());
    let container = Container::builder()
        .register(ComponentDescriptor::typed("trace-id", Scope::Request, |_| {
            Ok(String::from("req-1"))
        }))
        .with_scope_store(request.clone())
        .build()
        .unwrap();

    let a = container.get_as::<String>("trace-id").unwrap();
    let b = container.get_as::<String>("trace-id").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    container.close().unwrap();
    assert_eq!(container.stats().scoped_constructed, 1);
}

#[tokio::test]
async fn test_full_pipeline_from_toml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[profiles]
active = "dev,local"

[feature]
audit = "true"
"#
    )
    .unwrap();

    let timing = TimingDecorator::new();
    let container = RuntimeBuilder::new()
        .add_toml(file.path())
        .add_source(
            MapPropertySource::new("overrides")
                .with_property("feature.audit", "false")
                .with_priority(10),
        )
        .with_decorator(timing.clone())
        .register_all([
            ComponentDescriptor::singleton("audit", |_| Ok(()))
                .when(AdmissionPredicate::property_equals("feature.audit", "true", false)),
            ComponentDescriptor::singleton("local-store", |_| Ok(()))
                .when(AdmissionPredicate::all_profiles(["dev", "local"])),
            ComponentDescriptor::singleton("cloud-store", |_| Ok(()))
                .when(AdmissionPredicate::profile(["!local"])),
            ComponentDescriptor::singleton("service", |deps| {
                Ok(deps.get("audit").is_some())
            })
            .with_dependency("local-store")
            .with_optional_dependency("audit"),
        ])
        .build()
        .await
        .unwrap();

    assert_eq!(
        container.active_profiles().iter().cloned().collect::<Vec<_>>(),
        vec!["dev".to_string(), "local".to_string()]
    );
    assert!(container.was_excluded("cloud-store"));
    assert!(*container.get_as::<bool>("service").unwrap());
    assert_eq!(timing.count_for("service"), 1);
    assert_eq!(timing.count_for("audit"), 1);

    let order = container.resolved_order();
    let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
    assert!(pos("audit") < pos("service"));
    assert!(pos("local-store") < pos("service"));

    container.close().unwrap();
}

#[tokio::test]
async fn test_pipeline_reports_unresolved_dependency() {
    let result = RuntimeBuilder::new()
        .with_profile("prod")
        .register(
            ComponentDescriptor::singleton("mock-db", |_| Ok(()))
                .when(AdmissionPredicate::profile(["dev"])),
        )
        .register(ComponentDescriptor::singleton("repo", |_| Ok(())).with_dependency("mock-db"))
        .build()
        .await;

    match result {
        Err(InfrastructureError::ContainerError {
            source:
                ContainerError::UnresolvedDependency {
                    component,
                    dependency,
                    excluded,
                },
        }) => {
            assert_eq!(component, "repo");
            assert_eq!(dependency, "mock-db");
            assert!(excluded);
        }
        other => panic!("expected unresolved dependency, got {other:?}"),
    }
}
