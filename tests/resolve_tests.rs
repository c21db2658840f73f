#![cfg(feature = "memory-backend")]

use appconfig_deploy::{
    operation, DeployError, DeploymentStrategy, DeploymentWorkflow, InMemoryBackend, ProfileKind,
    RemoteError, ResourceKind, WorkflowConfig,
};

fn demo_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_application("app-1", "demo")
        .with_profile("app-1", "p-1", "cfg", ProfileKind::Freeform)
        .with_environment("app-1", "e-1", "prod")
        .with_strategy(DeploymentStrategy::new("s-1", "AllAtOnce"))
}

// ═══════════════════════════════════════════════════════════════════
// RESOLVE ALL
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_resolve_all_end_to_end() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let target = workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", Some("AllAtOnce"))
        .await
        .unwrap();

    assert_eq!(target.application_id(), "app-1");
    assert_eq!(target.profile().id, "p-1");
    assert_eq!(target.profile().kind, ProfileKind::Freeform);
    assert_eq!(target.environment_id(), "e-1");
    assert_eq!(target.deployment_strategy_id(), Some("s-1"));
}

#[tokio::test]
async fn test_resolve_all_calls_in_dependency_order() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", Some("AllAtOnce"))
        .await
        .unwrap();

    assert_eq!(
        backend.call_log(),
        vec![
            operation::LIST_APPLICATIONS,
            operation::LIST_CONFIGURATION_PROFILES,
            operation::GET_CONFIGURATION_PROFILE,
            operation::LIST_ENVIRONMENTS,
            operation::LIST_DEPLOYMENT_STRATEGIES,
        ]
    );
}

#[tokio::test]
async fn test_ambiguous_application_stops_resolution() {
    let backend = demo_backend().with_application("app-2", "demo");
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let err = workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", Some("AllAtOnce"))
        .await
        .unwrap_err();

    match err {
        DeployError::Ambiguous { kind, name, count } => {
            assert_eq!(kind, ResourceKind::Application);
            assert_eq!(name, "demo");
            assert_eq!(count, 2);
        }
        other => panic!("expected Ambiguous, got {:?}", other),
    }
    assert_eq!(backend.call_log(), vec![operation::LIST_APPLICATIONS]);
}

#[tokio::test]
async fn test_missing_application_makes_no_further_calls() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let err = workflow
        .resolver()
        .resolve_all("nope", "cfg", "prod", Some("AllAtOnce"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::NotFound {
            kind: ResourceKind::Application,
            ..
        }
    ));
    assert_eq!(backend.call_log(), vec![operation::LIST_APPLICATIONS]);
}

#[tokio::test]
async fn test_missing_environment_reports_kind_and_name() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let err = workflow
        .resolver()
        .resolve_all("demo", "cfg", "staging", Some("AllAtOnce"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "environment 'staging' not found");
    assert_eq!(backend.calls(operation::LIST_DEPLOYMENT_STRATEGIES), 0);
}

#[tokio::test]
async fn test_environments_are_scoped_to_application() {
    let backend = demo_backend()
        .with_application("app-2", "other")
        .with_environment("app-2", "e-2", "prod");
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    // same name under another application is not a collision
    let target = workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", None)
        .await
        .unwrap();
    assert_eq!(target.environment_id(), "e-1");
}

#[tokio::test]
async fn test_empty_strategy_is_left_unset() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let target = workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", Some(""))
        .await
        .unwrap();

    assert!(target.deployment_strategy_id().is_none());
    assert_eq!(backend.calls(operation::LIST_DEPLOYMENT_STRATEGIES), 0);
}

#[tokio::test]
async fn test_feature_flag_profile_kind_comes_from_detail() {
    let backend = demo_backend().with_profile("app-1", "p-2", "flags", ProfileKind::FeatureFlags);
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let profile = workflow
        .resolver()
        .resolve_profile("app-1", "flags")
        .await
        .unwrap();

    assert_eq!(profile.id, "p-2");
    assert_eq!(profile.kind, ProfileKind::FeatureFlags);
    assert_eq!(backend.calls(operation::GET_CONFIGURATION_PROFILE), 1);
}

#[tokio::test]
async fn test_resolution_follows_every_page() {
    let backend = InMemoryBackend::new()
        .with_page_size(1)
        .with_application("app-0", "first")
        .with_application("app-1", "second")
        .with_application("app-2", "third");
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let id = workflow
        .resolver()
        .resolve_application("third")
        .await
        .unwrap();

    assert_eq!(id, "app-2");
    assert_eq!(backend.calls(operation::LIST_APPLICATIONS), 3);
}

#[tokio::test]
async fn test_page_cap_fails_closed() {
    let backend = InMemoryBackend::new()
        .with_page_size(1)
        .with_application("app-0", "a")
        .with_application("app-1", "b")
        .with_application("app-2", "c");
    let config = WorkflowConfig {
        max_pages: 2,
        ..Default::default()
    };
    let workflow = DeploymentWorkflow::new(&backend, config);

    let err = workflow.resolver().resolve_application("a").await.unwrap_err();
    assert!(matches!(
        err,
        DeployError::PaginationLimitExceeded { pages: 2, .. }
    ));
}

#[tokio::test]
async fn test_remote_failure_names_operation() {
    let backend = demo_backend();
    backend.fail_operation(
        operation::LIST_ENVIRONMENTS,
        RemoteError::with_code("AccessDeniedException", "not allowed"),
    );
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let err = workflow
        .resolver()
        .resolve_all("demo", "cfg", "prod", Some("AllAtOnce"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "ListEnvironments failed: AccessDeniedException: not allowed"
    );
    assert_eq!(
        appconfig_deploy::classify(&err),
        appconfig_deploy::ErrorKind::AccessDenied
    );
}

// ═══════════════════════════════════════════════════════════════════
// STRATEGY DISPLAY NAME
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_predefined_strategy_needs_no_lookup() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());

    let name = workflow
        .resolver()
        .strategy_display_name("AppConfig.AllAtOnce")
        .await;

    assert_eq!(name, "AppConfig.AllAtOnce");
    assert!(backend.call_log().is_empty());
}

#[tokio::test]
async fn test_strategy_display_name_lookup_and_fallback() {
    let backend = demo_backend();
    let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());
    let resolver = workflow.resolver();

    assert_eq!(resolver.strategy_display_name("s-1").await, "AllAtOnce");
    assert_eq!(resolver.strategy_display_name("s-404").await, "s-404");

    backend.fail_operation(
        operation::LIST_DEPLOYMENT_STRATEGIES,
        RemoteError::new("down"),
    );
    assert_eq!(resolver.strategy_display_name("s-1").await, "s-1");
}
