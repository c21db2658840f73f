//! End-to-end rollout against the in-memory service.
//!
//! Resolves names, deploys a JSON document, waits for the rollout, then
//! deploys the same content again to show the unchanged short-circuit.
//!
//! Usage:
//!   cargo run --example rollout
//!
//! Environment:
//!   ROLLOUT_POLL_MS       - status poll interval in ms (default: 200)
//!   ROLLOUT_TIMEOUT_SECS  - wait budget in seconds   (default: 30)
//!   ROLLOUT_ROLLBACK      - if set, the rollout rolls back with this reason

use std::time::Duration;

use appconfig_deploy::{
    CancellationToken, DeployOptions, DeployOutcome, DeploymentState, DeploymentStrategy,
    DeploymentWorkflow, InMemoryBackend, ProfileKind, WaitMode, WorkflowConfig,
};

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new()
        .with_application("app-7f3k", "storefront")
        .with_profile("app-7f3k", "prof-91a", "checkout-flags", ProfileKind::Freeform)
        .with_environment("app-7f3k", "env-2b8", "production")
        .with_strategy(DeploymentStrategy {
            description: "10% every minute, 5 minute bake".to_string(),
            deployment_duration_minutes: 10,
            final_bake_time_minutes: 5,
            growth_factor: 10.0,
            ..DeploymentStrategy::new("strat-c4d", "Linear10")
        });

    match std::env::var("ROLLOUT_ROLLBACK") {
        Ok(reason) => backend
            .with_rollout_script(vec![
                DeploymentState::Deploying,
                DeploymentState::Baking,
                DeploymentState::RolledBack,
            ])
            .with_rollback_reason(&reason),
        Err(_) => backend,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    // Control verbosity with RUST_LOG:
    //   RUST_LOG=info   - resolution and rollout milestones (default)
    //   RUST_LOG=debug  - every status check
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WorkflowConfig {
        poll_interval: Duration::from_millis(env_u64("ROLLOUT_POLL_MS", 200)),
        timeout: Duration::from_secs(env_u64("ROLLOUT_TIMEOUT_SECS", 30)),
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let backend = backend();
    let workflow = DeploymentWorkflow::new(&backend, config).with_cancellation(cancel);

    println!("═══ AppConfig Rollout ═══");
    println!();

    let target = workflow
        .resolver()
        .resolve_all("storefront", "checkout-flags", "production", Some("Linear10"))
        .await?;
    let strategy_id = target.deployment_strategy_id().unwrap_or_default();
    println!("  application: {}", target.application_id());
    println!("  profile:     {} ({})", target.profile().id, target.profile().kind.as_str());
    println!("  environment: {}", target.environment_id());
    println!(
        "  strategy:    {}",
        workflow.resolver().strategy_display_name(strategy_id).await
    );
    println!();

    let content = br#"{"newCheckout":{"enabled":true}}"#;
    let options = DeployOptions {
        description: Some("enable new checkout".to_string()),
        wait: Some(WaitMode::Complete),
        skip_unchanged: true,
        ..Default::default()
    };

    for attempt in 1..=2 {
        match workflow
            .deploy(&target, content, "application/json", &options)
            .await?
        {
            DeployOutcome::Started {
                version_number,
                deployment_number,
                final_record,
            } => {
                println!(
                    "attempt {}: deployed version {} as deployment #{}",
                    attempt, version_number, deployment_number
                );
                if let Some(record) = final_record {
                    println!("  final state: {}", record.state);
                }
            }
            DeployOutcome::Unchanged {
                deployment_number,
                version_number,
            } => {
                println!(
                    "attempt {}: version {} already live in deployment #{}, nothing to do",
                    attempt, version_number, deployment_number
                );
            }
        }
    }

    if let Some(live) = workflow.deployed_configuration(&target).await? {
        println!();
        println!(
            "live: version {} ({}): {}",
            live.version_number,
            live.content_type,
            String::from_utf8_lossy(&live.content)
        );
    }

    Ok(())
}
