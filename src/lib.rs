//! AppConfig Deploy Library
//!
//! Standalone, trait-based resolve-and-rollout engine for managed
//! configuration deployments.
//!
//! # Design
//!
//! This library provides the deployment logic without coupling to any
//! specific transport, signing, or credential implementation. You implement
//! the [`ConfigBackend`] trait over your client of the configuration
//! service, and the engine handles name resolution, the ongoing-deployment
//! guard, version creation, rollout start and the polling state machine.
//!
//! # Usage
//!
//! ```ignore
//! use appconfig_deploy::{
//!     ConfigBackend, DeployOptions, DeployOutcome, DeploymentWorkflow, WaitMode, WorkflowConfig,
//! };
//!
//! // Implement ConfigBackend for your infrastructure
//! struct MyBackend { /* ... */ }
//! impl ConfigBackend for MyBackend { /* ... */ }
//!
//! let backend = MyBackend::new();
//! let workflow = DeploymentWorkflow::new(&backend, WorkflowConfig::default());
//!
//! // Names → ids, in dependency order
//! let target = workflow
//!     .resolver()
//!     .resolve_all("my-app", "my-profile", "prod", Some("AppConfig.AllAtOnce"))
//!     .await?;
//!
//! // Guard, create version, start, wait
//! let options = DeployOptions {
//!     wait: Some(WaitMode::Complete),
//!     ..Default::default()
//! };
//! match workflow.deploy(&target, content, "application/json", &options).await? {
//!     DeployOutcome::Started { deployment_number, .. } => println!("deployed #{}", deployment_number),
//!     DeployOutcome::Unchanged { .. } => println!("nothing to do"),
//! }
//! ```

pub mod backend;
pub mod error;
pub mod paginate;
pub mod resolve;
pub mod resolver;
pub mod state;
pub mod types;
pub mod workflow;

#[cfg(feature = "memory-backend")]
pub mod memory;

// Re-export the main types at crate root for convenience
pub use backend::{operation, ConfigBackend, StartDeploymentRequest};
pub use error::{classify, DeployError, ErrorKind, RemoteError};
pub use paginate::collect_pages;
pub use resolve::{
    is_predefined_strategy, resolve_id, resolve_name_from_id, NamedResource, ResourceKind,
};
pub use resolver::ResourceResolver;
pub use state::{evaluate, rollback_reason, DeploymentState, Transition, WaitMode};
pub use types::*;
pub use workflow::{DeployOptions, DeployOutcome, DeploymentWorkflow, WorkflowConfig};

#[cfg(feature = "memory-backend")]
pub use memory::InMemoryBackend;

pub use tokio_util::sync::CancellationToken;
