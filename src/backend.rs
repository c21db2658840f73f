//! The One Trait: ConfigBackend
//!
//! This is the single abstraction point for the remote configuration
//! service. The engine is pure orchestration; it doesn't know about HTTP,
//! request signing, credentials or regions. That's YOUR problem when you
//! implement this trait.

use crate::error::DeployError;
use crate::types::*;
use std::future::Future;

/// The single trait consumers implement to drive deployments.
///
/// Every listing is cursor-paged: pass `None` for the first page and the
/// returned `next_token` for the following ones. Transport failures come
/// back as [`DeployError::Remote`] naming the operation.
pub trait ConfigBackend: Send + Sync {
    // ═══════════════════════════════════════════════════════════════
    // LISTINGS (paginated)
    // ═══════════════════════════════════════════════════════════════

    /// List applications in the account.
    fn list_applications(
        &self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Application>, DeployError>> + Send;

    /// List configuration profiles of an application. Rows carry no type.
    fn list_configuration_profiles(
        &self,
        application_id: &str,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<ProfileSummary>, DeployError>> + Send;

    /// List environments of an application.
    fn list_environments(
        &self,
        application_id: &str,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Environment>, DeployError>> + Send;

    /// List deployment strategies, predefined ones included.
    fn list_deployment_strategies(
        &self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<DeploymentStrategy>, DeployError>> + Send;

    /// List deployments for an application/environment pair.
    fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<DeploymentSummary>, DeployError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // DETAILS (read-only)
    // ═══════════════════════════════════════════════════════════════

    /// Fetch a profile with its type.
    fn get_configuration_profile(
        &self,
        application_id: &str,
        profile_id: &str,
    ) -> impl Future<Output = Result<ConfigurationProfile, DeployError>> + Send;

    /// Fetch one deployment with its event log.
    fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        deployment_number: i32,
    ) -> impl Future<Output = Result<DeploymentRecord, DeployError>> + Send;

    /// Fetch hosted configuration content at a version.
    fn get_hosted_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        version_number: i32,
    ) -> impl Future<Output = Result<ConfigurationVersion, DeployError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════

    /// Store new hosted content. Returns the version number the service
    /// assigned.
    fn create_hosted_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
        description: Option<&str>,
    ) -> impl Future<Output = Result<i32, DeployError>> + Send;

    /// Start rolling a version out. Returns the new deployment number.
    fn start_deployment(
        &self,
        request: &StartDeploymentRequest<'_>,
    ) -> impl Future<Output = Result<i32, DeployError>> + Send;
}

/// Arguments for [`ConfigBackend::start_deployment`].
#[derive(Debug, Clone, Copy)]
pub struct StartDeploymentRequest<'a> {
    pub application_id: &'a str,
    pub environment_id: &'a str,
    pub profile_id: &'a str,
    pub deployment_strategy_id: &'a str,
    /// Version as the service expects it on the wire.
    pub configuration_version: &'a str,
    pub description: Option<&'a str>,
}

/// Remote operation names, as used in errors and logs.
pub mod operation {
    pub const LIST_APPLICATIONS: &str = "ListApplications";
    pub const LIST_CONFIGURATION_PROFILES: &str = "ListConfigurationProfiles";
    pub const LIST_ENVIRONMENTS: &str = "ListEnvironments";
    pub const LIST_DEPLOYMENT_STRATEGIES: &str = "ListDeploymentStrategies";
    pub const LIST_DEPLOYMENTS: &str = "ListDeployments";
    pub const GET_CONFIGURATION_PROFILE: &str = "GetConfigurationProfile";
    pub const GET_DEPLOYMENT: &str = "GetDeployment";
    pub const GET_HOSTED_CONFIGURATION_VERSION: &str = "GetHostedConfigurationVersion";
    pub const CREATE_HOSTED_CONFIGURATION_VERSION: &str = "CreateHostedConfigurationVersion";
    pub const START_DEPLOYMENT: &str = "StartDeployment";
}
