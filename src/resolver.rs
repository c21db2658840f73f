//! Resource graph resolution: application → profile → environment → strategy.
//!
//! Each step lists the relevant resources, resolves the name, and feeds the
//! id into the next step. The first failure aborts; there is no partial
//! target.

use crate::backend::{operation, ConfigBackend};
use crate::error::DeployError;
use crate::paginate::collect_pages;
use crate::resolve::{is_predefined_strategy, resolve_id, resolve_name_from_id, ResourceKind};
use crate::types::{ConfigurationProfile, ResolvedDeploymentTarget};
use crate::workflow::WorkflowConfig;

/// Resolves human-readable names against the service.
pub struct ResourceResolver<'a, B: ConfigBackend> {
    backend: &'a B,
    max_pages: usize,
}

impl<'a, B: ConfigBackend> ResourceResolver<'a, B> {
    pub fn new(backend: &'a B, config: &WorkflowConfig) -> Self {
        Self {
            backend,
            max_pages: config.max_pages,
        }
    }

    /// Resolve every resource a deployment needs.
    ///
    /// `strategy_name` of `None` or `""` leaves the strategy unset, which is
    /// enough for read-only flows.
    pub async fn resolve_all(
        &self,
        application_name: &str,
        profile_name: &str,
        environment_name: &str,
        strategy_name: Option<&str>,
    ) -> Result<ResolvedDeploymentTarget, DeployError> {
        let application_id = self.resolve_application(application_name).await?;
        let profile = self.resolve_profile(&application_id, profile_name).await?;
        let environment_id = self
            .resolve_environment(&application_id, environment_name)
            .await?;

        let deployment_strategy_id = match strategy_name {
            Some(name) if !name.is_empty() => Some(self.resolve_deployment_strategy(name).await?),
            _ => None,
        };

        tracing::info!(
            application_id = %application_id,
            profile_id = %profile.id,
            environment_id = %environment_id,
            deployment_strategy_id = deployment_strategy_id.as_deref().unwrap_or("-"),
            "resources resolved"
        );

        Ok(ResolvedDeploymentTarget::new(
            application_id,
            profile,
            environment_id,
            deployment_strategy_id,
        ))
    }

    pub async fn resolve_application(&self, name: &str) -> Result<String, DeployError> {
        let backend = self.backend;
        let applications = collect_pages(
            operation::LIST_APPLICATIONS,
            self.max_pages,
            move |token| backend.list_applications(token),
        )
        .await?;

        resolve_id(&applications, name, ResourceKind::Application)
    }

    /// Resolve the profile id, then fetch the detail for its type.
    pub async fn resolve_profile(
        &self,
        application_id: &str,
        name: &str,
    ) -> Result<ConfigurationProfile, DeployError> {
        let backend = self.backend;
        let profiles = collect_pages(
            operation::LIST_CONFIGURATION_PROFILES,
            self.max_pages,
            move |token| backend.list_configuration_profiles(application_id, token),
        )
        .await?;

        let profile_id = resolve_id(&profiles, name, ResourceKind::ConfigurationProfile)?;
        self.backend
            .get_configuration_profile(application_id, &profile_id)
            .await
    }

    pub async fn resolve_environment(
        &self,
        application_id: &str,
        name: &str,
    ) -> Result<String, DeployError> {
        let backend = self.backend;
        let environments = collect_pages(
            operation::LIST_ENVIRONMENTS,
            self.max_pages,
            move |token| backend.list_environments(application_id, token),
        )
        .await?;

        resolve_id(&environments, name, ResourceKind::Environment)
    }

    pub async fn resolve_deployment_strategy(&self, name: &str) -> Result<String, DeployError> {
        let backend = self.backend;
        let strategies = collect_pages(
            operation::LIST_DEPLOYMENT_STRATEGIES,
            self.max_pages,
            move |token| backend.list_deployment_strategies(token),
        )
        .await?;

        resolve_id(&strategies, name, ResourceKind::DeploymentStrategy)
    }

    /// Human-readable name for a strategy id.
    ///
    /// Predefined strategies are named by their id and need no call. A failed
    /// listing falls back to the id; this is for display only.
    pub async fn strategy_display_name(&self, strategy_id: &str) -> String {
        if is_predefined_strategy(strategy_id) {
            return strategy_id.to_string();
        }

        let backend = self.backend;
        match collect_pages(
            operation::LIST_DEPLOYMENT_STRATEGIES,
            self.max_pages,
            move |token| backend.list_deployment_strategies(token),
        )
        .await
        {
            Ok(strategies) => resolve_name_from_id(&strategies, strategy_id),
            Err(err) => {
                tracing::debug!(error = %err, strategy_id, "strategy lookup failed");
                strategy_id.to_string()
            }
        }
    }
}
