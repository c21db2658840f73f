//! Deployment Workflow Engine
//!
//! Creates versions, starts rollouts and polls them to a terminal state.
//! It's dumb: it calls the backend and interprets what comes back. No
//! transport, no credentials, no persistence. Just logic.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backend::{operation, ConfigBackend, StartDeploymentRequest};
use crate::error::DeployError;
use crate::paginate::{collect_pages, DEFAULT_MAX_PAGES};
use crate::resolver::ResourceResolver;
use crate::state::{evaluate, DeploymentState, Transition, WaitMode};
use crate::types::{
    ConfigurationVersion, DeploymentRecord, DeploymentSummary, ResolvedDeploymentTarget,
};

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Pause between status checks while waiting.
    pub poll_interval: Duration,
    /// Wait budget used by [`DeploymentWorkflow::deploy`] when the options
    /// don't set one.
    pub timeout: Duration,
    /// Max pages fetched for any single listing.
    pub max_pages: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Knobs for a one-shot [`DeploymentWorkflow::deploy`].
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Description stored on the version and the deployment.
    pub description: Option<String>,
    /// Wait for the rollout after starting it. `None` returns right away.
    pub wait: Option<WaitMode>,
    /// Overrides [`WorkflowConfig::timeout`] for the wait.
    pub timeout: Option<Duration>,
    /// Don't deploy when the live version has the same bytes and content type.
    pub skip_unchanged: bool,
}

/// What a [`DeploymentWorkflow::deploy`] call did.
#[derive(Debug, Clone)]
pub enum DeployOutcome {
    /// The live deployment already carries this content.
    Unchanged {
        deployment_number: i32,
        version_number: i32,
    },
    /// A new version was created and rolled out.
    Started {
        version_number: i32,
        deployment_number: i32,
        /// Last status seen, when the call waited.
        final_record: Option<DeploymentRecord>,
    },
}

/// The deployment workflow engine.
///
/// Parameterized by the backend; you provide the implementation.
pub struct DeploymentWorkflow<'a, B: ConfigBackend> {
    backend: &'a B,
    config: WorkflowConfig,
    cancel: CancellationToken,
}

impl<'a, B: ConfigBackend> DeploymentWorkflow<'a, B> {
    /// Create a new workflow engine.
    pub fn new(backend: &'a B, config: WorkflowConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Resolver sharing this workflow's backend and limits.
    pub fn resolver(&self) -> ResourceResolver<'a, B> {
        ResourceResolver::new(self.backend, &self.config)
    }

    // ═══════════════════════════════════════════════════════════════
    // GUARD
    // ═══════════════════════════════════════════════════════════════

    /// First deployment in listing order that is still Deploying or Baking.
    ///
    /// Advisory: someone else can start a rollout right after this returns.
    /// The service's own admission control has the final word.
    pub async fn has_ongoing_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Option<DeploymentSummary>, DeployError> {
        let deployments = self.list_deployments(application_id, environment_id).await?;
        let ongoing = deployments.into_iter().find(|d| d.state.is_ongoing());

        if let Some(d) = &ongoing {
            tracing::debug!(
                deployment_number = d.deployment_number,
                state = %d.state,
                "ongoing deployment found"
            );
        }
        Ok(ongoing)
    }

    /// Fail with `DeploymentInProgress` if the target's environment is busy.
    pub async fn ensure_no_ongoing_deployment(
        &self,
        target: &ResolvedDeploymentTarget,
    ) -> Result<(), DeployError> {
        match self
            .has_ongoing_deployment(target.application_id(), target.environment_id())
            .await?
        {
            Some(d) => Err(DeployError::DeploymentInProgress {
                deployment_number: d.deployment_number,
            }),
            None => Ok(()),
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════

    /// Upload content as a new hosted version of the target profile.
    pub async fn create_version(
        &self,
        target: &ResolvedDeploymentTarget,
        content: &[u8],
        content_type: &str,
        description: Option<&str>,
    ) -> Result<i32, DeployError> {
        let version_number = self
            .backend
            .create_hosted_configuration_version(
                target.application_id(),
                &target.profile().id,
                content,
                content_type,
                description,
            )
            .await?;

        tracing::info!(version_number, bytes = content.len(), "configuration version created");
        Ok(version_number)
    }

    /// Start rolling `version_number` out to the target environment.
    pub async fn start_deployment(
        &self,
        target: &ResolvedDeploymentTarget,
        version_number: i32,
        description: Option<&str>,
    ) -> Result<i32, DeployError> {
        let deployment_strategy_id = target
            .deployment_strategy_id()
            .ok_or(DeployError::MissingDeploymentStrategy)?;
        let configuration_version = version_number.to_string();

        let request = StartDeploymentRequest {
            application_id: target.application_id(),
            environment_id: target.environment_id(),
            profile_id: &target.profile().id,
            deployment_strategy_id,
            configuration_version: &configuration_version,
            description,
        };
        let deployment_number = self.backend.start_deployment(&request).await?;

        tracing::info!(deployment_number, version_number, "deployment started");
        Ok(deployment_number)
    }

    // ═══════════════════════════════════════════════════════════════
    // STATUS & WAITING
    // ═══════════════════════════════════════════════════════════════

    /// Current snapshot of one deployment.
    pub async fn deployment_status(
        &self,
        application_id: &str,
        environment_id: &str,
        deployment_number: i32,
    ) -> Result<DeploymentRecord, DeployError> {
        self.backend
            .get_deployment(application_id, environment_id, deployment_number)
            .await
    }

    /// Wait until the deployment completes, rolls back, or `timeout` passes.
    pub async fn wait_for_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        deployment_number: i32,
        timeout: Duration,
    ) -> Result<DeploymentRecord, DeployError> {
        self.wait_for_phase(
            application_id,
            environment_id,
            deployment_number,
            WaitMode::Complete,
            timeout,
        )
        .await
    }

    /// Poll until the deployment reaches what `mode` considers done.
    ///
    /// The first check happens immediately and starts the clock. Each tick
    /// is exactly one status call. Cancellation is checked before every
    /// call and interrupts the sleep between calls.
    pub async fn wait_for_phase(
        &self,
        application_id: &str,
        environment_id: &str,
        deployment_number: i32,
        mode: WaitMode,
        timeout: Duration,
    ) -> Result<DeploymentRecord, DeployError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout).unwrap_or(started + FAR_FUTURE);
        let mut checks = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeployError::Cancelled { deployment_number });
            }

            let record = self
                .deployment_status(application_id, environment_id, deployment_number)
                .await?;
            checks += 1;

            tracing::debug!(
                deployment_number,
                state = %record.state,
                percentage = record.percentage_complete,
                checks,
                "deployment status"
            );

            match evaluate(&record, mode) {
                Ok(Transition::Done) => {
                    tracing::info!(deployment_number, state = %record.state, "deployment finished");
                    return Ok(record);
                }
                Ok(Transition::Pending) => {}
                Err(err) => {
                    tracing::warn!(deployment_number, error = %err, "deployment failed");
                    return Err(err);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DeployError::TimedOut {
                    deployment_number,
                    timeout,
                });
            }

            let wake = (now + self.config.poll_interval).min(deadline);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(DeployError::Cancelled { deployment_number });
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // LATEST DEPLOYMENT
    // ═══════════════════════════════════════════════════════════════

    /// Highest-numbered deployment of `profile_id` that was not rolled back.
    ///
    /// This is what the deploy flow treats as live.
    pub async fn latest_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.find_latest_deployment(application_id, environment_id, profile_id, false)
            .await
    }

    /// Highest-numbered deployment of `profile_id`, rolled back or not.
    ///
    /// For reporting what was attempted last.
    pub async fn latest_deployment_including_rolled_back(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.find_latest_deployment(application_id, environment_id, profile_id, true)
            .await
    }

    /// Content of the live (latest non-rolled-back) deployment, if any.
    pub async fn deployed_configuration(
        &self,
        target: &ResolvedDeploymentTarget,
    ) -> Result<Option<ConfigurationVersion>, DeployError> {
        Ok(self
            .live_configuration(target)
            .await?
            .map(|(_, version)| version))
    }

    // ═══════════════════════════════════════════════════════════════
    // ONE-SHOT
    // ═══════════════════════════════════════════════════════════════

    /// Guard, create a version, start it, and optionally wait.
    pub async fn deploy(
        &self,
        target: &ResolvedDeploymentTarget,
        content: &[u8],
        content_type: &str,
        options: &DeployOptions,
    ) -> Result<DeployOutcome, DeployError> {
        self.ensure_no_ongoing_deployment(target).await?;

        if options.skip_unchanged {
            if let Some((record, live)) = self.live_configuration(target).await? {
                if live.content == content && live.content_type == content_type {
                    tracing::info!(
                        deployment_number = record.deployment_number,
                        version_number = live.version_number,
                        "content unchanged, skipping deployment"
                    );
                    return Ok(DeployOutcome::Unchanged {
                        deployment_number: record.deployment_number,
                        version_number: live.version_number,
                    });
                }
            }
        }

        let description = options.description.as_deref();
        let version_number = self
            .create_version(target, content, content_type, description)
            .await?;
        let deployment_number = self
            .start_deployment(target, version_number, description)
            .await?;

        let final_record = match options.wait {
            Some(mode) => Some(
                self.wait_for_phase(
                    target.application_id(),
                    target.environment_id(),
                    deployment_number,
                    mode,
                    options.timeout.unwrap_or(self.config.timeout),
                )
                .await?,
            ),
            None => None,
        };

        Ok(DeployOutcome::Started {
            version_number,
            deployment_number,
            final_record,
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════

    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Vec<DeploymentSummary>, DeployError> {
        let backend = self.backend;
        collect_pages(
            operation::LIST_DEPLOYMENTS,
            self.config.max_pages,
            move |token| backend.list_deployments(application_id, environment_id, token),
        )
        .await
    }

    /// Listing rows lack the profile id, so every candidate needs a detail
    /// fetch. A candidate whose detail can't be read is skipped.
    async fn find_latest_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
        include_rolled_back: bool,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let deployments = self.list_deployments(application_id, environment_id).await?;
        let mut latest: Option<DeploymentRecord> = None;

        for summary in deployments {
            let record = match self
                .backend
                .get_deployment(application_id, environment_id, summary.deployment_number)
                .await
            {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(
                        deployment_number = summary.deployment_number,
                        error = %err,
                        "skipping unreadable deployment"
                    );
                    continue;
                }
            };

            if record.configuration_profile_id != profile_id {
                continue;
            }
            if !include_rolled_back && record.state == DeploymentState::RolledBack {
                continue;
            }
            if latest
                .as_ref()
                .map_or(true, |l| record.deployment_number > l.deployment_number)
            {
                latest = Some(record);
            }
        }

        Ok(latest)
    }

    async fn live_configuration(
        &self,
        target: &ResolvedDeploymentTarget,
    ) -> Result<Option<(DeploymentRecord, ConfigurationVersion)>, DeployError> {
        let Some(record) = self
            .latest_deployment(
                target.application_id(),
                target.environment_id(),
                &target.profile().id,
            )
            .await?
        else {
            return Ok(None);
        };

        let version_number = record.version_number()?;
        let version = self
            .backend
            .get_hosted_configuration_version(
                target.application_id(),
                &target.profile().id,
                version_number,
            )
            .await?;

        Ok(Some((record, version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(1800));
        assert_eq!(config.max_pages, 10_000);
    }

    #[test]
    fn test_default_options() {
        let options = DeployOptions::default();
        assert!(options.wait.is_none());
        assert!(options.timeout.is_none());
        assert!(!options.skip_unchanged);
    }
}
