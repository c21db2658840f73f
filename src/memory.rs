//! In-process configuration service.
//!
//! A complete [`ConfigBackend`] held in memory: real cursor pagination,
//! per-profile version numbering, per-environment deployment numbering and
//! admission control. Rollouts advance through a scripted sequence of
//! states, one step per deployment detail read.
//!
//! Every call is recorded so callers can assert on what was asked and in
//! which order. Failures can be injected per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{operation, ConfigBackend, StartDeploymentRequest};
use crate::error::{DeployError, RemoteError};
use crate::resolve::is_predefined_strategy;
use crate::state::DeploymentState;
use crate::types::*;

/// Page size when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 50;

struct StoredDeployment {
    application_id: String,
    environment_id: String,
    configuration_name: String,
    record: DeploymentRecord,
    /// States still to be reported, front first. The last one sticks.
    script: VecDeque<DeploymentState>,
}

struct Inner {
    page_size: usize,
    applications: Vec<Application>,
    profiles: Vec<(String, ConfigurationProfile)>,
    environments: Vec<(String, Environment)>,
    strategies: Vec<DeploymentStrategy>,
    versions: HashMap<(String, String), Vec<ConfigurationVersion>>,
    deployments: Vec<StoredDeployment>,
    rollout_script: Vec<DeploymentState>,
    rollback_reason: Option<String>,
    failures: HashMap<&'static str, RemoteError>,
    unreadable_deployments: Vec<i32>,
    calls: Vec<&'static str>,
}

/// Configuration service that lives in memory.
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty service. New rollouts go Deploying → Baking → Complete.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                page_size: DEFAULT_PAGE_SIZE,
                applications: Vec::new(),
                profiles: Vec::new(),
                environments: Vec::new(),
                strategies: Vec::new(),
                versions: HashMap::new(),
                deployments: Vec::new(),
                rollout_script: vec![
                    DeploymentState::Deploying,
                    DeploymentState::Baking,
                    DeploymentState::Complete,
                ],
                rollback_reason: None,
                failures: HashMap::new(),
                unreadable_deployments: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner_mut(&mut self) -> &mut Inner {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    // ═══════════════════════════════════════════════════════════════
    // SEEDING
    // ═══════════════════════════════════════════════════════════════

    /// Items per listing page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.inner_mut().page_size = page_size.max(1);
        self
    }

    pub fn with_application(mut self, id: &str, name: &str) -> Self {
        self.inner_mut().applications.push(Application {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_profile(
        mut self,
        application_id: &str,
        id: &str,
        name: &str,
        kind: ProfileKind,
    ) -> Self {
        self.inner_mut().profiles.push((
            application_id.to_string(),
            ConfigurationProfile {
                id: id.to_string(),
                name: name.to_string(),
                kind,
            },
        ));
        self
    }

    pub fn with_environment(mut self, application_id: &str, id: &str, name: &str) -> Self {
        self.inner_mut().environments.push((
            application_id.to_string(),
            Environment {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
        self
    }

    pub fn with_strategy(mut self, strategy: DeploymentStrategy) -> Self {
        self.inner_mut().strategies.push(strategy);
        self
    }

    /// States each new rollout reports, one per detail read. Empty keeps
    /// new rollouts in `Deploying` forever.
    pub fn with_rollout_script(mut self, states: Vec<DeploymentState>) -> Self {
        self.inner_mut().rollout_script = states;
        self
    }

    /// Description attached to rollback events.
    pub fn with_rollback_reason(mut self, reason: &str) -> Self {
        self.inner_mut().rollback_reason = Some(reason.to_string());
        self
    }

    /// Store hosted content directly. Returns its version number.
    pub fn seed_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
    ) -> i32 {
        let mut inner = self.lock();
        store_version(&mut inner, application_id, profile_id, content, content_type)
    }

    /// Insert an existing deployment as-is. Its state never changes.
    pub fn seed_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        record: DeploymentRecord,
    ) {
        let mut inner = self.lock();
        let configuration_name = inner
            .profiles
            .iter()
            .find(|(_, p)| p.id == record.configuration_profile_id)
            .map(|(_, p)| p.name.clone())
            .unwrap_or_default();
        inner.deployments.push(StoredDeployment {
            application_id: application_id.to_string(),
            environment_id: environment_id.to_string(),
            configuration_name,
            record,
            script: VecDeque::new(),
        });
    }

    // ═══════════════════════════════════════════════════════════════
    // FAULTS & INSPECTION
    // ═══════════════════════════════════════════════════════════════

    /// Make every call to `operation` fail with `error` until cleared.
    pub fn fail_operation(&self, operation: &'static str, error: RemoteError) {
        self.lock().failures.insert(operation, error);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.failures.clear();
        inner.unreadable_deployments.clear();
    }

    /// Detail reads of this deployment number fail.
    pub fn make_deployment_unreadable(&self, deployment_number: i32) {
        self.lock().unreadable_deployments.push(deployment_number);
    }

    /// Operations called so far, in order.
    pub fn call_log(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// How many times `operation` was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, Inner>, DeployError> {
        let mut inner = self.lock();
        inner.calls.push(op);
        if let Some(err) = inner.failures.get(op).cloned() {
            return Err(DeployError::remote(op, err));
        }
        Ok(inner)
    }
}

fn not_found(op: &'static str, what: impl std::fmt::Display) -> DeployError {
    DeployError::remote(
        op,
        RemoteError::with_code("ResourceNotFoundException", format!("{what} not found")),
    )
}

fn paginate<T: Clone>(
    op: &'static str,
    items: &[T],
    page_size: usize,
    next_token: Option<String>,
) -> Result<Page<T>, DeployError> {
    let start = match next_token {
        None => 0,
        Some(token) => match token.parse::<usize>() {
            Ok(offset) if offset <= items.len() => offset,
            _ => {
                return Err(DeployError::remote(
                    op,
                    RemoteError::with_code(
                        "BadRequestException",
                        format!("invalid next token '{token}'"),
                    ),
                ))
            }
        },
    };
    let end = start.saturating_add(page_size).min(items.len());
    let page = items[start..end].to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    Ok(Page::new(page, next))
}

fn store_version(
    inner: &mut Inner,
    application_id: &str,
    profile_id: &str,
    content: &[u8],
    content_type: &str,
) -> i32 {
    let versions = inner
        .versions
        .entry((application_id.to_string(), profile_id.to_string()))
        .or_default();
    let version_number = versions.last().map_or(1, |v| v.version_number + 1);
    versions.push(ConfigurationVersion {
        version_number,
        content: content.to_vec(),
        content_type: content_type.to_string(),
    });
    version_number
}

/// Move a scripted deployment one step and log the matching event.
fn advance(deployment: &mut StoredDeployment, rollback_reason: Option<&str>) {
    if deployment.record.state.is_terminal() {
        return;
    }
    let Some(next) = deployment.script.pop_front() else {
        return;
    };
    if next == deployment.record.state {
        return;
    }

    let log = &mut deployment.record.event_log;
    match &next {
        DeploymentState::Baking => {
            deployment.record.percentage_complete = 100.0;
            log.push(DeploymentEvent::new(DeploymentEventType::BakeTimeStarted, None));
        }
        DeploymentState::Complete => {
            deployment.record.percentage_complete = 100.0;
            log.push(DeploymentEvent::new(DeploymentEventType::DeploymentCompleted, None));
        }
        DeploymentState::RolledBack => {
            log.push(DeploymentEvent::new(
                DeploymentEventType::RollbackStarted,
                rollback_reason,
            ));
            log.push(DeploymentEvent::new(
                DeploymentEventType::RollbackCompleted,
                rollback_reason,
            ));
        }
        DeploymentState::Deploying | DeploymentState::Other(_) => {}
    }
    deployment.record.state = next;
}

impl ConfigBackend for InMemoryBackend {
    async fn list_applications(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Application>, DeployError> {
        let inner = self.enter(operation::LIST_APPLICATIONS)?;
        paginate(
            operation::LIST_APPLICATIONS,
            &inner.applications,
            inner.page_size,
            next_token,
        )
    }

    async fn list_configuration_profiles(
        &self,
        application_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<ProfileSummary>, DeployError> {
        let op = operation::LIST_CONFIGURATION_PROFILES;
        let inner = self.enter(op)?;
        let rows: Vec<ProfileSummary> = inner
            .profiles
            .iter()
            .filter(|(app, _)| app == application_id)
            .map(|(_, p)| ProfileSummary {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect();
        paginate(op, &rows, inner.page_size, next_token)
    }

    async fn list_environments(
        &self,
        application_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Environment>, DeployError> {
        let op = operation::LIST_ENVIRONMENTS;
        let inner = self.enter(op)?;
        let rows: Vec<Environment> = inner
            .environments
            .iter()
            .filter(|(app, _)| app == application_id)
            .map(|(_, e)| e.clone())
            .collect();
        paginate(op, &rows, inner.page_size, next_token)
    }

    async fn list_deployment_strategies(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<DeploymentStrategy>, DeployError> {
        let op = operation::LIST_DEPLOYMENT_STRATEGIES;
        let inner = self.enter(op)?;
        paginate(op, &inner.strategies, inner.page_size, next_token)
    }

    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<DeploymentSummary>, DeployError> {
        let op = operation::LIST_DEPLOYMENTS;
        let inner = self.enter(op)?;
        let rows: Vec<DeploymentSummary> = inner
            .deployments
            .iter()
            .filter(|d| d.application_id == application_id && d.environment_id == environment_id)
            .map(|d| DeploymentSummary {
                deployment_number: d.record.deployment_number,
                configuration_name: d.configuration_name.clone(),
                configuration_version: d.record.configuration_version.clone(),
                state: d.record.state.clone(),
                percentage_complete: d.record.percentage_complete,
            })
            .collect();
        paginate(op, &rows, inner.page_size, next_token)
    }

    async fn get_configuration_profile(
        &self,
        application_id: &str,
        profile_id: &str,
    ) -> Result<ConfigurationProfile, DeployError> {
        let op = operation::GET_CONFIGURATION_PROFILE;
        let inner = self.enter(op)?;
        inner
            .profiles
            .iter()
            .find(|(app, p)| app == application_id && p.id == profile_id)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| not_found(op, format_args!("configuration profile {profile_id}")))
    }

    async fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        deployment_number: i32,
    ) -> Result<DeploymentRecord, DeployError> {
        let op = operation::GET_DEPLOYMENT;
        let mut inner = self.enter(op)?;
        if inner.unreadable_deployments.contains(&deployment_number) {
            return Err(DeployError::remote(
                op,
                RemoteError::with_code("InternalServerException", "deployment unreadable"),
            ));
        }

        let Inner {
            deployments,
            rollback_reason,
            ..
        } = &mut *inner;
        let deployment = deployments
            .iter_mut()
            .find(|d| {
                d.application_id == application_id
                    && d.environment_id == environment_id
                    && d.record.deployment_number == deployment_number
            })
            .ok_or_else(|| not_found(op, format_args!("deployment #{deployment_number}")))?;

        advance(deployment, rollback_reason.as_deref());
        Ok(deployment.record.clone())
    }

    async fn get_hosted_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        version_number: i32,
    ) -> Result<ConfigurationVersion, DeployError> {
        let op = operation::GET_HOSTED_CONFIGURATION_VERSION;
        let inner = self.enter(op)?;
        inner
            .versions
            .get(&(application_id.to_string(), profile_id.to_string()))
            .and_then(|versions| versions.iter().find(|v| v.version_number == version_number))
            .cloned()
            .ok_or_else(|| not_found(op, format_args!("version {version_number}")))
    }

    async fn create_hosted_configuration_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
        _description: Option<&str>,
    ) -> Result<i32, DeployError> {
        let op = operation::CREATE_HOSTED_CONFIGURATION_VERSION;
        let mut inner = self.enter(op)?;
        if !inner
            .profiles
            .iter()
            .any(|(app, p)| app == application_id && p.id == profile_id)
        {
            return Err(not_found(op, format_args!("configuration profile {profile_id}")));
        }
        Ok(store_version(
            &mut inner,
            application_id,
            profile_id,
            content,
            content_type,
        ))
    }

    async fn start_deployment(
        &self,
        request: &StartDeploymentRequest<'_>,
    ) -> Result<i32, DeployError> {
        let op = operation::START_DEPLOYMENT;
        let mut inner = self.enter(op)?;

        let profile = inner
            .profiles
            .iter()
            .find(|(app, p)| app == request.application_id && p.id == request.profile_id)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| {
                not_found(
                    op,
                    format_args!("configuration profile {}", request.profile_id),
                )
            })?;

        if !inner
            .environments
            .iter()
            .any(|(app, e)| app == request.application_id && e.id == request.environment_id)
        {
            return Err(not_found(op, format_args!("environment {}", request.environment_id)));
        }

        let strategy_known = is_predefined_strategy(request.deployment_strategy_id)
            || inner
                .strategies
                .iter()
                .any(|s| s.id == request.deployment_strategy_id);
        if !strategy_known {
            return Err(not_found(
                op,
                format_args!("deployment strategy {}", request.deployment_strategy_id),
            ));
        }

        let version_exists = request
            .configuration_version
            .parse::<i32>()
            .ok()
            .and_then(|n| {
                inner
                    .versions
                    .get(&(request.application_id.to_string(), request.profile_id.to_string()))
                    .map(|versions| versions.iter().any(|v| v.version_number == n))
            })
            .unwrap_or(false);
        if !version_exists {
            return Err(not_found(
                op,
                format_args!("configuration version {}", request.configuration_version),
            ));
        }

        let in_pair = |d: &&StoredDeployment| {
            d.application_id == request.application_id && d.environment_id == request.environment_id
        };
        if let Some(busy) = inner
            .deployments
            .iter()
            .filter(in_pair)
            .find(|d| d.record.state.is_ongoing())
        {
            return Err(DeployError::remote(
                op,
                RemoteError::with_code(
                    "ConflictException",
                    format!("deployment #{} is in progress", busy.record.deployment_number),
                ),
            ));
        }

        let deployment_number = inner
            .deployments
            .iter()
            .filter(in_pair)
            .map(|d| d.record.deployment_number)
            .max()
            .unwrap_or(0)
            + 1;

        let record = DeploymentRecord {
            deployment_number,
            configuration_profile_id: profile.id.clone(),
            configuration_version: request.configuration_version.to_string(),
            state: DeploymentState::Deploying,
            description: request.description.unwrap_or_default().to_string(),
            percentage_complete: 0.0,
            event_log: vec![DeploymentEvent::new(
                DeploymentEventType::DeploymentStarted,
                None,
            )],
        };
        let script = inner.rollout_script.iter().cloned().collect();
        inner.deployments.push(StoredDeployment {
            application_id: request.application_id.to_string(),
            environment_id: request.environment_id.to_string(),
            configuration_name: profile.name,
            record,
            script,
        });

        Ok(deployment_number)
    }
}
