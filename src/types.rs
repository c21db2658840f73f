//! Minimal domain types for the deployment workflow.
//!
//! These are the shapes the engine needs from the configuration service.
//! Listing calls return summaries; detail calls return the full records.

use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::state::DeploymentState;

/// One page of a cursor-paged listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// A single page with nothing after it.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// Deployment strategy. Account-wide, not scoped to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deployment_duration_minutes: u32,
    #[serde(default)]
    pub final_bake_time_minutes: u32,
    #[serde(default)]
    pub growth_factor: f32,
}

impl DeploymentStrategy {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            deployment_duration_minutes: 0,
            final_bake_time_minutes: 0,
            growth_factor: 100.0,
        }
    }
}

/// Profile row from a listing. The listing omits the profile type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
}

/// Configuration profile type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileKind {
    #[default]
    #[serde(rename = "AWS.Freeform")]
    Freeform,
    #[serde(rename = "AWS.AppConfig.FeatureFlags")]
    FeatureFlags,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Freeform => "AWS.Freeform",
            ProfileKind::FeatureFlags => "AWS.AppConfig.FeatureFlags",
        }
    }

    /// Map the service's profile type string. Absent means freeform.
    pub fn from_type(profile_type: Option<&str>) -> Self {
        match profile_type {
            Some("AWS.AppConfig.FeatureFlags") => ProfileKind::FeatureFlags,
            _ => ProfileKind::Freeform,
        }
    }
}

/// Full profile detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationProfile {
    pub id: String,
    pub name: String,
    pub kind: ProfileKind,
}

/// Everything needed to create a version and start a rollout.
///
/// Built once per invocation by the resolver and never changed after.
/// The strategy is absent for read-only flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDeploymentTarget {
    application_id: String,
    profile: ConfigurationProfile,
    environment_id: String,
    deployment_strategy_id: Option<String>,
}

impl ResolvedDeploymentTarget {
    pub fn new(
        application_id: impl Into<String>,
        profile: ConfigurationProfile,
        environment_id: impl Into<String>,
        deployment_strategy_id: Option<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            profile,
            environment_id: environment_id.into(),
            deployment_strategy_id,
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn profile(&self) -> &ConfigurationProfile {
        &self.profile
    }

    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    pub fn deployment_strategy_id(&self) -> Option<&str> {
        self.deployment_strategy_id.as_deref()
    }
}

/// Hosted configuration content at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub version_number: i32,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Event type in a deployment's event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentEventType {
    DeploymentStarted,
    PercentageUpdated,
    BakeTimeStarted,
    RollbackStarted,
    RollbackCompleted,
    DeploymentCompleted,
    RevertCompleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub event_type: DeploymentEventType,
    #[serde(default)]
    pub description: Option<String>,
    /// RFC 3339 timestamp, when the service reports one.
    #[serde(default)]
    pub occurred_at: Option<String>,
}

impl DeploymentEvent {
    pub fn new(event_type: DeploymentEventType, description: Option<&str>) -> Self {
        Self {
            event_type,
            description: description.map(str::to_string),
            occurred_at: None,
        }
    }
}

/// Deployment row from a listing. No profile id; fetch the detail for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub deployment_number: i32,
    pub configuration_name: String,
    pub configuration_version: String,
    pub state: DeploymentState,
    #[serde(default)]
    pub percentage_complete: f32,
}

/// Full deployment detail, including the event log (oldest entry first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployment_number: i32,
    pub configuration_profile_id: String,
    pub configuration_version: String,
    pub state: DeploymentState,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub percentage_complete: f32,
    #[serde(default)]
    pub event_log: Vec<DeploymentEvent>,
}

impl DeploymentRecord {
    /// The deployed configuration version as a number.
    ///
    /// The service reports versions as strings; anything that is not an
    /// integer is a contract violation.
    pub fn version_number(&self) -> Result<i32, DeployError> {
        parse_version_number(&self.configuration_version)
    }
}

fn parse_version_number(raw: &str) -> Result<i32, DeployError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DeployError::InvalidVersionNumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_kind_from_type() {
        assert_eq!(ProfileKind::from_type(None), ProfileKind::Freeform);
        assert_eq!(
            ProfileKind::from_type(Some("AWS.Freeform")),
            ProfileKind::Freeform
        );
        assert_eq!(
            ProfileKind::from_type(Some("AWS.AppConfig.FeatureFlags")),
            ProfileKind::FeatureFlags
        );
    }

    #[test]
    fn test_version_number_parsing() {
        let mut record = DeploymentRecord {
            deployment_number: 1,
            configuration_profile_id: "p-1".to_string(),
            configuration_version: "12".to_string(),
            state: DeploymentState::Complete,
            description: String::new(),
            percentage_complete: 100.0,
            event_log: Vec::new(),
        };
        assert_eq!(record.version_number().unwrap(), 12);

        record.configuration_version = "latest".to_string();
        match record.version_number() {
            Err(DeployError::InvalidVersionNumber(raw)) => assert_eq!(raw, "latest"),
            other => panic!("expected InvalidVersionNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_target_accessors() {
        let profile = ConfigurationProfile {
            id: "p-1".to_string(),
            name: "cfg".to_string(),
            kind: ProfileKind::FeatureFlags,
        };
        let target = ResolvedDeploymentTarget::new("app-1", profile, "e-1", None);
        assert_eq!(target.application_id(), "app-1");
        assert_eq!(target.environment_id(), "e-1");
        assert_eq!(target.profile().kind, ProfileKind::FeatureFlags);
        assert!(target.deployment_strategy_id().is_none());
    }

    #[test]
    fn test_serialization_golden() {
        let record = DeploymentRecord {
            deployment_number: 3,
            configuration_profile_id: "p-1".to_string(),
            configuration_version: "2".to_string(),
            state: DeploymentState::RolledBack,
            description: "release".to_string(),
            percentage_complete: 50.0,
            event_log: vec![DeploymentEvent::new(
                DeploymentEventType::RollbackStarted,
                Some("alarm"),
            )],
        };

        let json = serde_json::to_string(&record).unwrap();

        let expected = r#"{"deployment_number":3,"configuration_profile_id":"p-1","configuration_version":"2","state":"ROLLED_BACK","description":"release","percentage_complete":50.0,"event_log":[{"event_type":"ROLLBACK_STARTED","description":"alarm","occurred_at":null}]}"#;
        assert_eq!(json, expected, "JSON structure changed - wire format compatibility broken");

        let deserialized: DeploymentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, record);
    }

    #[test]
    fn test_unknown_event_type_deserializes() {
        let event: DeploymentEvent =
            serde_json::from_str(r#"{"event_type":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(event.event_type, DeploymentEventType::Unknown);
        assert!(event.description.is_none());

        let kind: ProfileKind = serde_json::from_str(r#""AWS.AppConfig.FeatureFlags""#).unwrap();
        assert_eq!(kind, ProfileKind::FeatureFlags);
    }
}
