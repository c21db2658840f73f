//! Deployment state vocabulary and the per-tick transition logic.
//!
//! The remote service owns the state; we only interpret each snapshot.
//! Anything outside the known vocabulary is carried as `Other` so the
//! poll loop can fail closed instead of spinning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DeployError;
use crate::types::{DeploymentEvent, DeploymentEventType, DeploymentRecord};

/// Rollout state as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeploymentState {
    /// Configuration is being pushed out.
    Deploying,
    /// Deploy phase done; post-deploy observation window is open.
    Baking,
    Complete,
    RolledBack,
    /// Unknown wire value.
    Other(String),
}

impl DeploymentState {
    /// Wire name of the state.
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Deploying => "DEPLOYING",
            DeploymentState::Baking => "BAKING",
            DeploymentState::Complete => "COMPLETE",
            DeploymentState::RolledBack => "ROLLED_BACK",
            DeploymentState::Other(s) => s,
        }
    }

    /// Is the rollout finished, one way or the other?
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Complete | DeploymentState::RolledBack)
    }

    /// Does this state count as a rollout that is still in flight?
    pub fn is_ongoing(&self) -> bool {
        matches!(self, DeploymentState::Deploying | DeploymentState::Baking)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DeploymentState {
    fn from(s: &str) -> Self {
        match s {
            "DEPLOYING" => DeploymentState::Deploying,
            "BAKING" => DeploymentState::Baking,
            "COMPLETE" => DeploymentState::Complete,
            "ROLLED_BACK" => DeploymentState::RolledBack,
            other => DeploymentState::Other(other.to_string()),
        }
    }
}

impl FromStr for DeploymentState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DeploymentState::from(s))
    }
}

impl Serialize for DeploymentState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeploymentState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DeploymentState::from(s.as_str()))
    }
}

/// What a wait considers "done".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Wait through the bake window until the rollout is complete.
    #[default]
    Complete,
    /// Return as soon as the deploy phase is over.
    Baking,
}

/// Outcome of looking at one status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Target reached; stop polling.
    Done,
    /// Keep polling.
    Pending,
}

/// Interpret one snapshot of a deployment under the given wait mode.
///
/// `RolledBack` and unknown states become errors; `Complete` is success in
/// either mode.
pub fn evaluate(record: &DeploymentRecord, mode: WaitMode) -> Result<Transition, DeployError> {
    match &record.state {
        DeploymentState::Complete => Ok(Transition::Done),
        DeploymentState::Baking if mode == WaitMode::Baking => Ok(Transition::Done),
        DeploymentState::Deploying | DeploymentState::Baking => Ok(Transition::Pending),
        DeploymentState::RolledBack => Err(DeployError::RolledBack {
            deployment_number: record.deployment_number,
            reason: rollback_reason(&record.event_log).map(str::to_string),
        }),
        DeploymentState::Other(state) => Err(DeployError::UnexpectedState {
            deployment_number: record.deployment_number,
            state: state.clone(),
        }),
    }
}

/// Description of the most recent rollback event, if it has one.
///
/// The event log is append-only, so the newest rollback entry is the
/// authoritative one; older entries are never consulted.
pub fn rollback_reason(event_log: &[DeploymentEvent]) -> Option<&str> {
    event_log
        .iter()
        .rev()
        .find(|event| {
            matches!(
                event.event_type,
                DeploymentEventType::RollbackStarted | DeploymentEventType::RollbackCompleted
            )
        })
        .and_then(|event| event.description.as_deref())
        .filter(|description| !description.is_empty())
}
