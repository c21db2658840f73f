//! Name → identifier resolution.
//!
//! One generic resolver for every listable resource. Names are user-chosen
//! and may collide on the service side, so a match must be unique.

use std::fmt;

use crate::error::DeployError;
use crate::types::{Application, DeploymentStrategy, Environment, ProfileSummary};

/// Prefix the service reserves for its built-in deployment strategies.
pub const PREDEFINED_STRATEGY_PREFIX: &str = "AppConfig.";

/// Kind of resource being resolved, for error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Application,
    ConfigurationProfile,
    Environment,
    DeploymentStrategy,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Application => "application",
            ResourceKind::ConfigurationProfile => "configuration profile",
            ResourceKind::Environment => "environment",
            ResourceKind::DeploymentStrategy => "deployment strategy",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Application => "applications",
            ResourceKind::ConfigurationProfile => "configuration profiles",
            ResourceKind::Environment => "environments",
            ResourceKind::DeploymentStrategy => "deployment strategies",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Anything with a service id and a user-facing name.
pub trait NamedResource {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

macro_rules! named_resource {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NamedResource for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

named_resource!(Application, Environment, DeploymentStrategy, ProfileSummary);

/// Resolve `target_name` to the id of the single item carrying that name.
///
/// Exact, case-sensitive comparison. Zero matches is `NotFound`; more than
/// one is `Ambiguous`. Never picks the first of several.
pub fn resolve_id<T: NamedResource>(
    items: &[T],
    target_name: &str,
    kind: ResourceKind,
) -> Result<String, DeployError> {
    let mut matches = items.iter().filter(|item| item.name() == target_name);

    match (matches.next(), matches.next()) {
        (None, _) => Err(DeployError::NotFound {
            kind,
            name: target_name.to_string(),
        }),
        (Some(only), None) => Ok(only.id().to_string()),
        (Some(_), Some(_)) => Err(DeployError::Ambiguous {
            kind,
            name: target_name.to_string(),
            count: 2 + matches.count(),
        }),
    }
}

/// Display name for `target_id`, or the id itself when nothing matches.
///
/// Display only. Do not compare the result against ids.
pub fn resolve_name_from_id<T: NamedResource>(items: &[T], target_id: &str) -> String {
    items
        .iter()
        .find(|item| item.id() == target_id)
        .map(|item| item.name().to_string())
        .unwrap_or_else(|| target_id.to_string())
}

/// Built-in strategies are addressed by their name; no lookup needed.
pub fn is_predefined_strategy(id: &str) -> bool {
    id.starts_with(PREDEFINED_STRATEGY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps(pairs: &[(&str, &str)]) -> Vec<Application> {
        pairs
            .iter()
            .map(|(id, name)| Application {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_resolve_single_match() {
        let items = apps(&[("app-1", "demo"), ("app-2", "other")]);
        let id = resolve_id(&items, "demo", ResourceKind::Application).unwrap();
        assert_eq!(id, "app-1");
    }

    #[test]
    fn test_resolve_not_found() {
        let items = apps(&[("app-1", "demo")]);
        match resolve_id(&items, "missing", ResourceKind::Application) {
            Err(DeployError::NotFound { kind, name }) => {
                assert_eq!(kind, ResourceKind::Application);
                assert_eq!(name, "missing");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }

        let empty: Vec<Application> = Vec::new();
        assert!(matches!(
            resolve_id(&empty, "demo", ResourceKind::Application),
            Err(DeployError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_ambiguous_counts_all_matches() {
        let items = apps(&[("app-1", "demo"), ("app-2", "demo"), ("app-3", "demo")]);
        match resolve_id(&items, "demo", ResourceKind::Application) {
            Err(DeployError::Ambiguous { name, count, .. }) => {
                assert_eq!(name, "demo");
                assert_eq!(count, 3);
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let items = apps(&[("app-1", "Demo")]);
        assert!(resolve_id(&items, "demo", ResourceKind::Application).is_err());
        assert!(resolve_id(&items, "Demo ", ResourceKind::Application).is_err());
    }

    #[test]
    fn test_resolve_uniqueness_exhaustive() {
        // every subset of three slots named "x" or "y"
        for mask in 0u8..8 {
            let items: Vec<Application> = (0..3)
                .map(|i| Application {
                    id: format!("id-{}", i),
                    name: if mask & (1 << i) != 0 { "x" } else { "y" }.to_string(),
                })
                .collect();
            let hits = mask.count_ones();
            let result = resolve_id(&items, "x", ResourceKind::Environment);
            assert_eq!(result.is_ok(), hits == 1, "mask {:03b}", mask);
        }
    }

    #[test]
    fn test_resolve_name_from_id() {
        let items = vec![
            DeploymentStrategy::new("s-1", "Linear"),
            DeploymentStrategy::new("s-2", "Canary"),
        ];
        assert_eq!(resolve_name_from_id(&items, "s-2"), "Canary");
        assert_eq!(resolve_name_from_id(&items, "s-9"), "s-9");
    }

    #[test]
    fn test_predefined_strategy_prefix() {
        assert!(is_predefined_strategy("AppConfig.AllAtOnce"));
        assert!(is_predefined_strategy("AppConfig.Linear50PercentEvery30Seconds"));
        assert!(!is_predefined_strategy("abc123"));
        assert!(!is_predefined_strategy("appconfig.AllAtOnce"));
    }
}
