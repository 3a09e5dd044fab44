// src/health/registry.rs
use super::checker::Checker;
use super::error::HealthError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Component names must be usable verbatim as a URL path segment.
pub fn is_valid_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '~'))
}

/// Named checkers, shared between registration and queries.
///
/// Queries take the read lock only long enough to clone the checker
/// handles they need, never across a running check.
#[derive(Default)]
pub struct Registry {
    checkers: RwLock<HashMap<String, Arc<dyn Checker>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        checker: Arc<dyn Checker>,
    ) -> Result<(), HealthError> {
        let name = name.into();
        if !is_valid_component_name(&name) {
            return Err(HealthError::InvalidComponentName(name));
        }

        let mut checkers = self.checkers.write();
        if checkers.contains_key(&name) {
            return Err(HealthError::DuplicateComponent(name));
        }
        checkers.insert(name.clone(), checker);
        drop(checkers);

        tracing::info!("Registered component: {}", name);
        Ok(())
    }

    pub fn deregister(&self, name: &str) -> bool {
        let removed = self.checkers.write().remove(name).is_some();
        if removed {
            tracing::info!("Deregistered component: {}", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Checker>> {
        self.checkers.read().get(name).cloned()
    }

    /// Every registered (name, checker) pair at the moment of the call.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn Checker>)> {
        self.checkers
            .read()
            .iter()
            .map(|(name, checker)| (name.clone(), checker.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.checkers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.checkers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.read().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CheckError, Details};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct AlwaysUp;

    #[async_trait]
    impl Checker for AlwaysUp {
        async fn check(&self, _cancel: CancellationToken) -> Result<Details, CheckError> {
            Ok(Details::new())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        registry.register("db", Arc::new(AlwaysUp)).unwrap();
        registry.register("cache", Arc::new(AlwaysUp)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("db").is_some());
        assert!(registry.get("queue").is_none());
        assert_eq!(registry.names(), vec!["cache".to_string(), "db".to_string()]);
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        let registry = Registry::new();
        registry.register("db", Arc::new(AlwaysUp)).unwrap();

        assert_eq!(
            registry.register("db", Arc::new(AlwaysUp)),
            Err(HealthError::DuplicateComponent("db".to_string()))
        );
        assert_eq!(
            registry.register("", Arc::new(AlwaysUp)),
            Err(HealthError::InvalidComponentName(String::new()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_must_be_path_safe() {
        let registry = Registry::new();
        for name in ["my db", "api/v2", "cache%20", "caf\u{e9}"] {
            assert_eq!(
                registry.register(name, Arc::new(AlwaysUp)),
                Err(HealthError::InvalidComponentName(name.to_string()))
            );
        }
        for name in ["postgres-primary", "redis_0", "svc.internal:6379", "v~1"] {
            registry.register(name, Arc::new(AlwaysUp)).unwrap();
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_snapshot_outlives_deregistration() {
        let registry = Registry::new();
        registry.register("db", Arc::new(AlwaysUp)).unwrap();

        let snapshot = registry.snapshot();
        assert!(registry.deregister("db"));
        assert!(!registry.deregister("db"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "db");
        assert!(registry.is_empty());
    }
}
