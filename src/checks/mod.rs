// src/checks/mod.rs
mod http;
mod tcp;

pub use http::HttpChecker;
pub use tcp::TcpChecker;

use crate::config::ComponentConfig;
use crate::health::{Checker, Registry};
use anyhow::{Context, Result};
use std::sync::Arc;

pub fn build_checker(config: &ComponentConfig) -> Result<Arc<dyn Checker>> {
    let checker: Arc<dyn Checker> = match config {
        ComponentConfig::Http {
            url,
            expected_status,
            ..
        } => Arc::new(HttpChecker::new(url.clone(), *expected_status)?),
        ComponentConfig::Tcp { address, .. } => Arc::new(TcpChecker::new(address.clone())),
    };
    Ok(checker)
}

/// Registers a checker for every configured component.
pub fn populate_registry(registry: &Registry, components: &[ComponentConfig]) -> Result<()> {
    for component in components {
        let checker = build_checker(component)?;
        registry
            .register(component.name(), checker)
            .with_context(|| format!("Failed to register component {}", component.name()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_populate_registry_from_config() {
        let yaml = r#"
components:
  - kind: http
    name: api
    url: http://127.0.0.1:9000/healthz
  - kind: tcp
    name: db
    address: 127.0.0.1:5432
"#;
        let config = parse_config(yaml, true).unwrap();
        let registry = Registry::new();
        populate_registry(&registry, &config.components).unwrap();

        assert_eq!(registry.names(), vec!["api".to_string(), "db".to_string()]);
    }
}
