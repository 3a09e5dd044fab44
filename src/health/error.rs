// src/health/error.rs

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Component already registered: {0}")]
    DuplicateComponent(String),

    #[error("Invalid component name {0:?}: use letters, digits, '-', '_', '.', ':' or '~'")]
    InvalidComponentName(String),
}
