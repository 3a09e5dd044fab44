// src/health/result.rs
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Free-form diagnostics reported by a checker.
pub type Details = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Down,
    Up,
}

impl Status {
    pub fn is_up(&self) -> bool {
        matches!(self, Status::Up)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Down => "down",
            Status::Up => "up",
        }
    }
}

/// Why a component was reported down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    #[error("{0}")]
    Checker(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("checker panicked: {0}")]
    Panicked(String),
}

impl ComponentError {
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ComponentError::DeadlineExceeded)
    }
}

fn serialize_error<S>(error: &Option<ComponentError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Outcome of checking a single component.
///
/// `error` is `Some` exactly when `status` is [`Status::Down`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResult {
    pub name: String,
    pub status: Status,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<ComponentError>,
    pub details: Details,
}

impl ComponentResult {
    pub fn up(name: impl Into<String>, details: Details) -> Self {
        Self {
            name: name.into(),
            status: Status::Up,
            error: None,
            details,
        }
    }

    pub fn down(name: impl Into<String>, error: ComponentError, details: Details) -> Self {
        Self {
            name: name.into(),
            status: Status::Down,
            error: Some(error),
            details,
        }
    }

    pub fn deadline_exceeded(name: impl Into<String>) -> Self {
        Self::down(name, ComponentError::DeadlineExceeded, Details::new())
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// Result of an aggregate query over every registered component.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub status: Status,
    pub components: BTreeMap<String, ComponentResult>,
    pub checked_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Builds the aggregate, deriving its status: down if any component is down.
    pub fn from_components<I>(components: I) -> Self
    where
        I: IntoIterator<Item = ComponentResult>,
    {
        let components: BTreeMap<String, ComponentResult> = components
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        let status = if components.values().all(ComponentResult::is_up) {
            Status::Up
        } else {
            Status::Down
        };

        Self {
            status,
            components,
            checked_at: Utc::now(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn component(&self, name: &str) -> Option<&ComponentResult> {
        self.components.get(name)
    }

    pub fn down_count(&self) -> usize {
        self.components.values().filter(|c| !c.is_up()).count()
    }
}
