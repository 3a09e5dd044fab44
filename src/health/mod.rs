// src/health/mod.rs
mod aggregator;
mod checker;
mod error;
mod evaluator;
mod registry;
mod result;

pub use aggregator::HealthAggregator;
pub use checker::{CheckError, Checker};
pub use error::HealthError;
pub use evaluator::evaluate;
pub use registry::{is_valid_component_name, Registry};
pub use result::{AggregateResult, ComponentError, ComponentResult, Details, Status};
