// src/lib.rs
pub mod checks;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;

pub use health::{
    AggregateResult, CheckError, Checker, ComponentError, ComponentResult, Details,
    HealthAggregator, HealthError, Registry, Status,
};
