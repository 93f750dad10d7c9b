//! Application services for the Card Application context.

pub mod action_publisher;
pub mod decision_engine;
pub mod orchestrator;
pub mod ports;
pub mod query_handlers;
