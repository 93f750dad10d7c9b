//! Customer Journey Orchestrator — Card Application bounded context.
//!
//! Responsible for advancing each customer's credit-card application
//! journey from lifecycle events and for emitting the resulting customer
//! notifications exactly once per transition.

pub mod application;
pub mod domain;
