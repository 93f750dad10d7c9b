//! Ingestion side of the customer journey orchestrator.
//!
//! Records flow from a [`journey_core::bus::RecordSource`] through one
//! worker per partition into the [`gateway::IngestionGateway`], which
//! parses them, hands them to the orchestrator and decides whether the
//! offset may be committed.

pub mod dead_letter;
pub mod error;
pub mod gateway;
pub mod payload;
pub mod worker;
