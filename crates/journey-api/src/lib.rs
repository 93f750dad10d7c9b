//! Journey API — HTTP surface and runtime wiring.
//!
//! The binary in `main.rs` reads [`config::JourneyConfig`], installs
//! telemetry, connects the stores, starts the partition workers and serves
//! the routes in [`routes`].

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
