//! Journey Core — shared abstractions.
//!
//! This crate defines the error taxonomy, the clock, and the ports for the
//! message bus and the coordination store that every other crate depends
//! on. It contains no infrastructure code.

pub mod bus;
pub mod clock;
pub mod coordination;
pub mod error;
