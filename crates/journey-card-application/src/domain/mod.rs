//! Domain model for the Card Application context.

pub mod action;
pub mod customer;
pub mod events;
pub mod messages;
pub mod state;
