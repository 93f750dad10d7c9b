//! Shared test doubles and utilities for the customer journey orchestrator.

mod bus;
mod clock;
mod coordination;
mod local_bus;
mod publisher;
mod stores;

pub use bus::RecordingProducer;
pub use clock::{FixedClock, ManualClock};
pub use coordination::{FailingCoordinationStore, InMemoryCoordinationStore};
pub use local_bus::LocalBus;
pub use publisher::{FailingActionPublisher, RecordingActionPublisher};
pub use stores::{
    FailingEventStore, FailingStateStore, InMemoryActionAuditSink, InMemoryEventStore,
    InMemoryStateStore,
};
