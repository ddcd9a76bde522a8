//! Client side of mapcache: the network seam, retrieval strategies, the
//! worker lifecycle and the geocoding collaborator.
//!
//! The worker is driven by the server binary and by the scenario tests in
//! `tests/`, which swap the reqwest network for `testing::ScriptedNetwork`
//! (enabled by the `testing` feature).

pub mod fetch;
pub mod geocode;
pub mod lifecycle;
pub mod strategy;
pub mod tasks;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod worker;

pub use fetch::{CacheMode, FetchConfig, HttpNetwork, Network};
pub use geocode::{GeocodeClient, GeocodeConfig, GeocodeError, GeocodeRequest};
pub use lifecycle::{ControlMessage, LifecycleState, PrecacheReport};
pub use tasks::BackgroundTasks;
pub use worker::{ActivationReport, FetchEvent, Interception, Worker, WorkerContext, WorkerStatus};
