//! Session wiring: the application context and the background price poller.

pub mod context;
pub mod poller;

pub use context::AppContext;
pub use poller::{PollerHandle, PricePoller};
