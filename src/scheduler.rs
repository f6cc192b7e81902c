//! Aligned, drift-free tick scheduling.
//!
//! Ticks land on wall-clock multiples of the interval since the Unix epoch.
//! Each tick runs probe, store, forward, window update and render in order.

mod clock;
mod runner;

pub use clock::{Clock, ManualClock, SystemClock, next_tick};
pub use runner::{RunSummary, STORE_RETRY_BACKOFF, Scheduler, TickReport};
