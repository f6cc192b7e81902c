//! Measurement source.
//!
//! - [`Probe`]: one latency measurement against a configured host
//! - [`IcmpProbe`]: ICMP echo probe with a bounded timeout

mod icmp;
mod traits;

pub use icmp::{DEFAULT_TIMEOUT, IcmpProbe};
pub use traits::{Probe, ProbeError};
