//! Network diagnostics for a single host: ICMP reachability, hop
//! counting, resolver timing, local resolver discovery, and a raw
//! wire-format DNS client, composed into one per-field report.

pub mod cli;
pub mod error;
pub mod icmp;
pub mod lookup;
pub mod output;
pub mod ping;
pub mod probe;
pub mod query;
pub mod report;
pub mod resolver;
pub mod trace;
pub mod wire;

pub use error::{ProbeError, WireError};
pub use report::{HostProbeReport, ProbeTarget};
