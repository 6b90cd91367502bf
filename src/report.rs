use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::ProbeError;

/// Default echo deadline when the caller does not supply one.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(500);

/// Immutable description of one probe run.
///
/// Built once before the run starts; the probes never mutate it.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
	pub hostname: String,
	/// Deadline for the reachability echo.
	pub ping_timeout: Duration,
	/// When false the hop-count probe is skipped entirely.
	pub compute_hops: bool,
	/// Optional suffix appended to the raw DNS query name.
	pub search_domain: Option<String>,
	/// Send the raw DNS query here instead of the discovered resolver.
	pub resolver_override: Option<Ipv4Addr>,
}

impl ProbeTarget {
	pub fn new(hostname: impl Into<String>) -> Self {
		Self {
			hostname: hostname.into(),
			ping_timeout: DEFAULT_PING_TIMEOUT,
			compute_hops: false,
			search_domain: None,
			resolver_override: None,
		}
	}
}

/// Outcome of the reachability echo.
///
/// An unanswered echo is not an error at this level: `success` is
/// false and `round_trip` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOutcome {
	pub success: bool,
	pub round_trip: Duration,
	/// Address the echo was sent to.
	pub addr: Ipv4Addr,
}

/// Outcome of one timed platform-resolver call.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
	pub latency: Duration,
	pub addrs: Vec<IpAddr>,
}

/// Answer record classes the raw DNS client distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
	A,
	Cname,
	Soa,
	Unknown(u16),
}

impl RecordKind {
	pub fn from_code(code: u16) -> Self {
		match code {
			1 => RecordKind::A,
			5 => RecordKind::Cname,
			6 => RecordKind::Soa,
			other => RecordKind::Unknown(other),
		}
	}

	pub fn label(&self) -> String {
		match self {
			RecordKind::A => "A".to_string(),
			RecordKind::Cname => "CNAME".to_string(),
			RecordKind::Soa => "SOA".to_string(),
			RecordKind::Unknown(code) => format!("TYPE{}", code),
		}
	}
}

/// First answer extracted from a validated raw DNS response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDnsAnswer {
	pub record: RecordKind,
	/// Dotted-quad address for A records; absent for other kinds.
	pub value: Option<String>,
	pub round_trip: Duration,
}

/// Per-field record of one completed probe run.
///
/// Each field carries its own `Result` so one failing sub-probe never
/// erases the others. `hops` is additionally `None` when the run was
/// configured without the hop-count probe.
#[derive(Debug)]
pub struct HostProbeReport {
	pub hostname: String,
	/// IPv4 address the ICMP probes targeted, when resolution succeeded.
	pub resolved_addr: Option<Ipv4Addr>,
	pub ping: Result<PingOutcome, ProbeError>,
	pub lookup: Result<LookupOutcome, ProbeError>,
	pub hops: Option<Result<u32, ProbeError>>,
	pub resolver: Result<Ipv4Addr, ProbeError>,
	pub raw_dns: Result<RawDnsAnswer, ProbeError>,
}

impl HostProbeReport {
	/// True only when the echo was sent and answered.
	pub fn ping_success(&self) -> bool {
		match &self.ping {
			Ok(outcome) => outcome.success,
			Err(_) => false,
		}
	}

	/// Measured hop count, zero when the probe was skipped or failed.
	pub fn hop_count(&self) -> u32 {
		match &self.hops {
			Some(Ok(count)) => *count,
			_ => 0,
		}
	}

	/// Resolver latency, zero when resolution failed.
	pub fn lookup_latency(&self) -> Duration {
		match &self.lookup {
			Ok(outcome) => outcome.latency,
			Err(_) => Duration::ZERO,
		}
	}
}
