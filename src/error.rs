use std::time::Duration;

use thiserror::Error;

/// Structural failures while decoding a raw DNS response.
///
/// These only arise after a datagram has passed transaction-ID and
/// flag validation: the resolver answered us, but the payload does
/// not decode as a well-formed message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
	#[error("response truncated at offset {0}")]
	Truncated(usize),
	#[error("label octet {0:#04x} uses reserved bits")]
	BadLabel(u8),
	#[error("answer count is zero")]
	NoAnswers,
	#[error("A record carries {0} rdata octets instead of 4")]
	BadAddressLength(usize),
}

/// Every way a probe field can fail.
///
/// The orchestrator records one of these per report field rather than
/// aborting the run, so a single `HostProbeReport` can mix successes
/// and failures.
#[derive(Debug, Error)]
pub enum ProbeError {
	/// No network interface reports an up/running state.
	#[error("no active network interface found")]
	NoActiveInterface,

	/// Interfaces are up but no IPv4 nameserver is configured.
	#[error("no DNS server configured on any active interface")]
	NoDnsServerConfigured,

	/// An ICMP echo went unanswered within its deadline.
	#[error("ping timed out after {0:?}")]
	PingTimeout(Duration),

	/// The platform resolver could not resolve the hostname.
	#[error("failed to resolve '{host}': {reason}")]
	DnsResolutionFailed { host: String, reason: String },

	/// The raw DNS exchange produced no validated response in time.
	#[error("no matching DNS response within {0:?}")]
	RawDnsTimeout(Duration),

	/// A validated response failed structural decoding.
	#[error("malformed DNS response: {0}")]
	RawDnsMalformedResponse(#[from] WireError),

	/// The query name cannot be encoded (empty, oversize, bad label).
	#[error("invalid query name: {0}")]
	InvalidQueryName(String),

	/// Socket creation, send, or receive failed at the OS level.
	#[error("socket error: {0}")]
	SocketError(#[from] std::io::Error),
}
