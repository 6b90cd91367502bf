use std::net::{IpAddr, Ipv4Addr};
use std::time::Instant;

use tokio::net::lookup_host;

use crate::error::ProbeError;
use crate::report::LookupOutcome;

/// Time one resolution of `hostname` through the platform resolver.
///
/// The latency covers the full resolver call. A failed call carries
/// no meaningful latency and maps to `DnsResolutionFailed` instead.
pub async fn timed_lookup(hostname: &str) -> Result<LookupOutcome, ProbeError> {
	let start = Instant::now();
	let addrs: Vec<IpAddr> = lookup_host((hostname, 0))
		.await
		.map_err(|e| ProbeError::DnsResolutionFailed {
			host: hostname.to_string(),
			reason: e.to_string(),
		})?
		.map(|addr| addr.ip())
		.collect();
	let latency = start.elapsed();

	if addrs.is_empty() {
		return Err(ProbeError::DnsResolutionFailed {
			host: hostname.to_string(),
			reason: "resolver returned no addresses".to_string(),
		});
	}
	Ok(LookupOutcome { latency, addrs })
}

/// Resolve `hostname` to the first IPv4 address the platform resolver
/// returns. The ICMP probes are IPv4-only and share this path.
pub async fn resolve_ipv4(hostname: &str) -> Result<Ipv4Addr, ProbeError> {
	let addrs = lookup_host((hostname, 0))
		.await
		.map_err(|e| ProbeError::DnsResolutionFailed {
			host: hostname.to_string(),
			reason: e.to_string(),
		})?;
	for addr in addrs {
		if let IpAddr::V4(v4) = addr.ip() {
			return Ok(v4);
		}
	}
	Err(ProbeError::DnsResolutionFailed {
		host: hostname.to_string(),
		reason: "no IPv4 addresses".to_string(),
	})
}
