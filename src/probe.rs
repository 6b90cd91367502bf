use std::io;
use std::net::{IpAddr, Ipv4Addr};

use tokio::task;
use tracing::info;

use crate::error::ProbeError;
use crate::lookup;
use crate::ping;
use crate::query;
use crate::report::{HostProbeReport, ProbeTarget, RawDnsAnswer};
use crate::resolver;
use crate::trace;

/// Run every sub-probe against `target` and assemble one report.
///
/// The sub-probes run concurrently and fail independently: a probe
/// that cannot produce its field records the failure in that field
/// and leaves the others untouched.
pub async fn run(target: &ProbeTarget) -> HostProbeReport {
	info!("probing {}", target.hostname);

	let (ping, lookup, hops, (resolver, raw_dns)) = tokio::join!(
		ping::ping(&target.hostname, target.ping_timeout),
		lookup::timed_lookup(&target.hostname),
		hop_count(target),
		dns_fields(target),
	);

	let resolved_addr = match &ping {
		Ok(outcome) => Some(outcome.addr),
		Err(_) => match &lookup {
			Ok(outcome) => first_ipv4(&outcome.addrs),
			Err(_) => None,
		},
	};

	HostProbeReport {
		hostname: target.hostname.clone(),
		resolved_addr,
		ping,
		lookup,
		hops,
		resolver,
		raw_dns,
	}
}

/// Walk the route and count answered hops, unless the run was
/// configured without the hop probe.
async fn hop_count(target: &ProbeTarget) -> Option<Result<u32, ProbeError>> {
	if !target.compute_hops {
		return None;
	}
	let addr = match lookup::resolve_ipv4(&target.hostname).await {
		Ok(addr) => addr,
		Err(e) => return Some(Err(e)),
	};
	let counted = task::spawn_blocking(move || trace::trace(addr).count() as u32).await;
	match counted {
		Ok(count) => Some(Ok(count)),
		Err(e) => Some(Err(ProbeError::SocketError(io::Error::new(io::ErrorKind::Other, e)))),
	}
}

/// Discover the system resolver and run the raw DNS query through it,
/// producing both report fields.
///
/// An override only redirects the query; the resolver field always
/// reflects discovery. Without any usable resolver the query is not
/// attempted.
async fn dns_fields(
	target: &ProbeTarget,
) -> (Result<Ipv4Addr, ProbeError>, Result<RawDnsAnswer, ProbeError>) {
	let search = target.search_domain.as_deref();
	match resolver::discover() {
		Ok(servers) => {
			let first = servers[0];
			let query_at = target.resolver_override.unwrap_or(first);
			let answer = query::query(query_at, &target.hostname, search).await;
			(Ok(first), answer)
		}
		Err(e) => {
			let answer = match target.resolver_override {
				Some(addr) => query::query(addr, &target.hostname, search).await,
				None => Err(ProbeError::NoDnsServerConfigured),
			};
			(Err(e), answer)
		}
	}
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
	addrs.iter().find_map(|addr| match addr {
		IpAddr::V4(v4) => Some(*v4),
		IpAddr::V6(_) => None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_first_ipv4_skips_v6_entries() {
		let addrs = vec![
			IpAddr::V6("::1".parse().unwrap()),
			IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
			IpAddr::V4(Ipv4Addr::new(10, 1, 2, 4)),
		];
		assert_eq!(first_ipv4(&addrs), Some(Ipv4Addr::new(10, 1, 2, 3)));
		assert_eq!(first_ipv4(&[]), None);
	}

	#[tokio::test]
	async fn test_hop_probe_skipped_when_disabled() {
		let target = ProbeTarget::new("localhost");
		assert!(hop_count(&target).await.is_none());
	}

	#[tokio::test]
	async fn test_run_records_failures_per_field() {
		// An empty hostname fails name encoding and platform
		// resolution alike, so no probe touches the network
		let mut target = ProbeTarget::new("");
		target.compute_hops = true;
		let report = run(&target).await;
		assert_eq!(report.hostname, "");
		assert!(report.ping.is_err());
		assert!(report.lookup.is_err());
		// Resolution fails before any hop can be walked
		assert!(matches!(report.hops, Some(Err(_))));
		assert!(report.raw_dns.is_err());
		assert!(report.resolved_addr.is_none());
	}

	// Exchanges live DNS with the system resolver; run with --ignored
	#[tokio::test]
	#[ignore]
	async fn test_run_fills_every_field() {
		let target = ProbeTarget::new("localhost");
		let report = run(&target).await;
		assert_eq!(report.hostname, "localhost");
		// Hop probe disabled by default
		assert!(report.hops.is_none());
		// localhost always resolves through the platform resolver
		let lookup = report.lookup.expect("localhost must resolve");
		assert!(!lookup.addrs.is_empty());
	}
}
