use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::ProbeError;
use crate::report::RawDnsAnswer;
use crate::wire;

/// Total time budget for one raw query, covering every receive retry.
pub const QUERY_BUDGET: Duration = Duration::from_secs(5);

const DNS_PORT: u16 = 53;

/// Ask `resolver` for the A record of `hostname` using the hand-built
/// wire format.
///
/// Returns the first answer of the first response that echoes our
/// transaction ID with the expected flags. Datagrams failing that
/// check are discarded and the receive is retried with whatever
/// remains of the five-second budget.
pub async fn query(
	resolver: Ipv4Addr,
	hostname: &str,
	search_domain: Option<&str>,
) -> Result<RawDnsAnswer, ProbeError> {
	exchange(
		SocketAddr::from((resolver, DNS_PORT)),
		hostname,
		search_domain,
		QUERY_BUDGET,
	).await
}

async fn exchange(
	resolver: SocketAddr,
	hostname: &str,
	search_domain: Option<&str>,
	budget: Duration,
) -> Result<RawDnsAnswer, ProbeError> {
	let txid: u16 = rand::random();
	let query_bytes = wire::build_query(txid, hostname, search_domain)?;

	// Dedicated socket per query
	let socket = UdpSocket::bind("0.0.0.0:0").await?;
	let start = Instant::now();
	socket.send_to(&query_bytes, resolver).await?;

	let mut buf = vec![0u8; 512];
	loop {
		let elapsed = start.elapsed();
		if elapsed >= budget {
			return Err(ProbeError::RawDnsTimeout(budget));
		}
		let remaining = budget - elapsed;

		match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
			Ok(Ok((len, src))) => {
				if !wire::response_matches(&buf[..len], txid) {
					debug!("discarding unmatched datagram from {}", src);
					continue;
				}
				let (record, value) = wire::parse_first_answer(&buf[..len])?;
				return Ok(RawDnsAnswer {
					record,
					value,
					round_trip: start.elapsed(),
				});
			}
			Ok(Err(e)) => return Err(e.into()),
			Err(_) => return Err(ProbeError::RawDnsTimeout(budget)),
		}
	}
}
