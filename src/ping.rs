use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::task;

use crate::error::ProbeError;
use crate::icmp::{self, EchoReply, EchoStatus};
use crate::lookup;
use crate::report::PingOutcome;

/// TTL for reachability echoes, high enough to cross any sane path.
const PING_TTL: u8 = 64;
/// Canonical 32-octet echo payload.
const PING_PAYLOAD: &[u8] = b"abcdefghijklmnopqrstuvwabcdefghi";

/// Check whether `hostname` answers an ICMP echo within `timeout`.
///
/// An unanswered echo is an outcome, not an error: `success` is false
/// and the round trip reads zero. Errors are reserved for resolution
/// and socket failures.
pub async fn ping(hostname: &str, timeout: Duration) -> Result<PingOutcome, ProbeError> {
	let addr = lookup::resolve_ipv4(hostname).await?;
	ping_addr(addr, timeout).await
}

/// Echo an already-resolved address.
pub async fn ping_addr(addr: Ipv4Addr, timeout: Duration) -> Result<PingOutcome, ProbeError> {
	let reply = task::spawn_blocking(move || {
		icmp::echo(addr, PING_TTL, timeout, PING_PAYLOAD)
	})
	.await
	.map_err(|e| ProbeError::SocketError(io::Error::new(io::ErrorKind::Other, e)))?;
	outcome_from(addr, reply)
}

fn outcome_from(
	addr: Ipv4Addr,
	reply: Result<EchoReply, ProbeError>,
) -> Result<PingOutcome, ProbeError> {
	match reply {
		Ok(reply) if reply.status == EchoStatus::Success => Ok(PingOutcome {
			success: true,
			round_trip: reply.round_trip,
			addr,
		}),
		// Expired in transit or refused: something answered, so the
		// round trip is still meaningful
		Ok(reply) => Ok(PingOutcome {
			success: false,
			round_trip: reply.round_trip,
			addr,
		}),
		// Nothing answered at all, so there is no round trip to report
		Err(ProbeError::PingTimeout(_)) => Ok(PingOutcome {
			success: false,
			round_trip: Duration::ZERO,
			addr,
		}),
		Err(e) => Err(e),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ADDR: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

	fn reply(status: EchoStatus) -> EchoReply {
		EchoReply {
			status,
			responder: ADDR,
			round_trip: Duration::from_millis(12),
		}
	}

	#[test]
	fn test_payload_is_32_octets() {
		assert_eq!(PING_PAYLOAD.len(), 32);
	}

	#[test]
	fn test_answered_echo_keeps_round_trip() {
		let outcome = outcome_from(ADDR, Ok(reply(EchoStatus::Success))).unwrap();
		assert!(outcome.success);
		assert_eq!(outcome.round_trip, Duration::from_millis(12));
		assert_eq!(outcome.addr, ADDR);
	}

	#[test]
	fn test_timeout_reads_as_unreachable_outcome() {
		let outcome =
			outcome_from(ADDR, Err(ProbeError::PingTimeout(Duration::from_millis(500))))
				.unwrap();
		assert!(!outcome.success);
		assert_eq!(outcome.round_trip, Duration::ZERO);
	}

	#[test]
	fn test_refused_delivery_keeps_reply_round_trip() {
		let outcome = outcome_from(ADDR, Ok(reply(EchoStatus::Unreachable))).unwrap();
		assert!(!outcome.success);
		assert_eq!(outcome.round_trip, Duration::from_millis(12));
	}

	#[test]
	fn test_socket_errors_propagate() {
		let denied = io::Error::new(io::ErrorKind::PermissionDenied, "raw socket");
		let result = outcome_from(ADDR, Err(ProbeError::SocketError(denied)));
		assert!(matches!(result, Err(ProbeError::SocketError(_))));
	}
}
