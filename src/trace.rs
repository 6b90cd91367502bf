use std::net::Ipv4Addr;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::ProbeError;
use crate::icmp::{self, EchoReply, EchoStatus};

/// Deepest TTL the walk will step to.
pub const MAX_TTL: u8 = 30;
/// Per-hop reply deadline.
pub const HOP_TIMEOUT: Duration = Duration::from_secs(10);

const TRACE_PAYLOAD_LEN: usize = 32;

/// Lazily walk the route to `target`, yielding one responder per
/// answered TTL.
///
/// Each `next()` performs exactly one echo exchange: a TTL-expired
/// answer yields the router and continues, an answer from the target
/// yields it and ends the walk, anything else (timeout, refusal,
/// socket failure) ends the walk without yielding. An abandoned
/// iterator sends nothing further.
pub fn trace(target: Ipv4Addr) -> impl Iterator<Item = Ipv4Addr> {
	let mut payload = [0u8; TRACE_PAYLOAD_LEN];
	rand::thread_rng().fill(&mut payload[..]);
	TraceRoute {
		send: move |ttl| icmp::echo(target, ttl, HOP_TIMEOUT, &payload),
		next_ttl: 1,
		done: false,
	}
}

/// TTL-stepping iterator over an injected probe function.
struct TraceRoute<F> {
	send: F,
	next_ttl: u8,
	done: bool,
}

impl<F> Iterator for TraceRoute<F>
where
	F: FnMut(u8) -> Result<EchoReply, ProbeError>,
{
	type Item = Ipv4Addr;

	fn next(&mut self) -> Option<Ipv4Addr> {
		if self.done || self.next_ttl > MAX_TTL {
			return None;
		}
		let ttl = self.next_ttl;
		self.next_ttl += 1;

		match (self.send)(ttl) {
			Ok(reply) if reply.status == EchoStatus::TtlExpired => {
				debug!("hop {} answered by {}", ttl, reply.responder);
				Some(reply.responder)
			}
			Ok(reply) if reply.status == EchoStatus::Success => {
				debug!("target reached at hop {}", ttl);
				self.done = true;
				Some(reply.responder)
			}
			Ok(_) | Err(_) => {
				debug!("walk ended at hop {} without an answer", ttl);
				self.done = true;
				None
			}
		}
	}
}
