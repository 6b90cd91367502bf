use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{self as icmp_echo_request, EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::time_exceeded::TimeExceededPacket;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::{MutablePacket, Packet};
use pnet::util;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::trace;

use crate::error::ProbeError;

const ICMP_HEADER_LEN: usize = 8;
const RECV_BUFFER_LEN: usize = 2048;

/// What the network said about one echo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStatus {
	/// The target itself answered.
	Success,
	/// A router decremented the TTL to zero before delivery.
	TtlExpired,
	/// A router or the target refused delivery.
	Unreachable,
}

/// A reply correlated to the echo request that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
	pub status: EchoStatus,
	pub responder: Ipv4Addr,
	pub round_trip: Duration,
}

/// Send one ICMP echo request to `target` with the given TTL and wait
/// for a reply that correlates to it.
///
/// Correlation uses a per-call random identifier plus the TTL as the
/// sequence number: echo replies carry them directly, TTL-expired and
/// unreachable errors quote them inside the embedded original
/// datagram. Unrelated ICMP traffic is ignored and the receive is
/// retried with the remaining deadline. An unanswered deadline is
/// `PingTimeout`.
///
/// Requires a raw-socket-capable process (root or CAP_NET_RAW).
pub fn echo(
	target: Ipv4Addr,
	ttl: u8,
	timeout: Duration,
	payload: &[u8],
) -> Result<EchoReply, ProbeError> {
	let ident: u16 = rand::random();
	let seq = ttl as u16;

	let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
	socket.set_ttl(ttl as u32)?;

	let request = build_echo_request(ident, seq, payload)?;
	let dest = SockAddr::from(SocketAddr::new(IpAddr::V4(target), 0));

	let start = Instant::now();
	socket.send_to(&request, &dest)?;

	await_reply(start, timeout, ident, seq, |remaining| {
		// Sub-millisecond SO_RCVTIMEO rounds down to "block forever"
		socket.set_read_timeout(Some(remaining.max(Duration::from_millis(1))))?;
		let mut recv_buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_LEN];
		let (len, responder) = socket.recv_from(&mut recv_buf)?;
		let responder = match responder.as_socket() {
			Some(SocketAddr::V4(v4)) => *v4.ip(),
			_ => return Ok(None),
		};
		let bytes: &[u8] = unsafe {
			std::slice::from_raw_parts(recv_buf.as_ptr() as *const u8, len)
		};
		Ok(Some((bytes.to_vec(), responder)))
	})
}

/// Receive datagrams until one correlates with our request, the
/// deadline passes, or the receive step fails.
///
/// The step is handed the time still left on each attempt. `Ok(None)`
/// is a datagram from a non-IPv4 source; like unrelated ICMP traffic
/// it is skipped and the receive retried. `WouldBlock` and `TimedOut`
/// report an idle deadline.
fn await_reply<R>(
	start: Instant,
	timeout: Duration,
	ident: u16,
	seq: u16,
	mut recv: R,
) -> Result<EchoReply, ProbeError>
where
	R: FnMut(Duration) -> io::Result<Option<(Vec<u8>, Ipv4Addr)>>,
{
	loop {
		let elapsed = start.elapsed();
		if elapsed >= timeout {
			return Err(ProbeError::PingTimeout(timeout));
		}
		match recv(timeout - elapsed) {
			Ok(Some((bytes, responder))) => {
				let round_trip = start.elapsed();
				match classify(&bytes, ident, seq) {
					Some(status) => {
						return Ok(EchoReply { status, responder, round_trip });
					}
					None => {
						trace!("ignoring unrelated ICMP datagram from {}", responder);
						continue;
					}
				}
			}
			Ok(None) => continue,
			Err(e) if e.kind() == io::ErrorKind::WouldBlock
				|| e.kind() == io::ErrorKind::TimedOut =>
			{
				return Err(ProbeError::PingTimeout(timeout));
			}
			Err(e) => return Err(e.into()),
		}
	}
}

fn build_echo_request(ident: u16, seq: u16, payload: &[u8]) -> Result<Vec<u8>, ProbeError> {
	let mut buf = vec![0u8; ICMP_HEADER_LEN + payload.len()];
	let mut echo = MutableEchoRequestPacket::new(&mut buf)
		.ok_or_else(|| io::Error::new(io::ErrorKind::Other, "echo buffer too small"))?;
	echo.set_icmp_type(IcmpTypes::EchoRequest);
	echo.set_icmp_code(icmp_echo_request::IcmpCodes::NoCode);
	echo.set_identifier(ident);
	echo.set_sequence_number(seq);
	echo.payload_mut().copy_from_slice(payload);
	let checksum = util::checksum(echo.packet(), 1);
	echo.set_checksum(checksum);
	Ok(buf)
}

/// Decide whether a received datagram answers our echo request.
///
/// The buffer is a full IPv4 packet as delivered by a raw socket.
fn classify(bytes: &[u8], ident: u16, seq: u16) -> Option<EchoStatus> {
	let ipv4 = Ipv4Packet::new(bytes)?;
	let icmp = IcmpPacket::new(ipv4.payload())?;
	match icmp.get_icmp_type() {
		IcmpTypes::EchoReply => {
			let reply = EchoReplyPacket::new(icmp.packet())?;
			if reply.get_identifier() == ident && reply.get_sequence_number() == seq {
				Some(EchoStatus::Success)
			} else {
				None
			}
		}
		IcmpTypes::TimeExceeded => {
			let exceeded = TimeExceededPacket::new(icmp.packet())?;
			if embedded_echo_matches(exceeded.payload(), ident, seq) {
				Some(EchoStatus::TtlExpired)
			} else {
				None
			}
		}
		IcmpTypes::DestinationUnreachable => {
			let unreachable = DestinationUnreachablePacket::new(icmp.packet())?;
			if embedded_echo_matches(unreachable.payload(), ident, seq) {
				Some(EchoStatus::Unreachable)
			} else {
				None
			}
		}
		_ => None,
	}
}

/// ICMP errors quote the datagram that triggered them; match the
/// quoted echo request back to ours by identifier and sequence.
fn embedded_echo_matches(original: &[u8], ident: u16, seq: u16) -> bool {
	if let Some(inner) = Ipv4Packet::new(original) {
		if inner.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
			return false;
		}
		if let Some(echo) = EchoRequestPacket::new(inner.payload()) {
			return echo.get_icmp_type() == IcmpTypes::EchoRequest
				&& echo.get_identifier() == ident
				&& echo.get_sequence_number() == seq;
		}
	}
	false
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;

	/// IPv4 header + ICMP echo reply carrying the given identifier
	/// and sequence.
	fn echo_reply_bytes(ident: u16, seq: u16) -> Vec<u8> {
		let mut packet = vec![0u8; 28];
		// Version 4, IHL 5, total length 28, protocol ICMP
		packet[0] = 0x45;
		packet[2..4].copy_from_slice(&28u16.to_be_bytes());
		packet[9] = 1;
		// Echo reply, code 0
		packet[20] = 0;
		packet[24..26].copy_from_slice(&ident.to_be_bytes());
		packet[26..28].copy_from_slice(&seq.to_be_bytes());
		packet
	}

	/// IPv4 header + ICMP error quoting our original echo request.
	fn icmp_error_bytes(icmp_type: u8, ident: u16, seq: u16) -> Vec<u8> {
		// Outer IP (20) + ICMP error header (8) + quoted IP (20) +
		// quoted echo header (8)
		let mut packet = vec![0u8; 56];
		packet[0] = 0x45;
		packet[2..4].copy_from_slice(&56u16.to_be_bytes());
		packet[9] = 1;
		packet[20] = icmp_type;
		// Quoted original IP header
		packet[28] = 0x45;
		packet[30..32].copy_from_slice(&28u16.to_be_bytes());
		packet[37] = 1;
		// Quoted echo request
		packet[48] = 8;
		packet[52..54].copy_from_slice(&ident.to_be_bytes());
		packet[54..56].copy_from_slice(&seq.to_be_bytes());
		packet
	}

	#[test]
	fn test_build_echo_request_layout() {
		let payload = [0xAAu8; 32];
		let bytes = build_echo_request(0x1234, 7, &payload).unwrap();
		assert_eq!(bytes.len(), ICMP_HEADER_LEN + 32);
		// Echo request, code 0
		assert_eq!(bytes[0], 8);
		assert_eq!(bytes[1], 0);
		assert_eq!(&bytes[4..6], &0x1234u16.to_be_bytes());
		assert_eq!(&bytes[6..8], &7u16.to_be_bytes());
		assert_eq!(&bytes[8..], &payload);
		// Checksum must be filled in
		assert_ne!(&bytes[2..4], &[0, 0]);
	}

	#[test]
	fn test_classify_matching_echo_reply() {
		let bytes = echo_reply_bytes(0xBEEF, 64);
		assert_eq!(classify(&bytes, 0xBEEF, 64), Some(EchoStatus::Success));
	}

	#[test]
	fn test_classify_rejects_foreign_echo_reply() {
		let bytes = echo_reply_bytes(0xBEEF, 64);
		assert_eq!(classify(&bytes, 0xBEEF, 63), None);
		assert_eq!(classify(&bytes, 0xBEF0, 64), None);
	}

	#[test]
	fn test_classify_time_exceeded_by_quoted_echo() {
		let bytes = icmp_error_bytes(11, 0x0A0B, 3);
		assert_eq!(classify(&bytes, 0x0A0B, 3), Some(EchoStatus::TtlExpired));
		assert_eq!(classify(&bytes, 0x0A0B, 4), None);
	}

	#[test]
	fn test_classify_destination_unreachable_by_quoted_echo() {
		let bytes = icmp_error_bytes(3, 0x0A0B, 9);
		assert_eq!(classify(&bytes, 0x0A0B, 9), Some(EchoStatus::Unreachable));
		assert_eq!(classify(&bytes, 0x0B0B, 9), None);
	}

	#[test]
	fn test_classify_ignores_errors_quoting_foreign_traffic() {
		// Same shape but the quoted datagram is UDP, not our echo
		let mut bytes = icmp_error_bytes(11, 0x0A0B, 3);
		bytes[37] = 17;
		assert_eq!(classify(&bytes, 0x0A0B, 3), None);
	}

	#[test]
	fn test_classify_ignores_other_icmp_types() {
		// An echo request is somebody probing us, not a reply
		let mut bytes = echo_reply_bytes(0xBEEF, 64);
		bytes[20] = 8;
		assert_eq!(classify(&bytes, 0xBEEF, 64), None);
	}

	#[test]
	fn test_classify_rejects_truncated_packets() {
		assert_eq!(classify(&[], 1, 1), None);
		assert_eq!(classify(&[0x45, 0x00], 1, 1), None);
		let bytes = echo_reply_bytes(1, 1);
		assert_eq!(classify(&bytes[..22], 1, 1), None);
	}

	#[test]
	fn test_await_reply_returns_correlated_error() {
		let router = Ipv4Addr::new(10, 0, 0, 1);
		let steps: Vec<io::Result<Option<(Vec<u8>, Ipv4Addr)>>> = vec![
			Ok(None),
			Ok(Some((echo_reply_bytes(0x5555, 9), Ipv4Addr::new(192, 0, 2, 7)))),
			Ok(Some((icmp_error_bytes(11, 0x0A0B, 3), router))),
		];
		let mut steps = steps.into_iter();
		let reply = await_reply(
			Instant::now(),
			Duration::from_secs(1),
			0x0A0B,
			3,
			|_| steps.next().unwrap(),
		)
		.unwrap();
		assert_eq!(reply.status, EchoStatus::TtlExpired);
		assert_eq!(reply.responder, router);
	}

	#[test]
	fn test_await_reply_skips_unrelated_until_deadline() {
		let timeout = Duration::from_millis(40);
		let start = Instant::now();
		let mut attempts = 0;
		let result = await_reply(start, timeout, 0x0A0B, 3, |remaining| {
			attempts += 1;
			thread::sleep(remaining.min(Duration::from_millis(1)));
			Ok(Some((echo_reply_bytes(0x5555, 9), Ipv4Addr::new(192, 0, 2, 7))))
		});
		assert!(matches!(result, Err(ProbeError::PingTimeout(_))));
		assert!(attempts >= 2);
		// The last receive may begin just under the deadline but no
		// attempt starts after it
		assert!(start.elapsed() < timeout + Duration::from_millis(200));
	}

	#[test]
	fn test_await_reply_maps_idle_deadline_to_timeout() {
		let result = await_reply(
			Instant::now(),
			Duration::from_millis(50),
			1,
			1,
			|_| Err(io::Error::new(io::ErrorKind::WouldBlock, "timed out")),
		);
		assert!(matches!(result, Err(ProbeError::PingTimeout(_))));
	}

	#[test]
	fn test_await_reply_propagates_socket_errors() {
		let result = await_reply(
			Instant::now(),
			Duration::from_secs(1),
			1,
			1,
			|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "raw socket denied")),
		);
		assert!(matches!(result, Err(ProbeError::SocketError(_))));
	}
}
