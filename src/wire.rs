use std::net::Ipv4Addr;

use crate::error::{ProbeError, WireError};
use crate::report::RecordKind;

/// DNS message header length in octets.
pub const HEADER_LEN: usize = 12;
/// Longest single label permitted by the wire format.
const MAX_LABEL_LEN: usize = 63;
/// Longest full query name permitted by the wire format.
const MAX_NAME_LEN: usize = 253;

const QTYPE_A: u16 = 1;
const QCLASS_IN: u16 = 1;

/// Serialize an A-record query for `hostname`, optionally suffixed
/// with a search domain.
///
/// The message is a standard header with only the recursion-desired
/// flag set and a single question, followed by the length-prefixed
/// label sequence of the query name and the A/IN trailer. The caller
/// supplies the transaction ID so it can later correlate the response.
pub fn build_query(
	txid: u16,
	hostname: &str,
	search_domain: Option<&str>,
) -> Result<Vec<u8>, ProbeError> {
	let mut qname = match search_domain {
		Some(suffix) if !suffix.is_empty() => format!("{}.{}", hostname, suffix),
		_ => hostname.to_string(),
	};
	// An absolute name spells the root as a trailing dot; drop it
	if qname.ends_with('.') {
		qname.pop();
	}
	if qname.is_empty() {
		return Err(ProbeError::InvalidQueryName("name is empty".to_string()));
	}
	if qname.len() > MAX_NAME_LEN {
		return Err(ProbeError::InvalidQueryName(format!(
			"name '{}' is {} octets, limit is {}",
			qname, qname.len(), MAX_NAME_LEN
		)));
	}

	let mut bytes = Vec::with_capacity(HEADER_LEN + qname.len() + 6);
	bytes.extend_from_slice(&txid.to_be_bytes());
	// Flags: recursion desired, everything else clear
	bytes.extend_from_slice(&[0x01, 0x00]);
	// QDCOUNT = 1, ANCOUNT/NSCOUNT/ARCOUNT = 0
	bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

	for label in qname.split('.') {
		if label.is_empty() {
			return Err(ProbeError::InvalidQueryName(format!(
				"name '{}' contains an empty label", qname
			)));
		}
		if label.len() > MAX_LABEL_LEN {
			return Err(ProbeError::InvalidQueryName(format!(
				"label '{}' is {} octets, limit is {}",
				label, label.len(), MAX_LABEL_LEN
			)));
		}
		if !label.is_ascii() {
			return Err(ProbeError::InvalidQueryName(format!(
				"label '{}' is not ASCII", label
			)));
		}
		bytes.push(label.len() as u8);
		bytes.extend_from_slice(label.as_bytes());
	}
	bytes.push(0x00);

	bytes.extend_from_slice(&QTYPE_A.to_be_bytes());
	bytes.extend_from_slice(&QCLASS_IN.to_be_bytes());
	Ok(bytes)
}

/// Check whether a datagram is the answer to our query.
///
/// Requires the echoed transaction ID and the exact flag bytes of a
/// successful recursive answer (0x81 0x80). Anything else is some
/// other datagram and the receive loop discards it.
pub fn response_matches(bytes: &[u8], txid: u16) -> bool {
	if bytes.len() < 4 {
		return false;
	}
	bytes[0..2] == txid.to_be_bytes() && bytes[2] == 0x81 && bytes[3] == 0x80
}

/// Bounds-checked reader over a response buffer.
struct Cursor<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	fn read_u8(&mut self) -> Result<u8, WireError> {
		let byte = *self.buf.get(self.pos).ok_or(WireError::Truncated(self.pos))?;
		self.pos += 1;
		Ok(byte)
	}

	fn read_u16(&mut self) -> Result<u16, WireError> {
		let hi = self.read_u8()?;
		let lo = self.read_u8()?;
		Ok(u16::from_be_bytes([hi, lo]))
	}

	fn skip(&mut self, n: usize) -> Result<(), WireError> {
		if self.pos + n > self.buf.len() {
			return Err(WireError::Truncated(self.buf.len()));
		}
		self.pos += n;
		Ok(())
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
		if self.pos + n > self.buf.len() {
			return Err(WireError::Truncated(self.buf.len()));
		}
		let slice = &self.buf[self.pos..self.pos + n];
		self.pos += n;
		Ok(slice)
	}

	/// Advance past one encoded name without decoding it.
	///
	/// A compression pointer ends the name in place, so it is skipped
	/// rather than followed.
	fn skip_name(&mut self) -> Result<(), WireError> {
		loop {
			let len = self.read_u8()?;
			if len == 0 {
				return Ok(());
			}
			if len & 0xC0 == 0xC0 {
				// Second pointer octet
				self.read_u8()?;
				return Ok(());
			}
			if len & 0xC0 != 0 {
				return Err(WireError::BadLabel(len));
			}
			self.skip(len as usize)?;
		}
	}
}

/// Decode the first answer record of a validated response.
///
/// Walks the header counts and the echoed question section, then
/// reads the leading answer. A records yield their dotted-quad
/// address; CNAME, SOA, and unrecognized types yield the kind alone.
pub fn parse_first_answer(bytes: &[u8]) -> Result<(RecordKind, Option<String>), WireError> {
	let mut cursor = Cursor::new(bytes);
	// Transaction ID and flags were validated before parsing
	cursor.skip(4)?;
	let qdcount = cursor.read_u16()?;
	let ancount = cursor.read_u16()?;
	// NSCOUNT and ARCOUNT
	cursor.skip(4)?;
	if ancount == 0 {
		return Err(WireError::NoAnswers);
	}

	for _ in 0..qdcount {
		cursor.skip_name()?;
		// QTYPE and QCLASS
		cursor.skip(4)?;
	}

	cursor.skip_name()?;
	let rtype = cursor.read_u16()?;
	// CLASS and TTL
	cursor.skip(6)?;
	let rdlength = cursor.read_u16()? as usize;

	let kind = RecordKind::from_code(rtype);
	if kind == RecordKind::A {
		if rdlength != 4 {
			return Err(WireError::BadAddressLength(rdlength));
		}
		let octets = cursor.take(4)?;
		let addr = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
		return Ok((kind, Some(addr.to_string())));
	}
	cursor.take(rdlength)?;
	Ok((kind, None))
}
