use std::net::Ipv4Addr;

use pnet::datalink;
use tracing::debug;

use crate::error::ProbeError;

const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Find the DNS servers the system is configured to use.
///
/// Fails with `NoActiveInterface` when no interface reports an up
/// state (loopback included), and with `NoDnsServerConfigured` when
/// interfaces are up but no IPv4 nameserver can be read. The list
/// keeps configuration order and duplicates. State is read fresh on
/// every call.
pub fn discover() -> Result<Vec<Ipv4Addr>, ProbeError> {
	// An unreadable resolv.conf and an empty one look the same:
	// nothing is configured
	let content = std::fs::read_to_string(RESOLV_CONF).unwrap_or_default();
	discover_from(active_interface_count(), &content)
}

fn discover_from(up_interfaces: usize, resolv_conf: &str) -> Result<Vec<Ipv4Addr>, ProbeError> {
	if up_interfaces == 0 {
		return Err(ProbeError::NoActiveInterface);
	}
	debug!("{} interface(s) up", up_interfaces);

	let servers = parse_nameservers(resolv_conf);
	if servers.is_empty() {
		return Err(ProbeError::NoDnsServerConfigured);
	}
	Ok(servers)
}

fn active_interface_count() -> usize {
	datalink::interfaces().iter().filter(|iface| iface.is_up()).count()
}

/// Collect IPv4 nameserver entries from resolv.conf content.
fn parse_nameservers(content: &str) -> Vec<Ipv4Addr> {
	let mut servers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if !trimmed.starts_with("nameserver") {
			continue;
		}
		let parts: Vec<&str> = trimmed.split_whitespace().collect();
		if parts.len() >= 2 && parts[0] == "nameserver" {
			if let Ok(addr) = parts[1].parse::<Ipv4Addr>() {
				servers.push(addr);
			}
		}
	}
	servers
}
