use std::net::Ipv4Addr;

use clap::Parser;

/// Host network diagnostics tool
#[derive(Parser, Debug)]
#[command(name = "hostprobe")]
#[command(about = "Probe a host's reachability, hop count, and DNS behavior")]
pub struct Cli {
	/// Hostname or IPv4 address to probe
	pub host: String,

	/// Ping timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "500")]
	pub timeout: u64,

	/// Also count router hops to the host (slow on filtered paths)
	#[arg(long = "hops")]
	pub hops: bool,

	/// Search domain appended to the raw DNS query name
	#[arg(short = 'd', long = "search-domain")]
	pub search_domain: Option<String>,

	/// Send the raw DNS query to this resolver instead of the system one
	#[arg(short = 'r', long = "resolver")]
	pub resolver: Option<Ipv4Addr>,
}
