use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostprobe::cli::Cli;
use hostprobe::report::ProbeTarget;
use hostprobe::{output, probe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let cli = Cli::parse();
	if cli.timeout == 0 {
		return Err(anyhow!("ping timeout must be at least 1 ms"));
	}

	let target = ProbeTarget {
		hostname: cli.host,
		ping_timeout: Duration::from_millis(cli.timeout),
		compute_hops: cli.hops,
		search_domain: cli.search_domain,
		resolver_override: cli.resolver,
	};

	output::print_target_summary(&target);

	let report = probe::run(&target).await;
	output::print_report(&report);

	Ok(())
}
