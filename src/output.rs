use std::time::Duration;

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};

use crate::report::{HostProbeReport, ProbeTarget};

/// Print a summary of the probe configuration before running.
pub fn print_target_summary(target: &ProbeTarget) {
	println!("Host Probe Configuration");
	println!("========================");
	println!("Host:           {}", target.hostname);
	println!("Ping timeout:   {} ms", target.ping_timeout.as_millis());
	let hops_label = if target.compute_hops { "yes" } else { "no" };
	println!("Count hops:     {}", hops_label);
	if let Some(domain) = &target.search_domain {
		println!("Search domain:  {}", domain);
	}
	if let Some(resolver) = target.resolver_override {
		println!("Resolver:       {}", resolver);
	}
	println!();
}

/// Print the probe report as a formatted table.
pub fn print_report(report: &HostProbeReport) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Probe", "Result"]);

	let address = match report.resolved_addr {
		Some(addr) => addr.to_string(),
		None => "-".to_string(),
	};
	table.add_row(vec!["Address".to_string(), address]);

	let ping_cell = match &report.ping {
		Ok(outcome) if outcome.success => {
			format!("reachable, {:.1} ms", ms(outcome.round_trip))
		}
		Ok(outcome) if outcome.round_trip > Duration::ZERO => {
			format!("unreachable, {:.1} ms", ms(outcome.round_trip))
		}
		Ok(_) => "no reply".to_string(),
		Err(e) => format!("error: {}", e),
	};
	table.add_row(vec!["Ping".to_string(), ping_cell]);

	let lookup_cell = match &report.lookup {
		Ok(outcome) => format!(
			"{:.1} ms, {} address(es)",
			ms(outcome.latency),
			outcome.addrs.len()
		),
		Err(e) => format!("error: {}", e),
	};
	table.add_row(vec!["Name lookup".to_string(), lookup_cell]);

	if let Some(hops) = &report.hops {
		let hops_cell = match hops {
			Ok(count) => count.to_string(),
			Err(e) => format!("error: {}", e),
		};
		table.add_row(vec!["Hops".to_string(), hops_cell]);
	}

	let resolver_cell = match &report.resolver {
		Ok(addr) => addr.to_string(),
		Err(e) => format!("error: {}", e),
	};
	table.add_row(vec!["Local resolver".to_string(), resolver_cell]);

	let dns_cell = match &report.raw_dns {
		Ok(answer) => match &answer.value {
			Some(value) => format!(
				"{} {} ({:.1} ms)",
				answer.record.label(), value, ms(answer.round_trip)
			),
			None => format!("{} ({:.1} ms)", answer.record.label(), ms(answer.round_trip)),
		},
		Err(e) => format!("error: {}", e),
	};
	table.add_row(vec!["Raw DNS".to_string(), dns_cell]);

	println!("\nProbe Report: {}", report.hostname);
	println!("{table}");
}

fn ms(duration: Duration) -> f64 {
	duration.as_secs_f64() * 1000.0
}
