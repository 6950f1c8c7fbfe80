//! Admission Configuration
//!
//! Configuration struct for the admission service: rate limit thresholds,
//! block durations, suspicious path patterns and the trusted network set.

use std::time::Duration;

use ipnet::IpNet;

/// Main admission configuration
#[derive(Clone, Debug)]
pub struct AdmissionConfig {
	/// Maximum requests per identifier in any 60 second window
	pub max_requests_per_minute: u32,
	/// Maximum requests per identifier in any 1 hour window
	pub max_requests_per_hour: u32,
	/// Maximum requests per identifier in the burst window
	pub burst_threshold: u32,
	/// Length of the burst window
	pub burst_window: Duration,
	/// How long request timestamps are retained
	pub retention_window: Duration,
	/// Default block duration on a first offense
	pub block_duration: Duration,
	/// Multiplier applied to the block duration on repeat offense
	pub escalation_factor: u32,
	/// Path substrings that raise the suspicion score
	pub suspicious_patterns: Vec<String>,
	/// CIDR ranges exempt from all checks
	pub trusted_networks: Vec<IpNet>,
	/// Maximum number of identifiers to track (memory limit)
	pub max_tracked_ips: usize,
	/// Timeout for shared block store operations
	pub store_timeout: Duration,
	/// Paths the middleware lets through without any check
	pub skip_paths: Vec<String>,
}

impl Default for AdmissionConfig {
	fn default() -> Self {
		Self {
			max_requests_per_minute: 60,
			max_requests_per_hour: 1000,
			burst_threshold: 10,
			burst_window: Duration::from_secs(5),
			retention_window: Duration::from_secs(3600),
			block_duration: Duration::from_secs(3600),
			escalation_factor: 2,
			suspicious_patterns: [
				"admin",
				"wp-admin",
				".env",
				"config",
				"phpmyadmin",
				"xmlrpc.php",
				"wp-login",
			]
			.iter()
			.map(|s| (*s).to_string())
			.collect(),
			trusted_networks: default_trusted_networks(),
			max_tracked_ips: 100_000,
			store_timeout: Duration::from_millis(250),
			skip_paths: vec![
				"/health".to_string(),
				"/metrics".to_string(),
				"/api/admin/admission/stats".to_string(),
			],
		}
	}
}

/// Loopback plus the three private-use ranges
pub fn default_trusted_networks() -> Vec<IpNet> {
	["127.0.0.1/32", "10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
		.iter()
		.filter_map(|s| s.parse().ok())
		.collect()
}


// vim: ts=4
