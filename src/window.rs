//! Sliding-Window Counters
//!
//! Per-identifier request timestamp log with lazy age-based pruning and
//! fixed look-back window counts. Pruning happens on every record so the
//! log stays bounded under sustained traffic.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::AdmissionConfig;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Request counts over the three fixed look-back windows
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WindowCounts {
	/// Requests in the last 60 seconds
	pub last_minute: u32,
	/// Requests in the last hour
	pub last_hour: u32,
	/// Requests in the burst window
	pub last_burst: u32,
}

/// Ordered timestamp log for a single identifier
#[derive(Debug, Default)]
pub struct RequestHistory {
	timestamps: VecDeque<Instant>,
}

impl RequestHistory {
	/// Append `now`, drop entries older than the retention window and
	/// return counts for all three look-back windows.
	pub fn record_and_count(
		&mut self,
		now: Instant,
		burst_window: Duration,
		retention: Duration,
	) -> WindowCounts {
		while let Some(&front) = self.timestamps.front() {
			if now.duration_since(front) >= retention {
				self.timestamps.pop_front();
			} else {
				break;
			}
		}
		self.timestamps.push_back(now);

		let mut counts = WindowCounts::default();
		for &t in self.timestamps.iter().rev() {
			let age = now.duration_since(t);
			if age >= HOUR {
				break;
			}
			counts.last_hour += 1;
			if age < MINUTE {
				counts.last_minute += 1;
			}
			if age < burst_window {
				counts.last_burst += 1;
			}
		}
		counts
	}

	pub fn len(&self) -> usize {
		self.timestamps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.timestamps.is_empty()
	}
}

/// Names of the limits exceeded by the given counts, empty when compliant.
///
/// All three thresholds are evaluated independently with a strict compare,
/// so the (threshold+1)-th request is the first one over the line.
pub fn exceeded_limits(counts: &WindowCounts, config: &AdmissionConfig) -> Vec<&'static str> {
	let mut exceeded = Vec::new();
	if counts.last_minute > config.max_requests_per_minute {
		exceeded.push("minute_limit");
	}
	if counts.last_hour > config.max_requests_per_hour {
		exceeded.push("hour_limit");
	}
	if counts.last_burst > config.burst_threshold {
		exceeded.push("burst_limit");
	}
	exceeded
}

#[cfg(test)]
mod tests {
	use super::*;

	const BURST: Duration = Duration::from_secs(5);
	const RETENTION: Duration = Duration::from_secs(3600);

	#[test]
	fn test_counts_per_window() {
		let mut history = RequestHistory::default();
		let base = Instant::now();

		// One request an hour ago minus a bit, one 30s ago, one now
		history.record_and_count(base, BURST, RETENTION);
		history.record_and_count(base + Duration::from_secs(3570), BURST, RETENTION);
		let counts =
			history.record_and_count(base + Duration::from_secs(3599), BURST, RETENTION);

		assert_eq!(counts.last_hour, 3);
		assert_eq!(counts.last_minute, 2);
		assert_eq!(counts.last_burst, 1);
	}

	#[test]
	fn test_pruning_bounds_history() {
		let mut history = RequestHistory::default();
		let base = Instant::now();

		for i in 0..100 {
			history.record_and_count(base + Duration::from_secs(i), BURST, RETENTION);
		}
		assert_eq!(history.len(), 100);

		// Two hours later everything older than retention is gone
		let counts = history.record_and_count(base + Duration::from_secs(7200), BURST, RETENTION);
		assert_eq!(history.len(), 1);
		assert_eq!(counts.last_hour, 1);
	}

	#[test]
	fn test_burst_window_count() {
		let mut history = RequestHistory::default();
		let base = Instant::now();

		let mut counts = WindowCounts::default();
		for i in 0..12 {
			counts = history.record_and_count(base + Duration::from_millis(i * 100), BURST, RETENTION);
		}
		assert_eq!(counts.last_burst, 12);
		assert_eq!(counts.last_minute, 12);
	}

	#[test]
	fn test_exceeded_limits_independent() {
		let config = AdmissionConfig::default();

		let compliant = WindowCounts { last_minute: 60, last_hour: 1000, last_burst: 10 };
		assert!(exceeded_limits(&compliant, &config).is_empty());

		let over_minute = WindowCounts { last_minute: 61, last_hour: 61, last_burst: 2 };
		assert_eq!(exceeded_limits(&over_minute, &config), vec!["minute_limit"]);

		let over_burst = WindowCounts { last_minute: 11, last_hour: 11, last_burst: 11 };
		assert_eq!(exceeded_limits(&over_burst, &config), vec!["burst_limit"]);

		let over_all = WindowCounts { last_minute: 2000, last_hour: 2000, last_burst: 2000 };
		assert_eq!(
			exceeded_limits(&over_all, &config),
			vec!["minute_limit", "hour_limit", "burst_limit"]
		);
	}
}

// vim: ts=4
