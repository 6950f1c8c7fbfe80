//! Suspicion Scorer
//!
//! Heuristic scoring of request path, user-agent and request frequency into
//! an additive suspicion score plus a set of flags. Deterministic and
//! stateless given its inputs; the rules are independent, so adding a
//! triggering condition never lowers the total.

use serde::Serialize;

use crate::config::AdmissionConfig;
use crate::window::WindowCounts;

/// Scores strictly above this mark a request suspicious (allowed but logged)
pub const SUSPICIOUS_SCORE: u32 = 10;
/// Scores strictly above this trigger an immediate block
pub const SEVERE_SCORE: u32 = 20;

const BOT_INDICATORS: [&str; 4] = ["bot", "crawler", "spider", "scraper"];
const MIN_USER_AGENT_LEN: usize = 10;

/// Result of scoring a single request
#[derive(Debug, Clone, Serialize)]
pub struct PatternAnalysis {
	pub score: u32,
	pub flags: Vec<String>,
	pub is_suspicious: bool,
}

impl PatternAnalysis {
	/// Severe enough to block immediately
	pub fn is_severe(&self) -> bool {
		self.score > SEVERE_SCORE
	}
}

/// Score a request against the configured heuristics.
///
/// `counts` is read-only context from the sliding window; this function
/// never mutates shared state.
pub fn analyze(
	path: &str,
	user_agent: &str,
	counts: &WindowCounts,
	config: &AdmissionConfig,
) -> PatternAnalysis {
	let mut score = 0;
	let mut flags = Vec::new();

	let path_lower = path.to_lowercase();
	for pattern in &config.suspicious_patterns {
		if path_lower.contains(&pattern.to_lowercase()) {
			score += 10;
			flags.push(format!("suspicious_path:{}", pattern));
		}
	}

	if user_agent.len() < MIN_USER_AGENT_LEN {
		score += 5;
		flags.push("suspicious_user_agent".to_string());
	}

	let ua_lower = user_agent.to_lowercase();
	if BOT_INDICATORS.iter().any(|indicator| ua_lower.contains(indicator)) {
		score += 3;
		flags.push("bot_detected".to_string());
	}

	if counts.last_minute > config.max_requests_per_minute {
		score += 15;
		flags.push("high_frequency".to_string());
	}

	PatternAnalysis { score, flags, is_suspicious: score > SUSPICIOUS_SCORE }
}


// vim: ts=4
