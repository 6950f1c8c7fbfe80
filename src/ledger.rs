//! Block Ledger
//!
//! Per-identifier block state with lazy expiry and escalating duration on
//! repeat offense. Entries live in memory; the admission service mirrors
//! them to the shared block store separately.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A single block record
#[derive(Debug, Clone)]
pub struct BlockEntry {
	/// When the block was created (monotonic, drives expiry)
	pub blocked_at: Instant,
	/// Wall-clock creation time, for reporting
	pub blocked_at_utc: DateTime<Utc>,
	/// How long the block lasts
	pub duration: Duration,
	/// Why the identifier was blocked
	pub reason: String,
	/// 1 on first offense, incremented on every re-block
	pub escalation_level: u32,
}

impl BlockEntry {
	pub fn is_expired(&self, now: Instant) -> bool {
		now.duration_since(self.blocked_at) >= self.duration
	}

	/// Remaining block duration as seen at `now`
	pub fn remaining(&self, now: Instant) -> Duration {
		self.duration.saturating_sub(now.duration_since(self.blocked_at))
	}

	/// Wall-clock expiry time, for reporting
	pub fn expires_at_utc(&self) -> DateTime<Utc> {
		self.blocked_at_utc + self.duration
	}
}

/// In-memory block ledger keyed by identifier
#[derive(Default)]
pub struct BlockLedger {
	entries: RwLock<HashMap<IpAddr, BlockEntry>>,
}

impl BlockLedger {
	/// Insert or escalate a block.
	///
	/// If an entry already exists (live or just recorded), the new duration
	/// is the previous duration multiplied by the escalation factor and the
	/// escalation level increments; the remaining duration never shrinks.
	pub fn insert(
		&self,
		ip: IpAddr,
		reason: &str,
		duration: Duration,
		escalation_factor: u32,
		now: Instant,
	) -> BlockEntry {
		let mut entries = self.entries.write();

		let entry = match entries.get(&ip) {
			Some(prev) => BlockEntry {
				blocked_at: now,
				blocked_at_utc: Utc::now(),
				duration: prev.duration * escalation_factor,
				reason: format!("{} (escalation)", reason),
				escalation_level: prev.escalation_level + 1,
			},
			None => BlockEntry {
				blocked_at: now,
				blocked_at_utc: Utc::now(),
				duration,
				reason: reason.to_string(),
				escalation_level: 1,
			},
		};

		entries.insert(ip, entry.clone());
		entry
	}

	/// Return the block reason if the identifier is actively blocked,
	/// lazily removing the entry once it has expired.
	pub fn check(&self, ip: &IpAddr, now: Instant) -> Option<String> {
		let mut entries = self.entries.write();
		match entries.get(ip) {
			Some(entry) if entry.is_expired(now) => {
				entries.remove(ip);
				None
			}
			Some(entry) => Some(entry.reason.clone()),
			None => None,
		}
	}

	/// Remove an entry regardless of expiry. Returns true if one existed.
	pub fn remove(&self, ip: &IpAddr) -> bool {
		self.entries.write().remove(ip).is_some()
	}

	/// Drop every expired entry
	pub fn prune_expired(&self, now: Instant) {
		self.entries.write().retain(|_, entry| !entry.is_expired(now));
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Snapshot of all entries, for the stats surface
	pub fn snapshot(&self) -> Vec<(IpAddr, BlockEntry)> {
		self.entries.read().iter().map(|(ip, entry)| (*ip, entry.clone())).collect()
	}
}


// vim: ts=4
