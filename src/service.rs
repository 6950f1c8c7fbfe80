//! Admission Service
//!
//! The single entry point composing the block ledger, trust allowlist,
//! sliding-window counters and suspicion scorer into an allow/deny verdict.
//! Explicitly constructed and injectable; owns all of its state, so tests
//! and multi-instance deployments get isolation for free.

use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::AdmissionConfig;
use crate::ledger::{BlockEntry, BlockLedger};
use crate::prelude::*;
use crate::store::{BlockStore, NullBlockStore};
use crate::suspicion::{self, PatternAnalysis};
use crate::trust::{self, TrustedNetworks};
use crate::window::{self, RequestHistory, WindowCounts};

/// Machine-readable denial category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyCode {
	/// An active block entry exists for the identifier
	Blocked,
	/// A sliding-window limit was exceeded on this request
	RateLimitExceeded,
	/// The suspicion score crossed the severe threshold
	SuspiciousActivity,
}

impl DenyCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			DenyCode::Blocked => "blocked",
			DenyCode::RateLimitExceeded => "rate_limit_exceeded",
			DenyCode::SuspiciousActivity => "suspicious_activity",
		}
	}
}

/// Details attached to an allowed request
#[derive(Debug, Clone, Serialize)]
pub struct AllowDetail {
	/// `trusted_ip` or `ok`
	pub reason: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub counts: Option<WindowCounts>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub analysis: Option<PatternAnalysis>,
}

/// Details attached to a denied request
#[derive(Debug, Clone, Serialize)]
pub struct DenyDetail {
	pub code: DenyCode,
	/// Human-readable reason, e.g. `rate_limit: minute_limit`
	pub reason: String,
	/// Remaining block duration, when a block was created or consulted
	#[serde(skip)]
	pub retry_after: Option<Duration>,
}

/// Outcome of a single admission check
#[derive(Debug, Clone)]
pub enum Admission {
	Allowed(AllowDetail),
	Denied(DenyDetail),
}

impl Admission {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Admission::Allowed(_))
	}
}

/// Per-blocked-identifier stats record
#[derive(Debug, Clone, Serialize)]
pub struct BlockedDetail {
	pub ip: IpAddr,
	pub reason: String,
	pub blocked_since: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub escalation_level: u32,
}

/// Read-only snapshot of the admission state
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionStats {
	pub currently_blocked: usize,
	pub tracked_identifiers: usize,
	pub trusted_networks: usize,
	pub total_denied: u64,
	pub total_blocks: u64,
	pub blocked: Vec<BlockedDetail>,
}

/// Request admission service
pub struct AdmissionService {
	config: AdmissionConfig,
	trusted: TrustedNetworks,
	history: RwLock<LruCache<IpAddr, RequestHistory>>,
	ledger: BlockLedger,
	store: Arc<dyn BlockStore>,
	total_denied: AtomicU64,
	total_blocks: AtomicU64,
}

impl AdmissionService {
	/// Create a service with local-only state
	pub fn new(config: AdmissionConfig) -> Self {
		Self::with_store(config, Arc::new(NullBlockStore))
	}

	/// Create a service mirroring block state to a shared store
	pub fn with_store(config: AdmissionConfig, store: Arc<dyn BlockStore>) -> Self {
		const DEFAULT_CAP: NonZeroUsize = match NonZeroUsize::new(100_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		let cap = NonZeroUsize::new(config.max_tracked_ips).unwrap_or(DEFAULT_CAP);
		let trusted = TrustedNetworks::new(config.trusted_networks.clone());

		Self {
			config,
			trusted,
			history: RwLock::new(LruCache::new(cap)),
			ledger: BlockLedger::default(),
			store,
			total_denied: AtomicU64::new(0),
			total_blocks: AtomicU64::new(0),
		}
	}

	pub fn config(&self) -> &AdmissionConfig {
		&self.config
	}

	/// Check a request against the full admission pipeline
	pub async fn admit(&self, ip: IpAddr, path: &str, user_agent: &str) -> Admission {
		self.admit_at(ip, path, user_agent, Instant::now()).await
	}

	/// Admission check with an explicit clock, short-circuiting in order:
	/// block ledger, trust allowlist, rate limits, suspicion score.
	pub async fn admit_at(
		&self,
		ip: IpAddr,
		path: &str,
		user_agent: &str,
		now: Instant,
	) -> Admission {
		// 1. Active block?
		if let Some(reason) = self.ledger.check(&ip, now) {
			return self.deny(DenyDetail { code: DenyCode::Blocked, reason, retry_after: None });
		}
		if let Some(reason) = self.store_get(ip).await {
			return self.deny(DenyDetail { code: DenyCode::Blocked, reason, retry_after: None });
		}

		// 2. Trusted identifiers skip every check
		if self.trusted.is_trusted(&ip) {
			return Admission::Allowed(AllowDetail {
				reason: "trusted_ip",
				counts: None,
				analysis: None,
			});
		}

		// 3. Sliding-window limits
		let counts = {
			let mut history = self.history.write();
			history.get_or_insert_mut(ip, RequestHistory::default).record_and_count(
				now,
				self.config.burst_window,
				self.config.retention_window,
			)
		};

		let exceeded = window::exceeded_limits(&counts, &self.config);
		if !exceeded.is_empty() {
			let reason = format!("rate_limit: {}", exceeded.join(", "));
			let entry = self.block_at(ip, &reason, None, now).await;
			return self.deny(DenyDetail {
				code: DenyCode::RateLimitExceeded,
				reason,
				retry_after: entry.map(|e| e.remaining(now)),
			});
		}

		// 4. Suspicion heuristics
		let analysis = suspicion::analyze(path, user_agent, &counts, &self.config);
		if analysis.is_severe() {
			let reason = format!("suspicious_activity: {}", analysis.flags.join(", "));
			let entry = self.block_at(ip, &reason, None, now).await;
			return self.deny(DenyDetail {
				code: DenyCode::SuspiciousActivity,
				reason,
				retry_after: entry.map(|e| e.remaining(now)),
			});
		}
		if analysis.is_suspicious {
			warn!("Suspicious activity from {}: {:?}", ip, analysis.flags);
		}

		Admission::Allowed(AllowDetail {
			reason: "ok",
			counts: Some(counts),
			analysis: Some(analysis),
		})
	}

	fn deny(&self, detail: DenyDetail) -> Admission {
		self.total_denied.fetch_add(1, Ordering::Relaxed);
		Admission::Denied(detail)
	}

	/// Block an identifier, escalating if an entry already exists.
	///
	/// Trusted identifiers are never blocked: the call is a no-op with a
	/// warning, matching the allowlist invariant.
	pub async fn block(
		&self,
		ip: IpAddr,
		reason: &str,
		duration: Option<Duration>,
	) -> Option<BlockEntry> {
		self.block_at(ip, reason, duration, Instant::now()).await
	}

	/// Block with an explicit clock. Returns the ledger entry, or None when
	/// the identifier is trusted.
	pub async fn block_at(
		&self,
		ip: IpAddr,
		reason: &str,
		duration: Option<Duration>,
		now: Instant,
	) -> Option<BlockEntry> {
		if self.trusted.is_trusted(&ip) {
			warn!("Refusing to block trusted identifier: {}", ip);
			return None;
		}

		let entry = self.ledger.insert(
			ip,
			reason,
			duration.unwrap_or(self.config.block_duration),
			self.config.escalation_factor,
			now,
		);
		self.total_blocks.fetch_add(1, Ordering::Relaxed);
		warn!(
			"Blocked {} for {}s (level {}): {}",
			ip,
			entry.duration.as_secs(),
			entry.escalation_level,
			entry.reason
		);

		self.store_put(ip, &entry.reason, entry.remaining(now)).await;
		Some(entry)
	}

	/// Operator intervention: remove a block from the ledger and the
	/// shared store. Returns true if a local entry existed.
	pub async fn unblock(&self, ip: IpAddr) -> bool {
		let removed = self.ledger.remove(&ip);
		if removed {
			info!("Unblocked identifier: {}", ip);
		}
		self.store_delete(ip).await;
		removed
	}

	/// Add an address or CIDR range to the trusted set
	pub fn whitelist(&self, addr: &str) -> FwResult<()> {
		let net = trust::parse_network(addr)?;
		self.trusted.add(net);
		Ok(())
	}

	pub fn is_trusted(&self, ip: &IpAddr) -> bool {
		self.trusted.is_trusted(ip)
	}

	pub fn is_blocked(&self, ip: &IpAddr) -> bool {
		self.ledger.check(ip, Instant::now()).is_some()
	}

	/// Stats snapshot for the administrative surface. Expired blocks are
	/// pruned before reporting.
	pub fn stats(&self) -> AdmissionStats {
		self.stats_at(Instant::now())
	}

	pub fn stats_at(&self, now: Instant) -> AdmissionStats {
		self.ledger.prune_expired(now);

		let blocked = self
			.ledger
			.snapshot()
			.into_iter()
			.map(|(ip, entry)| BlockedDetail {
				ip,
				reason: entry.reason.clone(),
				blocked_since: entry.blocked_at_utc,
				expires_at: entry.expires_at_utc(),
				escalation_level: entry.escalation_level,
			})
			.collect::<Vec<_>>();

		AdmissionStats {
			currently_blocked: blocked.len(),
			tracked_identifiers: self.history.read().len(),
			trusted_networks: self.trusted.len(),
			total_denied: self.total_denied.load(Ordering::Relaxed),
			total_blocks: self.total_blocks.load(Ordering::Relaxed),
			blocked,
		}
	}

	// Shared-store access is best-effort: guarded by a short timeout,
	// failures degrade to local-only state and never fail the decision.

	async fn store_get(&self, ip: IpAddr) -> Option<String> {
		match tokio::time::timeout(self.config.store_timeout, self.store.get(ip)).await {
			Ok(Ok(reason)) => reason,
			Ok(Err(err)) => {
				warn!("Block store read failed for {}: {}", ip, err);
				None
			}
			Err(_) => {
				warn!("Block store read timed out for {}", ip);
				None
			}
		}
	}

	async fn store_put(&self, ip: IpAddr, reason: &str, ttl: Duration) {
		match tokio::time::timeout(self.config.store_timeout, self.store.put(ip, reason, ttl)).await
		{
			Ok(Ok(())) => {}
			Ok(Err(err)) => warn!("Block store write failed for {}: {}", ip, err),
			Err(_) => warn!("Block store write timed out for {}", ip),
		}
	}

	async fn store_delete(&self, ip: IpAddr) {
		match tokio::time::timeout(self.config.store_timeout, self.store.delete(ip)).await {
			Ok(Ok(())) => {}
			Ok(Err(err)) => warn!("Block store delete failed for {}: {}", ip, err),
			Err(_) => warn!("Block store delete timed out for {}", ip),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryBlockStore;

	const UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";

	fn ip(s: &str) -> IpAddr {
		s.parse().unwrap()
	}

	#[tokio::test]
	async fn test_clean_request_allowed() {
		let service = AdmissionService::new(AdmissionConfig::default());
		let verdict = service.admit(ip("203.0.113.30"), "/products", UA).await;
		assert!(verdict.is_allowed());
	}

	#[tokio::test]
	async fn test_trusted_never_blocked() {
		let service = AdmissionService::new(AdmissionConfig::default());
		let addr = ip("10.1.2.3");

		assert!(service.block(addr, "manual", None).await.is_none());
		assert!(!service.is_blocked(&addr));

		let verdict = service.admit(addr, "/wp-admin", "").await;
		match verdict {
			Admission::Allowed(detail) => assert_eq!(detail.reason, "trusted_ip"),
			Admission::Denied(detail) => panic!("trusted ip denied: {:?}", detail),
		}
	}

	#[tokio::test]
	async fn test_blocked_identifier_denied() {
		let service = AdmissionService::new(AdmissionConfig::default());
		let addr = ip("203.0.113.31");

		service.block(addr, "manual block", None).await;
		let verdict = service.admit(addr, "/", UA).await;
		match verdict {
			Admission::Denied(detail) => {
				assert_eq!(detail.code, DenyCode::Blocked);
				assert_eq!(detail.reason, "manual block");
			}
			Admission::Allowed(_) => panic!("blocked ip allowed"),
		}
	}

	#[tokio::test]
	async fn test_severe_suspicion_blocks() {
		let service = AdmissionService::new(AdmissionConfig::default());
		let addr = ip("203.0.113.32");

		// /wp-admin hits two patterns (+20) and the empty UA adds +5
		let verdict = service.admit(addr, "/wp-admin/", "").await;
		match verdict {
			Admission::Denied(detail) => {
				assert_eq!(detail.code, DenyCode::SuspiciousActivity);
				assert!(detail.reason.contains("suspicious_path:wp-admin"));
			}
			Admission::Allowed(_) => panic!("severe request allowed"),
		}
		assert!(service.is_blocked(&addr));
	}

	#[tokio::test]
	async fn test_merely_suspicious_allowed_with_analysis() {
		let service = AdmissionService::new(AdmissionConfig::default());

		// One pattern (+10) plus short UA (+5) = 15: suspicious, not severe
		let verdict = service.admit(ip("203.0.113.33"), "/wp-login.php", "").await;
		match verdict {
			Admission::Allowed(detail) => {
				let analysis = detail.analysis.unwrap();
				assert!(analysis.is_suspicious);
				assert!(!analysis.is_severe());
				assert_eq!(analysis.score, 15);
			}
			Admission::Denied(detail) => panic!("suspicious request denied: {:?}", detail),
		}
	}

	#[tokio::test]
	async fn test_store_mirrors_blocks() {
		let store = Arc::new(MemoryBlockStore::default());
		let service = AdmissionService::with_store(AdmissionConfig::default(), store.clone());
		let addr = ip("203.0.113.34");

		service.block(addr, "shared", None).await;
		assert_eq!(store.get(addr).await.unwrap().as_deref(), Some("shared"));

		service.unblock(addr).await;
		assert_eq!(store.get(addr).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_store_consulted_on_local_miss() {
		let store = Arc::new(MemoryBlockStore::default());
		let writer = AdmissionService::with_store(AdmissionConfig::default(), store.clone());
		let reader = AdmissionService::with_store(AdmissionConfig::default(), store);
		let addr = ip("203.0.113.35");

		writer.block(addr, "remote block", None).await;

		let verdict = reader.admit(addr, "/", UA).await;
		match verdict {
			Admission::Denied(detail) => {
				assert_eq!(detail.code, DenyCode::Blocked);
				assert_eq!(detail.reason, "remote block");
			}
			Admission::Allowed(_) => panic!("remotely blocked ip allowed"),
		}
	}

	#[tokio::test]
	async fn test_stats_snapshot() {
		let service = AdmissionService::new(AdmissionConfig::default());
		let addr = ip("203.0.113.36");

		let stats = service.stats();
		assert_eq!(stats.currently_blocked, 0);
		assert_eq!(stats.trusted_networks, 4);

		service.block(addr, "stats test", None).await;
		service.admit(ip("203.0.113.37"), "/", UA).await;

		let stats = service.stats();
		assert_eq!(stats.currently_blocked, 1);
		assert_eq!(stats.tracked_identifiers, 1);
		assert_eq!(stats.total_blocks, 1);
		assert_eq!(stats.blocked[0].ip, addr);
		assert_eq!(stats.blocked[0].escalation_level, 1);
		assert!(stats.blocked[0].expires_at > stats.blocked[0].blocked_since);
	}

	#[tokio::test]
	async fn test_whitelist_invalid_input() {
		let service = AdmissionService::new(AdmissionConfig::default());
		assert!(service.whitelist("not-an-address").is_err());
		assert!(service.whitelist("198.51.100.9").is_ok());
		assert!(service.is_trusted(&ip("198.51.100.9")));
	}
}

// vim: ts=4
