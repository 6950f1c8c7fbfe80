//! Shared Block Store
//!
//! Capability trait for mirroring block state to an external expiring
//! key-value store in multi-process deployments. The store is strictly
//! best-effort: the admission service guards every call with a short
//! timeout and falls back to local-only state on failure.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::prelude::*;

/// Expiring key-value mirror of the block ledger, one entry per blocked
/// identifier, value = block reason, TTL = remaining block duration.
#[async_trait]
pub trait BlockStore: Send + Sync {
	async fn get(&self, ip: IpAddr) -> FwResult<Option<String>>;
	async fn put(&self, ip: IpAddr, reason: &str, ttl: Duration) -> FwResult<()>;
	async fn delete(&self, ip: IpAddr) -> FwResult<()>;
}

/// Local-only deployment: no shared state, every call is a no-op
pub struct NullBlockStore;

#[async_trait]
impl BlockStore for NullBlockStore {
	async fn get(&self, _ip: IpAddr) -> FwResult<Option<String>> {
		Ok(None)
	}

	async fn put(&self, _ip: IpAddr, _reason: &str, _ttl: Duration) -> FwResult<()> {
		Ok(())
	}

	async fn delete(&self, _ip: IpAddr) -> FwResult<()> {
		Ok(())
	}
}

/// In-memory store with real TTL semantics. Useful in tests and for
/// sharing block state between several service instances in one process.
#[derive(Default)]
pub struct MemoryBlockStore {
	entries: RwLock<HashMap<IpAddr, (String, Instant)>>,
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
	async fn get(&self, ip: IpAddr) -> FwResult<Option<String>> {
		let mut entries = self.entries.write();
		match entries.get(&ip) {
			Some((_, expires)) if Instant::now() >= *expires => {
				entries.remove(&ip);
				Ok(None)
			}
			Some((reason, _)) => Ok(Some(reason.clone())),
			None => Ok(None),
		}
	}

	async fn put(&self, ip: IpAddr, reason: &str, ttl: Duration) -> FwResult<()> {
		self.entries.write().insert(ip, (reason.to_string(), Instant::now() + ttl));
		Ok(())
	}

	async fn delete(&self, ip: IpAddr) -> FwResult<()> {
		self.entries.write().remove(&ip);
		Ok(())
	}
}


// vim: ts=4
