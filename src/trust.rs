//! Trusted Network Set
//!
//! CIDR-range allowlist. Identifiers inside a trusted range are exempt from
//! every rate limit and suspicion check and can never be blocked.

use std::net::IpAddr;

use ipnet::IpNet;
use parking_lot::RwLock;

use crate::prelude::*;

/// Set of trusted CIDR ranges, extendable at runtime
pub struct TrustedNetworks {
	networks: RwLock<Vec<IpNet>>,
}

impl TrustedNetworks {
	pub fn new(networks: Vec<IpNet>) -> Self {
		Self { networks: RwLock::new(networks) }
	}

	/// Check whether an address falls inside any trusted range
	pub fn is_trusted(&self, addr: &IpAddr) -> bool {
		self.networks.read().iter().any(|net| net.contains(addr))
	}

	/// Add a trusted range at runtime (process-wide, not persisted)
	pub fn add(&self, net: IpNet) {
		info!("Trusted network added: {}", net);
		self.networks.write().push(net);
	}

	pub fn len(&self) -> usize {
		self.networks.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.networks.read().is_empty()
	}
}

/// Parse a textual address or CIDR range into a network.
///
/// Bare addresses are widened to host-length prefixes (/32 or /128).
/// Malformed input is an error, never a panic.
pub fn parse_network(addr: &str) -> FwResult<IpNet> {
	if let Ok(net) = addr.parse::<IpNet>() {
		return Ok(net);
	}
	match addr.parse::<IpAddr>() {
		Ok(ip) => Ok(IpNet::from(ip)),
		Err(_) => Err(Error::InvalidAddress(addr.to_string())),
	}
}


// vim: ts=4
