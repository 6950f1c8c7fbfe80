//! Client Identifier Extraction
//!
//! Resolves the client IP behind a reverse proxy: forwarded-for chain
//! first (first hop is the original client), then real-ip, then the raw
//! connection address. Unparsable values are skipped, falling through to
//! the next source.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use hyper::Request;

/// Extract the client IP for a request
pub fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	from_forwarded_for(req)
		.or_else(|| from_real_ip(req))
		.or_else(|| req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip()))
}

/// X-Forwarded-For can contain multiple IPs: "client, proxy1, proxy2".
/// The first (leftmost) entry is the original client.
fn from_forwarded_for<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.split(',').next())
		.and_then(|ip| ip.trim().parse().ok())
}

fn from_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}


// vim: ts=4
