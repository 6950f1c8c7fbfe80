//! Administrative Surface
//!
//! Read-only stats plus operator mutations (whitelist, unblock), exposed
//! as an axum router the host application can mount under its admin scope.

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::service::{AdmissionService, AdmissionStats};

/// Request body for whitelist/unblock mutations
#[derive(Debug, Clone, Deserialize)]
pub struct IpRequest {
	/// Textual IP address (CIDR accepted for whitelist)
	pub ip: String,
}

/// Response body for mutations
#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse {
	pub success: bool,
	pub message: String,
}

/// Build the admin router: GET /stats, POST /whitelist, POST /unblock
pub fn router(service: Arc<AdmissionService>) -> Router {
	Router::new()
		.route("/stats", get(stats))
		.route("/whitelist", post(whitelist))
		.route("/unblock", post(unblock))
		.with_state(service)
}

/// GET /stats - Current admission state snapshot
async fn stats(State(service): State<Arc<AdmissionService>>) -> Json<AdmissionStats> {
	Json(service.stats())
}

/// POST /whitelist - Add an address or range to the trusted set
async fn whitelist(
	State(service): State<Arc<AdmissionService>>,
	Json(request): Json<IpRequest>,
) -> FwResult<Json<MutationResponse>> {
	service.whitelist(&request.ip)?;
	info!("Identifier whitelisted by operator: {}", request.ip);
	Ok(Json(MutationResponse {
		success: true,
		message: format!("{} added to trusted networks", request.ip),
	}))
}

/// POST /unblock - Remove a block by operator intervention
async fn unblock(
	State(service): State<Arc<AdmissionService>>,
	Json(request): Json<IpRequest>,
) -> FwResult<Json<MutationResponse>> {
	let ip: IpAddr =
		request.ip.parse().map_err(|_| Error::InvalidAddress(request.ip.clone()))?;
	let removed = service.unblock(ip).await;
	Ok(Json(MutationResponse {
		success: removed,
		message: if removed {
			format!("{} unblocked", ip)
		} else {
			format!("{} was not blocked", ip)
		},
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::AdmissionConfig;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use http_body_util::BodyExt;
	use tower::ServiceExt;

	fn service() -> Arc<AdmissionService> {
		Arc::new(AdmissionService::new(AdmissionConfig::default()))
	}

	async fn body_json(response: axum::response::Response) -> serde_json::Value {
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_stats_endpoint() {
		let service = service();
		service.block("203.0.113.40".parse().unwrap(), "test block", None).await;

		let response = router(service)
			.oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);

		let body = body_json(response).await;
		assert_eq!(body["currently_blocked"], 1);
		assert_eq!(body["blocked"][0]["reason"], "test block");
		assert_eq!(body["blocked"][0]["escalation_level"], 1);
	}

	#[tokio::test]
	async fn test_whitelist_endpoint() {
		let service = service();
		let response = router(service.clone())
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/whitelist")
					.header("content-type", "application/json")
					.body(Body::from(r#"{"ip": "198.51.100.9"}"#))
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert!(service.is_trusted(&"198.51.100.9".parse().unwrap()));
	}

	#[tokio::test]
	async fn test_whitelist_rejects_malformed() {
		let response = router(service())
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/whitelist")
					.header("content-type", "application/json")
					.body(Body::from(r#"{"ip": "not-an-ip"}"#))
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_unblock_endpoint() {
		let service = service();
		let ip: std::net::IpAddr = "203.0.113.41".parse().unwrap();
		service.block(ip, "test", None).await;
		assert!(service.is_blocked(&ip));

		let response = router(service.clone())
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/unblock")
					.header("content-type", "application/json")
					.body(Body::from(r#"{"ip": "203.0.113.41"}"#))
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert!(!service.is_blocked(&ip));

		let body = body_json(response).await;
		assert_eq!(body["success"], true);
	}
}

// vim: ts=4
