//! Admission Middleware
//!
//! Tower middleware layer applying the admission check to every request.
//! Denials short-circuit with `429 Too Many Requests`: a JSON body for
//! API/XHR-style clients, an HTML error page otherwise.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures::future::BoxFuture;
use hyper::Request;
use tower::{Layer, Service};

use crate::extract::client_ip;
use crate::prelude::*;
use crate::service::{Admission, AdmissionService, DenyDetail};

/// Admission middleware layer
#[derive(Clone)]
pub struct AdmissionLayer {
	service: Arc<AdmissionService>,
}

impl AdmissionLayer {
	pub fn new(service: Arc<AdmissionService>) -> Self {
		Self { service }
	}
}

impl<S> Layer<S> for AdmissionLayer {
	type Service = AdmissionMiddleware<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AdmissionMiddleware { inner, service: self.service.clone() }
	}
}

/// Admission middleware service
#[derive(Clone)]
pub struct AdmissionMiddleware<S> {
	inner: S,
	service: Arc<AdmissionService>,
}

impl<S> Service<Request<Body>> for AdmissionMiddleware<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let service = self.service.clone();
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let path = req.uri().path().to_string();

			// Health and admin endpoints bypass the check
			if service.config().skip_paths.iter().any(|p| p == &path) {
				return inner.call(req).await;
			}

			// Requests with no resolvable client IP pass through
			let Some(ip) = client_ip(&req) else {
				return inner.call(req).await;
			};

			let user_agent = req
				.headers()
				.get(header::USER_AGENT)
				.and_then(|h| h.to_str().ok())
				.unwrap_or("")
				.to_string();

			match service.admit(ip, &path, &user_agent).await {
				Admission::Allowed(_) => inner.call(req).await,
				Admission::Denied(detail) => {
					warn!("Request denied for {} on {}: {}", ip, path, detail.reason);
					Ok(deny_response(&detail, wants_json(&req)))
				}
			}
		})
	}
}

/// API and XHR-style clients get a JSON error body
fn wants_json<B>(req: &Request<B>) -> bool {
	if req.uri().path().starts_with("/api/") {
		return true;
	}
	if let Some(accept) = req.headers().get(header::ACCEPT).and_then(|h| h.to_str().ok()) {
		if accept.contains("application/json") {
			return true;
		}
	}
	req.headers()
		.get("x-requested-with")
		.and_then(|h| h.to_str().ok())
		.is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
}

/// Build the `429` denial response
pub fn deny_response(detail: &DenyDetail, json: bool) -> Response {
	let mut response = if json {
		let body = serde_json::json!({
			"error": "Too Many Requests",
			"message": "Your request has been blocked due to suspicious activity",
			"code": detail.code.as_str().to_uppercase(),
		});
		(StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
	} else {
		let page = format!(
			"<!DOCTYPE html>\n<html><head><title>429 Too Many Requests</title></head>\n\
			 <body><h1>Too Many Requests</h1>\n\
			 <p>Your request has been blocked due to suspicious activity ({}).</p>\n\
			 </body></html>",
			detail.code.as_str()
		);
		(StatusCode::TOO_MANY_REQUESTS, Html(page)).into_response()
	};

	if let Some(retry_after) = detail.retry_after {
		if let Ok(val) = retry_after.as_secs().to_string().parse() {
			response.headers_mut().insert(header::RETRY_AFTER, val);
		}
	}

	response
}

// vim: ts=4
