//! Error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub type FwResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// A textual address could not be parsed into an IP or CIDR range
	InvalidAddress(String),
	/// The shared block store failed or timed out
	StoreUnavailable(String),

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::InvalidAddress(addr) => write!(f, "invalid address: {}", addr),
			Error::StoreUnavailable(msg) => write!(f, "block store unavailable: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match self {
			Error::InvalidAddress(addr) => {
				let body = serde_json::json!({
					"error": "Bad Request",
					"message": format!("Invalid address: {}", addr),
					"code": "INVALID_ADDRESS"
				});
				(StatusCode::BAD_REQUEST, Json(body)).into_response()
			}
			_ => {
				let body = serde_json::json!({
					"error": "Internal Server Error",
					"message": "An internal error occurred",
					"code": "INTERNAL"
				});
				(StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
			}
		}
	}
}

// vim: ts=4
