//! Request admission control for axum services.
//!
//! `floodwall` decides, per inbound request, whether to let the request
//! through: a block ledger with escalating durations, a trusted-network
//! allowlist, sliding-window rate limits over three look-back windows and
//! a heuristic suspicion scorer, composed into a single admission check
//! behind a tower middleware layer.
//!
//! State is in-memory and owned by an explicitly constructed
//! [`AdmissionService`]; multi-process deployments can mirror block state
//! through the [`BlockStore`] capability trait.
//!
//! ```no_run
//! use std::sync::Arc;
//! use floodwall::{AdmissionConfig, AdmissionLayer, AdmissionService};
//!
//! let service = Arc::new(AdmissionService::new(AdmissionConfig::default()));
//! let app: axum::Router = axum::Router::new()
//!     .nest("/api/admin/admission", floodwall::admin::router(service.clone()))
//!     .layer(AdmissionLayer::new(service));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod admin;
pub mod config;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod middleware;
pub mod prelude;
pub mod service;
pub mod store;
pub mod suspicion;
pub mod trust;
pub mod window;

pub use config::AdmissionConfig;
pub use error::{Error, FwResult};
pub use middleware::AdmissionLayer;
pub use service::{Admission, AdmissionService, AdmissionStats, DenyCode};
pub use store::{BlockStore, MemoryBlockStore, NullBlockStore};
pub use suspicion::PatternAnalysis;
pub use window::WindowCounts;

// vim: ts=4
