pub use crate::error::{Error, FwResult};

pub use tracing::{debug, debug_span, error, info, info_span, warn, warn_span};

// vim: ts=4
