//! ABOUTME: Core types, errors, session IDs, and tracing utilities
//! ABOUTME: Foundation crate used by every motion-wake component

pub mod error;
pub mod id;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use id::SessionId;
pub use telemetry::LogFormat;
pub use time::{now_rfc3339, to_rfc3339, MonotonicTimer};
