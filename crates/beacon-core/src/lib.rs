//! # beacon-core
//!
//! Core types and abstractions for the beacon realtime layer.
//!
//! This crate provides the foundational pieces the other beacon crates depend
//! on: the error type, the explicit [`SiteContext`] threaded through every
//! call, deterministic room naming, the wire [`Envelope`], and centralized
//! defaults.

pub mod context;
pub mod defaults;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod rooms;

// Re-export commonly used types at crate root
pub use context::SiteContext;
pub use envelope::{Envelope, Message};
pub use error::{Error, Result};
