//! Utility functions and helpers for the embedcache service.
//!
//! # Submodules
//!
//! - `logging`: Tracing subscriber initialization.

pub mod logging;
