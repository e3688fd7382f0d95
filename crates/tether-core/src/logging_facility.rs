//! Structured logging facility for Tether
//!
//! This module provides:
//! - A single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - An in-memory capture layer for deterministic assertions in tests
//!
//! # Usage
//!
//! ```rust
//! use tether_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```
//!
//! Every `load` and `hydrate` call emits exactly one start event and one
//! end (or end_error) event. Per-relationship resolution and SQL text are
//! logged at debug and trace level.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
