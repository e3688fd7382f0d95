//! Core types shared across Tether facilities
//!
//! Holds the canonical field keys and event names used by the logging
//! macros in `tether-core` and by the SQLite gateway in `tether-store`, so
//! every crate emits the same structured shape.

pub mod schema;
