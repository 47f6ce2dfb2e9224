//! Helper Core - Shared types library.
//!
//! This crate provides common types used across all helper components:
//! - `server` - Chat intake and matching service
//! - `cli` - Command-line tools for migrations, transcript replay, and match reports
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for participant emails, ids, roles, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
