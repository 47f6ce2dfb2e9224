//! Helper server library.
//!
//! Chat-mediated intake and matching of care providers (caregivers) and care
//! seekers (patients). Exposed as a library so the CLI and the integration
//! tests drive the same code as the HTTP server.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - `SQLite` entity store and the dynamic query builder
//! - [`llm`] - Chat model trait, HTTP client, mock, and function catalog
//! - [`models`] - Profiles, conversation entries, and match records
//! - [`services`] - Conversation orchestration, function dispatch, matching
//! - [`routes`] - Axum handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
