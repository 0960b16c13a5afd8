//! Facebook Marketing API Client Library
//!
//! This library provides a rate-limited client for the Facebook Marketing
//! (Graph) API: ad account validation and campaign management under
//! pre-existing ad accounts.
//!
//! # Modules
//!
//! - `core`: Domain types, errors and the rate limiter.
//! - `integrations`: Graph API transport and payload schemas.
//! - `config`: Configuration management.
//! - `error_mapping`: User-facing descriptions of platform error codes.
//! - `errors`: Typed failures.
//! - `facebook_client`: Public campaign and ad account operations.
//! - `facebook_models`: Graph API payloads and mapping to domain types.
//! - `graph_client`: HTTP transport for the Graph API.
//! - `models`: Domain data models.
//! - `rate_limiter`: Points budget over a rolling window.

pub mod core;
pub mod integrations;

pub mod config;
pub mod error_mapping;
pub mod errors;
pub mod facebook_client;
pub mod facebook_models;
pub mod graph_client;
pub mod models;
pub mod rate_limiter;

pub use errors::FacebookError;
pub use facebook_client::FacebookClient;
