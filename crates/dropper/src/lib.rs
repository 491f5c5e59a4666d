//! # Dropper
//!
//! Dropper is a lightweight HTTP server for sharing a single directory
//! tree: browse it, search it, and download files from it, optionally
//! behind HTTP Basic authentication.
//!
//! ## Overview
//!
//! The server is read-only and deliberately small. It provides:
//!
//! - **Path confinement**: every user-supplied path is canonicalized and
//!   ancestry-checked against the serving root
//! - **Directory listings**: one level at a time, with human-readable
//!   sizes and mtimes
//! - **Search**: a per-request recursive walk with case-insensitive
//!   substring matching
//! - **Short names**: `/drop/<filename>` downloads by bare filename,
//!   disambiguated at startup
//! - **Basic auth**: one static credential, or none at all
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                  axum Router                      │
//! │   /  /_ls  /_search  /dl  /download  /drop  /_ping│
//! ├───────────────────────────────────────────────────┤
//! │              auth middleware (Basic)              │
//! ├────────────┬───────────────┬──────────────────────┤
//! │  listings  │  index/search │   short-name table   │
//! ├────────────┴───────────────┴──────────────────────┤
//! │          PathResolver (root confinement)          │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dropper::auth::AuthMode;
//! use dropper::server::{app, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = AppState::new(std::path::Path::new("."), AuthMode::Open)?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app(Arc::new(state))).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: configuration file loading and environment overrides
//! - [`auth`]: the Basic-auth gate and its middleware
//! - [`files`]: path resolution, listings, search, short names
//! - [`server`]: routes, handlers, and the serve loop

pub mod auth;
pub mod config;
pub mod files;
pub mod server;

// Re-export config types for convenience
pub use config::{Config, ConfigError};

// Re-export auth types for convenience
pub use auth::{AuthMode, Credential};

// Re-export files types for convenience
pub use files::{Entry, Listing, PathResolver, ShortNames};

// Re-export server types for convenience
pub use server::{app, serve, AppState};
