//! Core library for the tokfleet account management system.
//!
//! The crate is organized in layers:
//!
//! - [`models`]: domain types (users, groups, accounts, snapshots)
//! - [`db`]: the entity store, a repository seam over SQLite
//! - [`authz`]: scope resolution and access guarding
//! - [`source`]: the external metric source (TikTok web profile data)
//! - [`services`]: the caller-facing operations, combining the layers
//!   above into permission-checked entity management, snapshot
//!   ingestion, and analytics aggregation
//!
//! The binary in `main.rs` is a thin command layer over [`services`];
//! everything stateful lives behind [`db::DbPool`] and is threaded
//! through explicitly.

pub mod authz;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod source;
