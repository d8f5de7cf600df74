//! Database repository test infrastructure.
//!
//! Repositories are tested against fast in-memory SQLite databases with
//! the real migrations applied, so tests always match the production
//! schema. The [`harness`] module also provides seeding helpers reused
//! by the authorization and service tests.

pub mod harness;

mod groups;
mod pool;
