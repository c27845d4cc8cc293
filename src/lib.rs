// src/lib.rs

//! rpmstage Transaction Staging Layer
//!
//! Validation and staging front-end for RPM-style transaction engines:
//! opens candidate package files, gates them through a signature/trust
//! policy and a modularity allow-list, registers install/reinstall/erase
//! elements with the engine, and folds the engine's post-evaluation
//! problem reports into a single diagnostic.
//!
//! # Architecture
//!
//! - Engine seam: dependency resolution, ordering, and commit live behind
//!   the [`engine::TransactionSet`] trait
//! - Gates first: no element reaches the engine after a validation failure
//! - Scoped resources: metadata headers move into the engine on success
//!   and drop on every abort path
//! - Call-scoped diagnostics: database lookups capture low-level error
//!   chatter in an explicit sink, not a process-wide callback

pub mod engine;
mod error;
pub mod package;
pub mod policy;
pub mod transaction;

pub use error::{Error, Result};
