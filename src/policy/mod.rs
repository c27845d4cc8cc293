// src/policy/mod.rs

//! Validation gates run before a package may enter the transaction
//!
//! Two gates guard the install path: the signature/trust policy
//! (classifies the engine's verification result) and the modularity gate
//! (rejects modular packages outside the enabled module streams).

pub mod modularity;
pub mod signature;

pub use modularity::check_modular_install;
pub use signature::{TrustPolicy, Verdict, VerifyResult};
