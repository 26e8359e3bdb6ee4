//! Validate, limit, and mask ad-hoc read-only SQL before it reaches a production database.
#![warn(missing_docs)]

/// Rejection and configuration error types.
pub mod error;
/// The validate → limit → execute → mask request pipeline.
pub mod firewall;
/// SQL parsing and identifier normalization.
pub mod parser;
/// Per-database security policies and built-in presets.
pub mod policy;
/// Row capping before execution and masking after it.
pub mod results;
/// Static query validation against a policy.
pub mod validator;

pub use error::{FirewallError, PolicyError};
pub use firewall::{PreparedQuery, QueryExecutor, QueryFirewall};
pub use policy::{Dialect, Policy};
