//! hagen: HA resource-graph compiler.
//!
//! Turns a compiled description of clustered resources into an idempotent
//! shell script for a cluster manager (pacemaker `pcs`, or a container
//! scheduler). Supports restricting output to a dependency-closed subset.

pub mod backends;
pub mod cli;
pub mod core;
pub mod digest;
pub mod error;

pub use error::{Error, Result};
