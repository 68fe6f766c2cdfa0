//! Tooling & Integration Layer
//!
//! Command-line surface for recovery operations.

pub mod cli;

pub use cli::{execute, Cli, Commands};
