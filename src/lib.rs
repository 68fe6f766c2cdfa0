//! Reclaim: Canvas Asset Recovery
//!
//! Locates media assets referenced by a canvas server, determines which are
//! missing from local content-addressed storage, recovers missing assets from
//! dated backup snapshots, and reports the outcome.

pub mod backup;
pub mod canvus;
pub mod config;
pub mod error;
pub mod logging;
pub mod recovery;
pub mod scanner;
pub mod tooling;
