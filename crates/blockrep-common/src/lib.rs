//! blockrep Common - Shared types and utilities
//!
//! This crate provides the identifiers, error definitions and configuration
//! used by the replicated block client and its command-line tool.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClientConfig, RetryConfig};
pub use error::{Error, FailureCause, Result};
pub use types::*;
