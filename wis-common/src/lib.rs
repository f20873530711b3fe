//! WIS Common - Shared configuration, errors and logging for the WIS
//! speech-to-text adapter.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and context helpers
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{Config, ObservabilityConfig, SttConfig};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};
