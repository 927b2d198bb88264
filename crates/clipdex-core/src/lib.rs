//! Shared errors, configuration and service state for clipdex.
//!
//! This crate has no internal clipdex dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`config`]: Search engine connection settings
//! - [`service`]: Ready/degraded lifecycle tracking

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod service;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use service::{ServiceHandle, ServiceState};
