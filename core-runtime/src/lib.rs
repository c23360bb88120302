//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the cry pipeline:
//! - Logging and tracing infrastructure
//! - Configuration and host bridge resolution
//! - Event bus system
//!
//! ## Overview
//!
//! Every other crate in the workspace depends on this one. It owns the
//! logging conventions, the validated [`config::CryConfig`], and the
//! broadcast channel that reports pipeline progress to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
