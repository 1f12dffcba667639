//! Core types and services for parlor
//!
//! This crate provides the session data model, the durable history
//! store, configuration loading and logging setup used by the other
//! parlor components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
