//! Core Module for sqlbridge
//!
//! This module contains the fundamental components that form the backbone
//! of the crate. It provides the driver-agnostic connection contract and
//! the shared error handling infrastructure that every driver builds on.

pub mod driver;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
