//! # Connector Layer
//!
//! External integrations implementing the application interfaces:
//! - Vendor chat clients and the provider router
//! - Credential and settings stores
//! - Screen capture stand-in for headless builds

pub mod adapter;

pub use adapter::*;
