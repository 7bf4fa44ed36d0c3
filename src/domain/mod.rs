//! # Domain Layer
//!
//! Core conversation models and the error type.
//! This layer is independent of transport and infrastructure.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
