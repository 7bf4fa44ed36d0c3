//! # Application Layer
//!
//! Service interfaces and the conversation orchestration use case.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
