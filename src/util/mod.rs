//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`replacer`] - Presigned URL rewriting hooks
//! - [`retry`] - Fixed-delay retry for writes

pub mod replacer;
pub mod retry;
