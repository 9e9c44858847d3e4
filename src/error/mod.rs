//! Error Handling Module
//!
//! This module provides the error type surfaced by every request execution:
//! - Core error type (`HttpClientError`)
//! - Classification helpers (retryability, construction-time failures)
//!
//! # Example
//!
//! ```rust,ignore
//! use wirecall::error::HttpClientError;
//!
//! let error = HttpClientError::http(503, "busy");
//! assert!(error.is_retryable());
//! assert!(!error.is_construction_error());
//! ```

pub mod types;

pub use types::*;
