//! HTTP Utilities
//!
//! This module contains HTTP-related utilities:
//! - Path normalization and URL building
//! - Header composition
//! - HTTP interceptors
//! - The transport capability

pub mod headers;
pub mod interceptor;
pub mod path;
pub mod transport;

// Re-export main types
pub use headers::*;
pub use interceptor::*;
pub use path::*;
pub use transport::*;
