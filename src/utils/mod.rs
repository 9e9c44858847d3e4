//! Utility modules
//!
//! Cancellation handles and MIME detection used by request execution.

pub mod cancel;
pub mod mime;

pub use cancel::{CancelHandle, new_cancel_handle};
