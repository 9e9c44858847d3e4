//! Executors
//!
//! The request executor drives one logical request through building,
//! dispatching and classification, with the retry loop and the single
//! 401 refresh-and-resend cycle around it.

pub mod request;

pub use request::RequestExecutor;
