//! Retry module
//! - policy.rs: retry policy value and the attempt loop that consults it

pub mod policy;

pub use policy::*;
