//! Request execution.
//!
//! - `http`: URL/path construction, header composition, transport and interceptors
//! - `body`: body materialization
//! - `multipart`: multipart/form-data encoding
//! - `progress`: shared dispatcher for progress-tracked transfers
//! - `executors`: the orchestrating state machine

pub mod body;
pub mod executors;
pub mod http;
pub mod multipart;
pub mod progress;
