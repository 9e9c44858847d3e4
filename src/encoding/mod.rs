//! Body codecs.
//!
//! The executor never touches `serde_json` directly for payloads; it goes
//! through an injectable `Codec` so callers can swap key strategies per request.

pub mod codec;

pub use codec::*;
