pub mod error;
pub mod types;

pub use error::{CodecError, Result};
pub use types::{Envelope, MessageType, SessionDescriptor};

/// Name of this codec, reported alongside [`is_binary`] for callers that
/// support more than one wire format.
pub const NAME: &str = "json";

pub fn is_binary() -> bool {
    false
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(envelope)?)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    Ok(serde_json::from_slice(bytes)?)
}
