pub mod bincode;
pub mod json;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use bincode::Bincode;
pub use json::Json;

use crate::error::Result;

/// Encodes and decodes user values into the opaque byte payloads the store
/// persists. The store core never looks inside value bytes; a codec is
/// chosen at the type level, typed `put`/`get` go through it, and
/// `put_bytes`/`get_bytes` bypass it entirely.
pub trait ValueCodec {
    /// Encode a value to bytes
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>>;

    /// Decode bytes back to the original value type
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T>;
}
