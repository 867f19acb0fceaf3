use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ValueCodec;
use crate::error::Result;

/// A compact binary codec. Stored values are not self-describing, so the
/// JSON export does not apply to stores written through this codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bincode;

impl ValueCodec for Bincode {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}
