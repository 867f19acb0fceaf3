use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ValueCodec;
use crate::error::Result;

/// The default codec. Values are stored as JSON text, which keeps them
/// readable by the JSON export (raw record bytes are emitted there as JSON
/// fragments).
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl ValueCodec for Json {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
