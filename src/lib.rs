pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
mod export;
pub mod keydir;
pub mod store;

pub use config::Options;
pub use encoding::{Bincode, Json, ValueCodec};
pub use error::{Error, Result};
pub use store::{SafeStore, Store};
