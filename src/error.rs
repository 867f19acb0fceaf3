use std::fmt::Display;
use std::sync::PoisonError;

/// Emberkv errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// An empty key was passed to a put operation.
    BlankKey,
    /// The key is absent, deleted, or expired.
    KeyNotFound,
    /// Malformed data encountered while scanning the data file.
    Corrupted(String),
    /// A value failed to encode or decode, or an import stream failed to parse.
    Serialize(String),
    /// An IO error.
    IO(String),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BlankKey => write!(f, "key can not be blank"),
            Error::KeyNotFound => write!(f, "key not found"),
            Error::Corrupted(msg) => write!(f, "corrupted data file: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
        }
    }
}

/// Constructs an Error::Corrupted for the given format string.
#[macro_export]
macro_rules! errcorrupt {
    ($($args:tt)*) => { $crate::error::Error::Corrupted(format!($($args)*)).into() };
}

/// An emberkv Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        Error::Serialize(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::IO(err.to_string())
    }
}
