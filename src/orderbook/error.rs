//! Order book error types.

use std::fmt;

/// Errors that can occur within the [`crate::orderbook::OrderBook`].
///
/// Day-to-day mutating operations (`add`, `cancel`, `modify_qty`, ...) never
/// return this type: they fail silently to a `bool`/`Option` per §4.1 of the
/// design notes, and it is the dispatcher's job to turn that into a protocol
/// rejection. `OrderBookError` is reserved for the handful of operations --
/// snapshot restore and persistence -- whose failure modes are closer to I/O
/// or data-corruption errors than to ordinary trading outcomes.
#[derive(Debug)]
#[non_exhaustive]
pub enum OrderBookError {
    /// A snapshot or persisted payload could not be deserialized.
    DeserializationError {
        /// Underlying error message.
        message: String,
    },
    /// A snapshot could not be serialized.
    SerializationError {
        /// Underlying error message.
        message: String,
    },
    /// A persisted file's checksum did not match its recorded checksum.
    ChecksumMismatch {
        /// Checksum recorded at write time.
        expected: String,
        /// Checksum recomputed at read time.
        actual: String,
    },
    /// An I/O error occurred while reading or writing persisted state.
    Io {
        /// Underlying error message.
        message: String,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::DeserializationError { message } => {
                write!(f, "deserialization error: {message}")
            }
            OrderBookError::SerializationError { message } => {
                write!(f, "serialization error: {message}")
            }
            OrderBookError::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected}, got {actual}")
            }
            OrderBookError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for OrderBookError {}

impl From<serde_json::Error> for OrderBookError {
    fn from(err: serde_json::Error) -> Self {
        OrderBookError::DeserializationError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for OrderBookError {
    fn from(err: std::io::Error) -> Self {
        OrderBookError::Io {
            message: err.to_string(),
        }
    }
}
