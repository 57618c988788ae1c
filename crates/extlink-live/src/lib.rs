//! Replicated live arrays and maps, the operations an extension applies to them, and the
//! report path that turns recorded changes into live-data handler events.

mod array;
mod map;
mod reference;

pub use array::{ArrayCommand, LiveArray, LiveArrayChange};
pub use map::{LiveMap, LiveMapChange, MapCommand};
pub use reference::{LiveDataEvent, LiveDataRef, LiveObject};

use extlink_protocol::{LiveDataOperationType, ProtocolError};

pub type LiveResult<T> = Result<T, LiveDataError>;

#[derive(Debug, thiserror::Error)]
pub enum LiveDataError {
    #[error("operation is missing its key")]
    MissingKey,
    #[error("operation is missing its item")]
    MissingItem,
    #[error("operation is missing its index")]
    MissingIndex,
    #[error("index {index} is out of range for {len} items")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("invalid remove count {0}")]
    InvalidCount(i64),
    #[error("key '{0}' is not present")]
    KeyNotFound(String),
    #[error("{operation} is not supported on a live {kind}")]
    UnsupportedOperation {
        operation: LiveDataOperationType,
        kind: &'static str,
    },
    #[error(transparent)]
    Decode(#[from] ProtocolError),
}
