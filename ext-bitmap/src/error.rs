use thiserror::Error;

/// Errors that can occur when working with an extended bitmap
#[derive(Debug, Error)]
pub enum Error {
    /// An offset or range endpoint lies beyond the addressable range
    #[error("offset {offset} is out of range, offsets must be less than {limit}")]
    OffsetOutOfRange { offset: u64, limit: u64 },

    /// A range whose start is not strictly below its end was passed to a
    /// range insertion
    #[error("invalid range {start}..{end}, start must be less than end")]
    InvalidRange { start: u64, end: u64 },

    /// I/O error while reading or writing the serialized form
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for extended bitmap operations
pub type Result<T> = std::result::Result<T, Error>;
