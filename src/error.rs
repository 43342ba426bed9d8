use thiserror::Error;

/// Errors raised while turning bytes into graphemes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A byte (or byte sequence) that is not valid in the stream's encoding.
    #[error("malformed {encoding} at byte offset {offset}")]
    Malformed {
        /// Name of the encoding being decoded.
        encoding: &'static str,
        /// Absolute offset of the offending byte within the stream.
        offset: u64,
    },
    /// The input ended in the middle of a multi-byte sequence.
    #[error("incomplete {encoding} sequence at end of input (byte offset {offset})")]
    Incomplete {
        /// Name of the encoding being decoded.
        encoding: &'static str,
        /// Absolute offset of the first byte of the unfinished sequence.
        offset: u64,
    },
}

/// An integer that does not name a normalization form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid normalization form {0}")]
pub struct InvalidFormError(pub i64);
