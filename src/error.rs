//! Centralized error handling for Packable.
//!
//! Every failure the codec can produce is a variant of [`PackError`]. Nothing in the
//! library panics; conditions are propagated through [`Result`].
//!
//! ## Error Categories
//!
//! - **Stream errors** ([`PackError::TruncatedStream`], [`PackError::MalformedVarInt`],
//!   [`PackError::Io`]): the byte source or sink misbehaved.
//! - **Resolution errors** ([`PackError::UnsupportedType`]): a type has a member that no
//!   codec can handle. These surface the first time the type is resolved, and on every
//!   attempt after that, since the registry never publishes a descriptor for it.
//! - **Data errors** ([`PackError::UnexpectedAbsent`], [`PackError::Format`]): the bytes
//!   were read completely but do not describe a valid value.
//! - **Internal errors** ([`PackError::Internal`]): type-erasure invariants were violated.
//!   Please report these as bugs.
//!
//! ## Partial results
//!
//! There is no recovery. A failed `pack` may leave a truncated byte sequence in the
//! sink, and a failed `unpack` may leave the target partially populated. Callers that
//! need atomicity should pack into a `Vec<u8>` and commit it only on success.
//!
//! ```rust
//! use packable::{PackError, Packer, Packable};
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Ping { seq: i32 }
//!
//! let bytes = [0x01, 0x00]; // only half of an int32
//! match Packer::new().from_bytes::<Ping>(&bytes) {
//!     Err(PackError::TruncatedStream) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Packable operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// The master error enum covering every failure domain of the codec.
///
/// This type is `Clone` so a failure can be stored or handed across threads.
/// I/O errors are wrapped in `Arc` for that reason.
#[derive(Debug, Clone)]
pub enum PackError {
    /// The byte source yielded fewer bytes than a primitive or length prefix required.
    ///
    /// Raised for exhaustion in the middle of a primitive too (e.g. one byte of an int16).
    TruncatedStream,

    /// A variable-length length prefix did not terminate within five 7-bit groups,
    /// or decoded to a value wider than 32 bits.
    MalformedVarInt,

    /// A member's type matches no primitive codec and exposes no codable-object,
    /// collection or map capability. Carries the Rust type name.
    UnsupportedType(&'static str),

    /// A presence marker of 0 was read for a member whose Rust type cannot be absent.
    ///
    /// Model optional members as `Option<T>`.
    UnexpectedAbsent(&'static str),

    /// The stream is structurally readable but holds an invalid value
    /// (negative length, invalid UTF-8, unknown enum discriminant).
    Format(String),

    /// Any other failure of the underlying sink or source.
    Io(Arc<io::Error>),

    /// A type-erasure invariant was violated inside the engine.
    Internal(String),
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedStream => write!(f, "Truncated stream: source ended mid-value"),
            Self::MalformedVarInt => write!(f, "Malformed variable-length integer"),
            Self::UnsupportedType(t) => write!(f, "Unsupported type: {t}"),
            Self::UnexpectedAbsent(t) => write!(f, "Absent value for non-optional type {t}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for PackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PackError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return Self::TruncatedStream;
        }
        Self::Io(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn eof_maps_to_truncated_stream() {
        let err: PackError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, PackError::TruncatedStream));
        assert!(err.source().is_none());
    }

    #[test]
    fn other_io_errors_keep_their_source() {
        let err: PackError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, PackError::Io(_)));
        assert!(err.source().is_some());
        assert_eq!(err.clone().to_string(), "I/O Error: pipe");
    }
}
