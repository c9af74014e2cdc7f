use std::io;
use thiserror::Error;

/// Possible errors that arise from attempting to decompress LZ10/LZ11 data.
///
/// Offsets are positions in the compressed input, counting the header.
#[derive(Error, Debug)]
pub enum LzError {
    #[error("Invalid header for lz file: type 0x{0:02x} is not 0x10 or 0x11")]
    InvalidHeader(u8),

    #[error("Input is too short to hold an lz header")]
    TruncatedHeader,

    #[error("Input ended at offset 0x{offset:x} after decoding {produced} of {expected} bytes")]
    UnexpectedEof {
        offset: u64,
        produced: usize,
        expected: usize,
    },

    #[error("Bad lookback at offset 0x{offset:x}: distance {distance} but only {available} bytes decoded")]
    BadLookBack {
        distance: usize,
        available: usize,
        offset: u64,
    },

    #[error("Copyback at offset 0x{offset:x} of {count} bytes overruns the {remaining} bytes left to decode")]
    Overrun {
        count: usize,
        remaining: usize,
        offset: u64,
    },

    #[error("Size mismatch: instructions describe {actual} bytes, header declares {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Input was already decoded by this decoder")]
    AlreadyDecoded,

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl LzError {
    /// The header was unusable, so no body data was read
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidHeader(_) | Self::TruncatedHeader)
    }

    /// A copyback instruction could not be applied to the output
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::BadLookBack { .. } | Self::Overrun { .. })
    }

    /// Copy of `self` for handing out a stored error again.
    /// I/O errors keep their kind and message.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Self::InvalidHeader(magic) => Self::InvalidHeader(*magic),
            Self::TruncatedHeader => Self::TruncatedHeader,
            &Self::UnexpectedEof {
                offset,
                produced,
                expected,
            } => Self::UnexpectedEof {
                offset,
                produced,
                expected,
            },
            &Self::BadLookBack {
                distance,
                available,
                offset,
            } => Self::BadLookBack {
                distance,
                available,
                offset,
            },
            &Self::Overrun {
                count,
                remaining,
                offset,
            } => Self::Overrun {
                count,
                remaining,
                offset,
            },
            &Self::SizeMismatch { expected, actual } => Self::SizeMismatch { expected, actual },
            Self::AlreadyDecoded => Self::AlreadyDecoded,
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

impl From<LzError> for io::Error {
    fn from(error: LzError) -> Self {
        match error {
            LzError::Io(e) => e,
            e @ LzError::UnexpectedEof { .. } | e @ LzError::TruncatedHeader => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e)
            }
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
