//! Decompression for the LZ10/LZ11 format found in Nintendo handheld ROM filesystems.
//!
//! See [`format`] for the layout of compressed data.

mod decode;
mod errors;
pub mod format;
mod sniff;

pub use decode::{decode, lz_info, Decoder, OverrunPolicy, Reader};
pub use errors::LzError;
pub use format::{LzHeader, LzVariant};
pub use sniff::{expand, expand_bytes, is_compressed, is_compressed_bytes};
