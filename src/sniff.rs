//! Detecting compressed data.
//!
//! Files pulled out of a ROM archive may or may not be compressed, and nothing
//! outside the data says which. The usual approach is to sniff the start of a
//! file, then either decompress it or use it as is:
//! ```
//! # use nitro_lz::expand_bytes;
//! let compressed = [0x10, 0x09, 0x00, 0x00, 0x40, b'X', 0x50, 0x00];
//! assert_eq!(&*expand_bytes(&compressed).unwrap(), b"XXXXXXXXX");
//!
//! let raw = b"plain text";
//! assert_eq!(&*expand_bytes(raw).unwrap(), raw);
//! ```

use crate::decode::decode;
use crate::errors::LzError;
use crate::format::LzHeader;
use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom};

/// Report whether the data at the current position of `src` looks compressed.
///
/// The header must have a known type, and its decompressed size can't be smaller
/// than the data left in `src`. The position of `src` is restored before returning.
pub fn is_compressed<R: Read + Seek>(src: &mut R) -> io::Result<bool> {
    let start = src.seek(SeekFrom::Current(0))?;
    let res = sniff(src, start);
    src.seek(SeekFrom::Start(start))?;
    res
}

/// Report whether `data` looks compressed, with the same rules as [`is_compressed`]
pub fn is_compressed_bytes(data: &[u8]) -> bool {
    looks_compressed(data, data.len() as u64)
}

fn sniff<R: Read + Seek>(src: &mut R, start: u64) -> io::Result<bool> {
    let mut header = Vec::with_capacity(LzHeader::LEN);
    src.by_ref()
        .take(LzHeader::LEN as u64)
        .read_to_end(&mut header)?;
    if header.len() < LzHeader::LEN {
        return Ok(false);
    }

    let end = src.seek(SeekFrom::End(0))?;
    Ok(looks_compressed(&header, end.saturating_sub(start)))
}

fn looks_compressed(header: &[u8], total: u64) -> bool {
    match LzHeader::from_bytes(header) {
        Ok(hdr) => u64::from(hdr.size) >= total,
        Err(_) => false,
    }
}

/// Decompress `src` if it looks compressed, or else read the rest of it unchanged
pub fn expand<R: Read + Seek>(mut src: R) -> Result<Vec<u8>, LzError> {
    if is_compressed(&mut src)? {
        decode(src)
    } else {
        let mut raw = Vec::new();
        src.read_to_end(&mut raw)?;
        Ok(raw)
    }
}

/// Decompress `data` if it looks compressed, or else hand it back as is
pub fn expand_bytes(data: &[u8]) -> Result<Cow<'_, [u8]>, LzError> {
    if is_compressed_bytes(data) {
        decode(data).map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(data))
    }
}
