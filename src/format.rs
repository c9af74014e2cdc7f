//! Information and structures for LZ10/LZ11 compressed files.
//!
//! A compressed file is a four byte header followed by the encoded body.
//!
//! ## Header
//! The header stores the compression type and the size of the decompressed data.
//! It can be extracted into an [`LzHeader`] by using [`lz_info()`].
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0        | compression type (`0x10` => [`Simple`]; `0x11` => [`Extended`]) |
//! | 1..4     | size in little endian bytes of decompressed data |
//!
//! ## Body
//! The body is a series of groups. Each group starts with a control byte,
//! followed by up to eight instructions. The bits of the control byte are read
//! from most to least significant, one bit per instruction:
//! * `0` => copy the next byte of the body directly into the output
//! * `1` => a copyback instruction follows
//!
//! Once the decompressed size is reached, any unused bits of the last control byte are ignored.
//!
//! ### Copybacks
//! A copyback is a `(count, distance)` pair: copy `count` bytes, starting
//! `distance` bytes back from the end of the output. A distance of one repeats
//! the previous byte, so a copyback can overlap with the bytes it produces.
//! The distance is always stored in twelve bits, so it ranges from 1 to 4096.
//!
//! The first two bytes of a copyback are read as a big endian 16 bit value `n`.
//!
//! For [`Simple`] (`0x10`) files, that is the whole instruction:
//! ```text
//! ┌ count - 3
//! |    ┌ distance - 1
//! cccc dddddddddddd
//! ```
//!
//! [`Extended`] (`0x11`) files use the top nibble of `n` to pick one of three forms:
//! ```text
//! top nibble >= 2: 2 bytes, count 1..=15
//! cccc dddddddddddd
//!
//! top nibble == 0: 3 bytes, count 0x11 + (0..=0xFF)
//! 0000 cccccccc dddddddddddd
//!
//! top nibble == 1: 4 bytes, count 0x111 + (0..=0xFFFF)
//! 0001 cccccccccccccccc dddddddddddd
//! ```
//!
//! ## An Example
//! The string "XXXXX" could be compressed as a single literal and a copyback:
//! ```text
//! Header
//! 10      <- simple type
//! 050000  <- decompressed size of 5 bytes
//!
//! Body
//! 40      <- control byte 0b0100_0000: literal, then copyback
//! 58      <- literal ascii 'X'
//! 1000    <- copyback: count (1 + 3) = 4, distance (0 + 1) = 1
//! ```
//! [`lz_info()`]: crate::lz_info
//! [`Simple`]: LzVariant::Simple
//! [`Extended`]: LzVariant::Extended

use crate::errors::LzError;
use bitstream_io::{BitReader, BE};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::io::{self, Read};

/// The two copyback encodings of an LZ compressed file, named by their header magic.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LzVariant {
    /// Type `0x10`: every copyback is two bytes, with a count of 3 to 18.
    Simple = 0x10,
    /// Type `0x11`: copybacks are two, three, or four bytes, with a count of 1 to 65808.
    Extended = 0x11,
}

impl LzVariant {
    /// Look up the variant for a header's magic byte.
    pub fn from_magic(magic: u8) -> Result<Self, LzError> {
        match magic {
            0x10 => Ok(Self::Simple),
            0x11 => Ok(Self::Extended),
            unk => Err(LzError::InvalidHeader(unk)),
        }
    }

    /// The header byte for this variant
    #[inline]
    pub fn magic(self) -> u8 {
        self as u8
    }

    /// The largest count a single copyback can encode
    pub fn max_count(self) -> usize {
        match self {
            Self::Simple => 0xF + 3,
            Self::Extended => 0xFFFF + 0x111,
        }
    }
}

impl fmt::Display for LzVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "Type 0x10 (Simple)"),
            Self::Extended => write!(f, "Type 0x11 (Extended)"),
        }
    }
}

/// The information stored at the start of an LZ compressed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzHeader {
    pub variant: LzVariant,
    /// size of decompressed data
    pub size: u32,
}

impl LzHeader {
    /// Length of the header in bytes
    pub const LEN: usize = 4;
    /// Largest decompressed size the 24 bit size field can hold
    pub const MAX_SIZE: u32 = 0xFF_FFFF;

    /// Parse an LZ header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LzError> {
        if bytes.len() < Self::LEN {
            return Err(LzError::TruncatedHeader);
        }

        let variant = LzVariant::from_magic(bytes[0])?;
        let size = LittleEndian::read_u24(&bytes[1..Self::LEN]);

        Ok(Self { variant, size })
    }

    /// Serialize the header. Only the low 24 bits of `size` are kept.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut arr = [self.variant.magic(), 0, 0, 0];
        LittleEndian::write_u24(&mut arr[1..], self.size & Self::MAX_SIZE);
        arr
    }

    /// Convenience function to read the LZ header from a bitstream
    pub(crate) fn from_bitreader<R: Read>(reader: &mut BitReader<R, BE>) -> Result<Self, LzError> {
        let mut header = [0u8; Self::LEN];
        reader.read_bytes(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => LzError::TruncatedHeader,
            _ => e.into(),
        })?;

        Self::from_bytes(&header)
    }
}

impl fmt::Display for LzHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {} bytes decompressed", self.variant, self.size)
    }
}

/// A decoded copyback instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackRef {
    /// number of bytes to copy
    pub count: usize,
    /// how far back from the end of the output to start copying (1-based)
    pub distance: usize,
    /// number of body bytes the instruction was stored in
    pub len: u8,
}

impl BackRef {
    /// Read one copyback instruction for `variant` from the body.
    ///
    /// Only whole bytes are read, so `bits` stays byte aligned.
    pub(crate) fn from_bitreader<R: Read>(
        variant: LzVariant,
        bits: &mut BitReader<R, BE>,
    ) -> io::Result<Self> {
        let n = u32::from(bits.read::<u16>(16)?);

        let backref = match variant {
            LzVariant::Simple => Self::new((n >> 12) as usize + 3, n, 2),
            LzVariant::Extended => match n >> 12 {
                0 => {
                    let n = (n & 0xFFF) << 8 | u32::from(bits.read::<u8>(8)?);
                    Self::new(0x11 + (n >> 12) as usize, n, 3)
                }
                1 => {
                    // at most 28 bits
                    let n = (n & 0xFFF) << 16 | u32::from(bits.read::<u16>(16)?);
                    Self::new(0x111 + (n >> 12) as usize, n, 4)
                }
                count => Self::new(count as usize, n, 2),
            },
        };
        debug_assert!(backref.count <= variant.max_count());

        Ok(backref)
    }

    #[inline]
    fn new(count: usize, n: u32, len: u8) -> Self {
        Self {
            count,
            distance: (n & 0xFFF) as usize + 1,
            len,
        }
    }
}

impl fmt::Display for BackRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "count: {} distance: {} ({} bytes)",
            self.count, self.distance, self.len
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bitstream_io::BigEndian;
    use std::io::Cursor;

    fn read_backref(variant: LzVariant, bytes: &[u8]) -> io::Result<BackRef> {
        let mut bits = BitReader::endian(Cursor::new(bytes), BigEndian);
        BackRef::from_bitreader(variant, &mut bits)
    }

    #[test]
    fn parse_header() -> Result<(), LzError> {
        let hdr = LzHeader::from_bytes(&[0x11, 0x34, 0x12, 0x05])?;
        assert_eq!(hdr.variant, LzVariant::Extended);
        assert_eq!(hdr.size, 0x05_1234);
        assert_eq!(hdr.to_bytes(), [0x11, 0x34, 0x12, 0x05]);

        let hdr = LzHeader::from_bytes(&[0x10, 0x00, 0x00, 0x00, 0xFF])?;
        assert_eq!(hdr.variant, LzVariant::Simple);
        assert_eq!(hdr.size, 0);

        Ok(())
    }

    #[test]
    fn reject_bad_headers() {
        assert!(matches!(
            LzHeader::from_bytes(&[0x20, 0x03, 0x00, 0x00]),
            Err(LzError::InvalidHeader(0x20))
        ));
        assert!(matches!(
            LzHeader::from_bytes(&[0x10, 0x03]),
            Err(LzError::TruncatedHeader)
        ));

        let mut bits = BitReader::endian(Cursor::new(&[0x11u8, 0x00][..]), BigEndian);
        assert!(matches!(
            LzHeader::from_bitreader(&mut bits),
            Err(LzError::TruncatedHeader)
        ));
    }

    #[test]
    fn simple_backrefs() -> io::Result<()> {
        let cases: &[(&[u8], usize, usize)] = &[
            (&[0x00, 0x00], 3, 1),
            (&[0x10, 0x00], 4, 1),
            (&[0xF0, 0x02], 18, 3),
            (&[0x0F, 0xFF], 3, 4096),
            (&[0xFF, 0xFF], 18, 4096),
        ];

        for &(bytes, count, distance) in cases {
            let br = read_backref(LzVariant::Simple, bytes)?;
            assert_eq!((br.count, br.distance, br.len), (count, distance, 2), "{:02x?}", bytes);
        }

        Ok(())
    }

    #[test]
    fn extended_backrefs() -> io::Result<()> {
        let cases: &[(&[u8], usize, usize, u8)] = &[
            // two byte form
            (&[0x20, 0x00], 2, 1, 2),
            (&[0xF0, 0x05], 15, 6, 2),
            (&[0x4F, 0xFF], 4, 4096, 2),
            // three byte form
            (&[0x00, 0x00, 0x00], 0x11, 1, 3),
            (&[0x01, 0x23, 0x45], 0x11 + 0x12, 0x346, 3),
            (&[0x0F, 0xFF, 0xFF], 0x110, 4096, 3),
            // four byte form
            (&[0x10, 0x00, 0x00, 0x00], 0x111, 1, 4),
            (&[0x11, 0x23, 0x45, 0x67], 0x111 + 0x1234, 0x568, 4),
            (&[0x1F, 0xFF, 0xFF, 0xFF], 0x111 + 0xFFFF, 4096, 4),
        ];

        for &(bytes, count, distance, len) in cases {
            let br = read_backref(LzVariant::Extended, bytes)?;
            assert_eq!(
                (br.count, br.distance, br.len),
                (count, distance, len),
                "{:02x?}",
                bytes
            );
        }
        assert_eq!(LzVariant::Extended.max_count(), 0x111 + 0xFFFF);

        Ok(())
    }

    #[test]
    fn short_backref_is_eof() {
        let err = read_backref(LzVariant::Extended, &[0x10, 0x00, 0x00]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = read_backref(LzVariant::Simple, &[0x10]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
