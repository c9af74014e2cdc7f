use crate::errors::LzError;
use crate::format::{BackRef, LzHeader};
use bitstream_io::{BigEndian, BitReader, BE};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, Cursor, Read, Write},
    path::Path,
};

type LogWtr<'a> = &'a mut dyn Write;

/// What to do with a copyback that would run past the decompressed size in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrunPolicy {
    /// Copy only up to the decompressed size and keep going.
    ///
    /// The dropped bytes are counted (see [`Reader::overrun`]), and a whole-buffer
    /// decode reports them as [`LzError::SizeMismatch`].
    Clamp,
    /// Stop with [`LzError::Overrun`].
    Fail,
}

impl Default for OverrunPolicy {
    fn default() -> Self {
        Self::Clamp
    }
}

/// Specify the decoding settings, such as logging, input, and overrun handling.
///
/// To create a new `Decoder`, use [`for_reader()`], [`for_bytes()`], or
/// [`for_file()`]. Then, change any of the decoder settings.
/// Finally, decode the input data with [`decode()`], or stream it with [`into_reader()`].
/// ```
/// # use nitro_lz::Decoder;
/// let compressed = [0x10, 0x05, 0x00, 0x00, 0x40, b'X', 0x10, 0x00];
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode()
///     .unwrap();
/// assert_eq!(&decompressed, b"XXXXX");
/// ```
/// You can use a `Decoder` to get the [`LzHeader`] with [`header()`]:
/// ```
/// # use nitro_lz::{Decoder, LzVariant};
/// # let compressed = [0x10, 0x05, 0x00, 0x00, 0x40, b'X', 0x10, 0x00];
/// let mut decoder = Decoder::for_bytes(&compressed);
/// let header = decoder.header().unwrap();
/// assert_eq!(header.size, 5);
/// assert_eq!(header.variant, LzVariant::Simple);
/// ```
/// [`for_reader()`]: Decoder::for_reader
/// [`for_bytes()`]: Decoder::for_bytes
/// [`for_file()`]: Decoder::for_file
/// [`decode()`]: Decoder::decode
/// [`into_reader()`]: Decoder::into_reader
/// [`header()`]: Decoder::header
pub struct Decoder<'a, R: Read> {
    rdr: R,
    policy: OverrunPolicy,
    log: Option<LogWtr<'a>>,
    header: Option<LzHeader>,
    body_read: bool,
}

impl<'a, R: Read> Decoder<'a, R> {
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            rdr,
            policy: OverrunPolicy::default(),
            log: None,
            header: None,
            body_read: false,
        }
    }

    /// Write a trace of every decoded instruction to `wtr`
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    #[inline]
    pub fn overrun_policy(&mut self, policy: OverrunPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Convenience method to set [`OverrunPolicy::Fail`]
    #[inline]
    pub fn strict(&mut self) -> &mut Self {
        self.policy = OverrunPolicy::Fail;
        self
    }

    /// Read the header, if it hasn't been read yet
    pub fn header(&mut self) -> Result<LzHeader, LzError> {
        if let Some(hdr) = self.header {
            return Ok(hdr);
        }

        let hdr = LzHeader::from_bitreader(&mut BitReader::endian(&mut self.rdr, BigEndian))?;
        self.header = Some(hdr);
        Ok(hdr)
    }

    /// The header, once the body hasn't been handed out yet
    fn start_body(&mut self) -> Result<LzHeader, LzError> {
        if self.body_read {
            return Err(LzError::AlreadyDecoded);
        }
        let header = self.header()?;
        self.body_read = true;
        Ok(header)
    }

    /// Decompress the whole input into a `Vec<u8>`.
    ///
    /// Fails with [`LzError::SizeMismatch`] if a copyback had to be clamped to fit
    /// the size in the header.
    ///
    /// A `Decoder` reads its input once: calling this again, or calling
    /// [`into_reader()`](Decoder::into_reader) afterwards, fails with [`LzError::AlreadyDecoded`].
    pub fn decode(&mut self) -> Result<Vec<u8>, LzError> {
        let header = self.start_body()?;
        let Decoder { rdr, policy, log, .. } = self;

        let mut src = BitReader::endian(rdr, BigEndian);
        let mut state = Inflate::new(header, *policy);
        state.fill(&mut src, log.as_deref_mut(), header.size as usize);
        if let Some(err) = state.take_err() {
            return Err(err);
        }

        if state.overrun > 0 {
            return Err(LzError::SizeMismatch {
                expected: state.size(),
                actual: state.size() + state.overrun,
            });
        }

        debug_assert_eq!(state.out.len(), state.size());
        Ok(state.out)
    }

    /// Turn this `Decoder` into a streaming [`Reader`] with the same settings
    pub fn into_reader(mut self) -> Result<Reader<'a, R>, LzError> {
        let header = self.start_body()?;

        Ok(Reader {
            src: BitReader::endian(self.rdr, BigEndian),
            log: self.log,
            state: Inflate::new(header, self.policy),
            pos: 0,
        })
    }
}

impl<'a> Decoder<'a, Cursor<&'a [u8]>> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

impl<'a> Decoder<'a, BufReader<File>> {
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LzError> {
        File::open(p)
            .map(BufReader::new)
            .map(Self::for_reader)
            .map_err(Into::into)
    }
}

/// Decompress LZ10/LZ11 data into a `Vec<u8>`
///
/// This is a convenience function to decode a `Read`er without
/// having to import and set up a [`Decoder`]
pub fn decode<R: Read>(rdr: R) -> Result<Vec<u8>, LzError> {
    Decoder::for_reader(rdr).decode()
}

/// Extract the [`LzHeader`] from LZ10/LZ11 data
pub fn lz_info<R: Read>(rdr: R) -> Result<LzHeader, LzError> {
    Decoder::for_reader(rdr).header()
}

/// Streaming decompression of LZ10/LZ11 data.
///
/// Instructions are only decoded as far as needed to fill each read. Everything
/// decoded so far is kept, as a copyback can reach back to any earlier byte.
///
/// Once a read fails, every later read fails with the same error. Bytes decoded
/// before the failure are still handed out first.
/// ```
/// # use nitro_lz::Reader;
/// use std::io::Read;
///
/// let compressed = [0x10, 0x03, 0x00, 0x00, 0x00, b'A', b'B', b'C'];
/// let mut rdr = Reader::new(&compressed[..]).unwrap();
/// let mut out = String::new();
/// rdr.read_to_string(&mut out).unwrap();
/// assert_eq!(out, "ABC");
/// ```
pub struct Reader<'a, R: Read> {
    src: BitReader<R, BE>,
    log: Option<LogWtr<'a>>,
    state: Inflate,
    pos: usize,
}

impl<'a, R: Read> Reader<'a, R> {
    /// Read the header from `rdr` and set up a reader with the default settings.
    ///
    /// Use [`Decoder::into_reader`] to change the settings.
    pub fn new(rdr: R) -> Result<Self, LzError> {
        Decoder::for_reader(rdr).into_reader()
    }

    #[inline]
    pub fn header(&self) -> LzHeader {
        self.state.header
    }

    /// Size of the decompressed data
    #[inline]
    pub fn size(&self) -> u64 {
        u64::from(self.state.header.size)
    }

    /// Number of decompressed bytes handed out so far
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Number of compressed bytes consumed so far, including the header
    #[inline]
    pub fn compressed_offset(&self) -> u64 {
        self.state.roffset
    }

    /// Number of bytes dropped by [`OverrunPolicy::Clamp`]
    #[inline]
    pub fn overrun(&self) -> usize {
        self.state.overrun
    }

    /// Like [`Read::read`], but with the decoding error kept as an [`LzError`].
    ///
    /// Returns `Ok(0)` once all of the decompressed data has been read.
    pub fn read_decoded(&mut self, buf: &mut [u8]) -> Result<usize, LzError> {
        let Reader {
            src,
            log,
            state,
            pos,
        } = self;

        let want = buf.len().min(state.size() - *pos);
        if state.out.len() < *pos + want {
            // a failure is stored in `state` and reported once the good bytes are used up
            state.fill(src, log.as_deref_mut(), *pos + want);
        }

        let n = want.min(state.out.len() - *pos);
        if n == 0 && want > 0 {
            if let Some(err) = state.take_err() {
                return Err(err);
            }
        }

        buf[..n].copy_from_slice(&state.out[*pos..*pos + n]);
        *pos += n;

        Ok(n)
    }
}

impl<'a, R: Read> Read for Reader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_decoded(buf).map_err(Into::into)
    }
}

/// Decoding state shared by [`Decoder::decode`] and [`Reader`]
struct Inflate {
    header: LzHeader,
    policy: OverrunPolicy,
    out: Vec<u8>,
    // control byte, shifted left as bits are used
    bits: u8,
    bitcount: u8,
    roffset: u64,
    overrun: usize,
    err: Option<LzError>,
    freq: LogFreq,
    logged_header: bool,
}

impl Inflate {
    fn new(header: LzHeader, policy: OverrunPolicy) -> Self {
        Self {
            header,
            policy,
            out: Vec::with_capacity(header.size as usize),
            bits: 0,
            bitcount: 0,
            roffset: LzHeader::LEN as u64,
            overrun: 0,
            err: None,
            freq: LogFreq::new(),
            logged_header: false,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.header.size as usize
    }

    /// Decode until `target` bytes (capped to the decompressed size) are in `out`.
    /// A failure is stored for [`take_err`](Inflate::take_err), and stops any further decoding.
    fn fill<R: Read, W: Write + ?Sized>(
        &mut self,
        src: &mut BitReader<R, BE>,
        log: Option<&mut W>,
        target: usize,
    ) {
        if self.err.is_some() {
            return;
        }

        if let Err(e) = self.run(src, log, target.min(self.size())) {
            self.err = Some(e);
        }
    }

    /// The stored failure, if any. The first call hands out the original error,
    /// later calls get a copy of it.
    fn take_err(&mut self) -> Option<LzError> {
        let err = self.err.take()?;
        self.err = Some(err.replay());
        Some(err)
    }

    fn run<R: Read, W: Write + ?Sized>(
        &mut self,
        src: &mut BitReader<R, BE>,
        mut log: Option<&mut W>,
        target: usize,
    ) -> Result<(), LzError> {
        if !self.logged_header {
            if let Some(wtr) = log.as_deref_mut() {
                writeln!(wtr, "# Header\n{}", &self.header)?;
            }
            self.logged_header = true;
        }

        while self.out.len() < target {
            if !self.next_bit(src)? {
                let byte = self.read_byte(src)?;
                if let Some(wtr) = log.as_deref_mut() {
                    writeln!(wtr, "{:04x} - Literal: {:02x}", self.out.len(), byte)?;
                    self.freq.literals += 1;
                }
                self.out.push(byte);
                continue;
            }

            let at = self.roffset;
            let backref = BackRef::from_bitreader(self.header.variant, src)
                .map_err(|e| self.truncated(e))?;
            self.roffset += u64::from(backref.len);

            // get start position in output, and the number of bytes to copy-back
            if backref.distance > self.out.len() {
                return Err(LzError::BadLookBack {
                    distance: backref.distance,
                    available: self.out.len(),
                    offset: at,
                });
            }

            let start = self.out.len() - backref.distance;
            let remaining = self.size() - self.out.len();
            let mut count = backref.count;
            if count > remaining {
                match self.policy {
                    OverrunPolicy::Clamp => {
                        self.overrun += count - remaining;
                        count = remaining;
                    }
                    OverrunPolicy::Fail => {
                        return Err(LzError::Overrun {
                            count,
                            remaining,
                            offset: at,
                        })
                    }
                }
            }

            if let Some(wtr) = log.as_deref_mut() {
                writeln!(
                    wtr,
                    "{:04x} - BackRef: {} | start: {:04x}",
                    self.out.len(),
                    backref,
                    start
                )?;
                *self.freq.backrefs.entry(backref.len).or_insert(0) += 1;
                if count < backref.count {
                    writeln!(wtr, "\tclamped to {} bytes", count)?;
                }
            }

            // byte by byte, as the copy may overlap the bytes it writes
            for i in start..start + count {
                let byte = self.out[i];
                self.out.push(byte);
            }
        }

        if self.out.len() == self.size() {
            if let Some(wtr) = log.take() {
                self.write_summary(wtr)?;
            }
        }

        Ok(())
    }

    fn next_bit<R: Read>(&mut self, src: &mut BitReader<R, BE>) -> Result<bool, LzError> {
        if self.bitcount == 0 {
            self.bits = self.read_byte(src)?;
            self.bitcount = 8;
        }
        let bit = self.bits & 0x80 != 0;
        self.bitcount -= 1;
        self.bits <<= 1;
        Ok(bit)
    }

    fn read_byte<R: Read>(&mut self, src: &mut BitReader<R, BE>) -> Result<u8, LzError> {
        let byte = src.read::<u8>(8).map_err(|e| self.truncated(e))?;
        self.roffset += 1;
        Ok(byte)
    }

    fn truncated(&self, e: io::Error) -> LzError {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => LzError::UnexpectedEof {
                offset: self.roffset,
                produced: self.out.len(),
                expected: self.size(),
            },
            _ => e.into(),
        }
    }

    fn write_summary<W: Write + ?Sized>(&mut self, wtr: &mut W) -> io::Result<()> {
        if self.freq.written {
            return Ok(());
        }
        self.freq.written = true;

        writeln!(wtr, "# Summary")?;
        writeln!(wtr, "compressed bytes: {}", self.roffset)?;
        writeln!(wtr, "literals: {}", self.freq.literals)?;
        for (len, n) in &self.freq.backrefs {
            writeln!(wtr, "{} byte copybacks: {}", len, n)?;
        }
        if self.overrun > 0 {
            writeln!(wtr, "clamped bytes: {}", self.overrun)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LogFreq {
    literals: u32,
    backrefs: BTreeMap<u8, u32>,
    written: bool,
}

impl LogFreq {
    fn new() -> Self {
        Self {
            literals: 0,
            backrefs: BTreeMap::new(),
            written: false,
        }
    }
}
