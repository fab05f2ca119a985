// DHp2 decoder: header relocation and the token loop.
//
// The container is unpacked in place. After the header is parsed, the
// payload bytes that the packer moved under the header are restored, the
// buffer is grown to the unpacked size, and two cursors walk it backward:
// a BitCursor consuming the packed stream and an OutputWriter filling the
// output from the top. Writes stay at or above the read cursor in any
// stream produced by a conforming packer, so unread input is never lost.
//
// Decode order:
//   1. `unpacked_prefix` literal bytes
//   2. while output remains: copy length, offset, next literal count,
//      back-reference copy, literal run

use thiserror::Error;

use super::bit_cursor::BitCursor;
use super::code_table::{OFFSET_MODESTORES, unpacked_row};
use super::header::Header;
use super::modestore::{read_copy_length, read_modestore};
use super::writer::OutputWriter;

/// Largest unpacked size accepted by default (1 GiB).
pub const DEFAULT_MAX_FULL_LENGTH: usize = 1 << 30;

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input is shorter than a header or carries a different magic.
    #[error("not a DHp2 container")]
    NotRecognized,
    /// Header fields are inconsistent with the container.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// Declared unpacked size is above the configured ceiling.
    #[error("unpacked length {declared} exceeds limit {limit}")]
    LengthLimit { declared: usize, limit: usize },
    /// A cursor left the buffer while decoding.
    #[error("malformed stream: {0}")]
    MalformedStream(String),
    /// Verification found a byte that differs from the expected output.
    #[error("integrity mismatch at {position:#010x}: expected {expected:#04x}, got {actual:#04x}")]
    IntegrityMismatch {
        position: usize,
        expected: u8,
        actual: u8,
    },
    /// Verification buffer does not match the declared unpacked size.
    #[error("expected output is {expected} bytes, container unpacks to {declared}")]
    ExpectedLength { expected: usize, declared: usize },
}

impl DecodeError {
    /// True for the recoverable "this is not a DHp2 file" outcome.
    pub fn is_not_recognized(&self) -> bool {
        matches!(self, Self::NotRecognized)
    }
}

// ---------------------------------------------------------------------------
// Tokens and trace sinks
// ---------------------------------------------------------------------------

/// One decoded unit, reported before it is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `count` bytes copied verbatim from the packed stream.
    Literal { position: usize, count: u32 },
    /// `length` bytes repeated from `offset` above the write position.
    BackReference {
        position: usize,
        length: u32,
        offset: u32,
    },
}

/// Receives every token the decoder executes.
pub trait TokenSink {
    fn token(&mut self, token: &Token);
}

impl<F: FnMut(&Token)> TokenSink for F {
    fn token(&mut self, token: &Token) {
        self(token)
    }
}

/// Sink that ignores all tokens.
pub struct NoTrace;

impl TokenSink for NoTrace {
    #[inline]
    fn token(&mut self, _token: &Token) {}
}

/// Sink that tallies tokens for statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCounter {
    pub literal_runs: u64,
    pub literal_bytes: u64,
    pub back_references: u64,
    pub copied_bytes: u64,
}

impl TokenCounter {
    /// Total number of tokens seen.
    pub fn tokens(&self) -> u64 {
        self.literal_runs + self.back_references
    }
}

impl TokenSink for TokenCounter {
    fn token(&mut self, token: &Token) {
        match *token {
            Token::Literal { count, .. } => {
                self.literal_runs += 1;
                self.literal_bytes += u64::from(count);
            }
            Token::BackReference { length, .. } => {
                self.back_references += 1;
                self.copied_bytes += u64::from(length);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for a single decode.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions<'a> {
    /// Known-good output; every written byte is compared against it.
    pub expected: Option<&'a [u8]>,
    /// Containers declaring a larger unpacked size are rejected.
    pub max_full_length: usize,
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self {
            expected: None,
            max_full_length: DEFAULT_MAX_FULL_LENGTH,
        }
    }
}

impl<'a> DecodeOptions<'a> {
    /// Options that verify the output against `expected`.
    pub fn verify_against(expected: &'a [u8]) -> Self {
        Self {
            expected: Some(expected),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Header relocation
// ---------------------------------------------------------------------------

/// Restore the payload bytes the packer moved out from under the header.
///
/// The `header.relocated_len()` bytes ending at `packed_length` are copied
/// back to address zero. Returns the end of the packed stream, where the
/// read cursor starts.
///
/// `buf` must hold at least `packed_length` bytes (see [`Header::validate`]).
pub fn relocate_header(buf: &mut [u8], header: &Header) -> usize {
    let restore = header.relocated_len();
    let packed = header.packed_length as usize;
    buf.copy_within(packed - restore..packed, 0);
    buf.len() - restore
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Unpack the container held in `buf`, in place.
///
/// On success `buf` holds exactly `full_length` unpacked bytes. The buffer is
/// consumed either way: on error its contents are unspecified.
///
/// Every token writes at least two bytes and both cursors are bounds
/// checked, so decoding stops after at most `full_length / 2` tokens even
/// for corrupt input.
pub fn unpack_with<S: TokenSink>(
    buf: &mut Vec<u8>,
    options: &DecodeOptions<'_>,
    sink: &mut S,
) -> Result<Header, DecodeError> {
    let header = Header::parse(buf)?;
    header.validate(buf.len(), options.max_full_length)?;

    let full_length = header.full_length as usize;
    if let Some(expected) = options.expected
        && expected.len() != full_length
    {
        return Err(DecodeError::ExpectedLength {
            expected: expected.len(),
            declared: full_length,
        });
    }

    let source_end = relocate_header(buf, &header);
    buf.resize(full_length, 0);

    let mut src = BitCursor::new(source_end, header.shift_seed);
    let mut dst = OutputWriter::new(buf.len(), options.expected);
    let offsets = &OFFSET_MODESTORES[usize::from(header.pack_mode)];

    copy_literals(&mut src, &mut dst, buf, header.unpacked_prefix, sink)?;

    while !dst.is_done() {
        let (length, ctype) = read_copy_length(&mut src, buf)?;
        let kind = usize::from(ctype.kind);
        let offset = read_modestore(&mut src, buf, &offsets[kind])?;
        let literals = read_modestore(&mut src, buf, unpacked_row(ctype.kind))?;

        sink.token(&Token::BackReference {
            position: dst.position(),
            length,
            offset,
        });
        dst.copy_back(buf, length, offset)?;

        copy_literals(&mut src, &mut dst, buf, literals, sink)?;
    }

    Ok(header)
}

/// Move `count` bytes from the packed stream to the output.
fn copy_literals<S: TokenSink>(
    src: &mut BitCursor,
    dst: &mut OutputWriter<'_>,
    buf: &mut [u8],
    count: u32,
    sink: &mut S,
) -> Result<(), DecodeError> {
    if count == 0 {
        return Ok(());
    }
    sink.token(&Token::Literal {
        position: dst.position(),
        count,
    });
    for _ in 0..count {
        let byte = src.read_byte(buf)?;
        dst.push(buf, byte)?;
    }
    Ok(())
}

/// Unpack in place with default options.
pub fn unpack_in_place(buf: &mut Vec<u8>) -> Result<Header, DecodeError> {
    unpack_with(buf, &DecodeOptions::default(), &mut NoTrace)
}

/// Unpack `container` into a new buffer, leaving the input untouched.
pub fn unpack(container: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut buf = container.to_vec();
    unpack_in_place(&mut buf)?;
    Ok(buf)
}

/// Unpack `container` and check every byte against `expected`.
pub fn unpack_verified(container: &[u8], expected: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut buf = container.to_vec();
    unpack_with(&mut buf, &DecodeOptions::verify_against(expected), &mut NoTrace)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
