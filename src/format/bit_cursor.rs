// Backward bit/byte cursor over the shared unpack buffer.
//
// Bytes are consumed from high addresses towards zero. Bits come MSB-first
// out of an 8-bit shift register; a register value of `SHIFT_RELOAD` means
// every bit of the last loaded byte has been used. Literal bytes and
// bitstream bytes share the same cursor, so a byte is only loaded into the
// register at the moment its first bit is needed.

use super::decoder::DecodeError;

/// Shift register value meaning "load a fresh byte on the next bit".
pub const SHIFT_RELOAD: u8 = 0x80;

/// Read cursor moving backward through the buffer.
#[derive(Debug, Clone)]
pub struct BitCursor {
    pos: usize,
    shift: u8,
}

impl BitCursor {
    /// Create a cursor whose next byte is `buf[pos - 1]`.
    pub fn new(pos: usize, shift_seed: u8) -> Self {
        Self {
            pos,
            shift: shift_seed,
        }
    }

    /// Current position: every byte at or above it has been consumed.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current shift register contents.
    #[inline]
    pub fn shift_register(&self) -> u8 {
        self.shift
    }

    /// Step back one byte and return it.
    #[inline]
    pub fn read_byte(&mut self, buf: &[u8]) -> Result<u8, DecodeError> {
        let pos = self.pos.checked_sub(1).ok_or_else(|| {
            DecodeError::MalformedStream("read cursor ran past the start of the buffer".into())
        })?;
        let byte = *buf.get(pos).ok_or_else(|| {
            DecodeError::MalformedStream(format!(
                "read cursor {pos:#x} outside buffer of {} bytes",
                buf.len()
            ))
        })?;
        self.pos = pos;
        Ok(byte)
    }

    /// Read one bit.
    #[inline]
    pub fn read_bit(&mut self, buf: &[u8]) -> Result<u32, DecodeError> {
        let current = if self.shift == SHIFT_RELOAD {
            let byte = self.read_byte(buf)?;
            // The appended one marks where the loaded bits run out.
            self.shift = ((byte & 0x7F) << 1) | 1;
            byte
        } else {
            let reg = self.shift;
            self.shift = (reg & 0x7F) << 1;
            reg
        };
        Ok(u32::from(current >> 7))
    }

    /// Read `count` bits, most significant first.
    #[inline]
    pub fn read_bits(&mut self, buf: &[u8], count: u8) -> Result<u32, DecodeError> {
        debug_assert!(count <= 32, "read_bits: {count} bits do not fit a u32");
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.read_bit(buf)?;
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
