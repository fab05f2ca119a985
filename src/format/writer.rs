// Backward output writer for in-place unpacking.
//
// The writer starts at the end of the grown buffer and fills it towards
// address zero. Back-references read from already written bytes above the
// write position, one byte at a time, so overlapping copies repeat their
// pattern. An optional expected buffer turns every write into a check.

use super::decoder::DecodeError;

/// Write cursor moving backward through the buffer.
#[derive(Debug, Clone)]
pub struct OutputWriter<'a> {
    pos: usize,
    expected: Option<&'a [u8]>,
}

impl<'a> OutputWriter<'a> {
    /// Create a writer whose first byte lands at `end - 1`.
    pub fn new(end: usize, expected: Option<&'a [u8]>) -> Self {
        Self { pos: end, expected }
    }

    /// Lowest address written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once the buffer has been filled down to address zero.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.pos == 0
    }

    /// Write one byte below the current position.
    #[inline]
    pub fn push(&mut self, buf: &mut [u8], byte: u8) -> Result<(), DecodeError> {
        let pos = self.pos.checked_sub(1).ok_or_else(|| {
            DecodeError::MalformedStream("write cursor ran past the start of the buffer".into())
        })?;
        let slot = buf.get_mut(pos).ok_or_else(|| {
            DecodeError::MalformedStream(format!("write cursor {pos:#x} outside buffer"))
        })?;
        *slot = byte;
        self.pos = pos;

        if let Some(expected) = self.expected {
            let want = *expected.get(pos).ok_or(DecodeError::ExpectedLength {
                expected: expected.len(),
                declared: buf.len(),
            })?;
            if want != byte {
                return Err(DecodeError::IntegrityMismatch {
                    position: pos,
                    expected: want,
                    actual: byte,
                });
            }
        }
        Ok(())
    }

    /// Copy `length` bytes from `offset` above the write position.
    ///
    /// Each source byte is read at `position() + offset` before the write
    /// position moves, so an offset of zero repeats the previous byte.
    pub fn copy_back(
        &mut self,
        buf: &mut [u8],
        length: u32,
        offset: u32,
    ) -> Result<(), DecodeError> {
        let offset = offset as usize;
        for _ in 0..length {
            let src = self.pos + offset;
            let byte = *buf.get(src).ok_or_else(|| {
                DecodeError::MalformedStream(format!(
                    "back-reference at {:#x} reaches {src:#x}, past the end of the {} byte output",
                    self.pos,
                    buf.len()
                ))
            })?;
            self.push(buf, byte)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
