// DHp2 container header.
//
// Fixed 18-byte big-endian layout at the start of the file:
//
//   offset  size  field
//   0       4     magic ("DHp2")
//   4       4     full_length
//   8       4     packed_length
//   12      4     unpacked_prefix
//   16      1     pack_mode
//   17      1     shift_seed

use super::code_table::PACK_MODES;
use super::decoder::DecodeError;

// ---------------------------------------------------------------------------
// Magic and sizes
// ---------------------------------------------------------------------------

/// Format tag, `b"DHp2"` read as a big-endian u32.
pub const MAGIC: u32 = 0x4448_7032;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 18;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed DHp2 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Size of the unpacked output.
    pub full_length: u32,
    /// End of the packed region inside the container.
    pub packed_length: u32,
    /// Number of literal bytes emitted before the first token.
    pub unpacked_prefix: u32,
    /// Offset table set, `0..9`.
    pub pack_mode: u8,
    /// Initial shift register value.
    pub shift_seed: u8,
}

impl Header {
    /// Parse the header at the start of `data`.
    ///
    /// Fails with [`DecodeError::NotRecognized`] when `data` is shorter than
    /// the header or the magic does not match. Field values are not
    /// validated here; see [`Header::validate`].
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let Some(raw) = data.first_chunk::<HEADER_SIZE>() else {
            return Err(DecodeError::NotRecognized);
        };
        if be_u32(raw, 0) != MAGIC {
            return Err(DecodeError::NotRecognized);
        }
        Ok(Self {
            full_length: be_u32(raw, 4),
            packed_length: be_u32(raw, 8),
            unpacked_prefix: be_u32(raw, 12),
            pack_mode: raw[16],
            shift_seed: raw[17],
        })
    }

    /// Serialise the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&MAGIC.to_be_bytes());
        out[4..8].copy_from_slice(&self.full_length.to_be_bytes());
        out[8..12].copy_from_slice(&self.packed_length.to_be_bytes());
        out[12..16].copy_from_slice(&self.unpacked_prefix.to_be_bytes());
        out[16] = self.pack_mode;
        out[17] = self.shift_seed;
        out
    }

    /// Check the fields against a container of `container_len` bytes.
    pub fn validate(&self, container_len: usize, max_full_length: usize) -> Result<(), DecodeError> {
        if usize::from(self.pack_mode) >= PACK_MODES {
            return Err(DecodeError::InvalidHeader(format!(
                "pack mode {} out of range 0..{PACK_MODES}",
                self.pack_mode
            )));
        }
        let packed = self.packed_length as usize;
        if packed > container_len {
            return Err(DecodeError::InvalidHeader(format!(
                "packed length {packed} exceeds container size {container_len}"
            )));
        }
        let full = self.full_length as usize;
        if full > max_full_length {
            return Err(DecodeError::LengthLimit {
                declared: full,
                limit: max_full_length,
            });
        }
        if full < container_len {
            return Err(DecodeError::InvalidHeader(format!(
                "unpacked length {full} is shorter than the {container_len} byte container"
            )));
        }
        Ok(())
    }

    /// Number of payload bytes the packer moved under the header.
    #[inline]
    pub fn relocated_len(&self) -> usize {
        (self.packed_length as usize).min(HEADER_SIZE)
    }
}

#[inline]
fn be_u32(raw: &[u8; HEADER_SIZE], at: usize) -> u32 {
    u32::from_be_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

/// Unpacked size of a DHp2 container, or `None` if `data` is not one.
pub fn unpacked_size(data: &[u8]) -> Option<usize> {
    Header::parse(data).ok().map(|h| h.full_length as usize)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
