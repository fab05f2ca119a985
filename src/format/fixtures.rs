// Hand-assembled containers shared by unit tests.

use super::bit_cursor::SHIFT_RELOAD;
use super::header::{HEADER_SIZE, Header};

/// Lay out `units` (in consumption order) as a pack mode 0 container.
///
/// Payloads shorter than the header are padded at the low end with bytes
/// the decoder never reaches.
pub(crate) fn pack(units: &[u8], full_length: u32, unpacked_prefix: u32) -> Vec<u8> {
    let mut payload: Vec<u8> = units.iter().rev().copied().collect();
    if payload.len() < HEADER_SIZE {
        let pad = HEADER_SIZE - payload.len();
        payload.splice(0..0, std::iter::repeat_n(0xEE, pad));
    }
    let header = Header {
        full_length,
        packed_length: (payload.len() + HEADER_SIZE) as u32,
        unpacked_prefix,
        pack_mode: 0,
        shift_seed: SHIFT_RELOAD,
    };
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(&payload[HEADER_SIZE..]);
    out.extend_from_slice(&payload[..HEADER_SIZE]);
    out
}

/// One literal 'A', then a 39-byte copy at offset 0 with no literals:
/// bits `00000 00011001 | 1 00000 | 1 0`.
pub(crate) const RUN_UNITS: [u8; 4] = [b'A', 0x00, 0xCC, 0x10];

/// Container that unpacks to 40 bytes of 'A'.
pub(crate) fn run_container() -> Vec<u8> {
    pack(&RUN_UNITS, 40, 1)
}
