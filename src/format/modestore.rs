// Escape-coded integer fields of the DHp2 bitstream.
//
// A modestore value is a 1- or 2-bit tier prefix followed by a field whose
// width comes from a `ModestoreRow`:
//
//   1  + small bits   -> [0, 2^S)
//   01 + medium bits  -> [2^S, 2^S + 2^M)
//   00 + large bits   -> [2^S + 2^M, 2^S + 2^M + 2^L)
//
// The same reader serves back-reference offsets and literal-run lengths.
// Compression types use a plain unary prefix capped at MAX_COMPRESSION_TYPE.

use super::bit_cursor::BitCursor;
use super::code_table::{
    COMPRESSION_TYPES, CompressionType, MAX_COMPRESSION_TYPE, ModestoreRow, Tier,
};
use super::decoder::DecodeError;

/// Read the tier prefix of a modestore value.
#[inline]
pub fn read_tier(cursor: &mut BitCursor, buf: &[u8]) -> Result<Tier, DecodeError> {
    if cursor.read_bit(buf)? == 1 {
        return Ok(Tier::Small);
    }
    if cursor.read_bit(buf)? == 1 {
        Ok(Tier::Medium)
    } else {
        Ok(Tier::Large)
    }
}

/// Read one modestore value using `row`.
#[inline]
pub fn read_modestore(
    cursor: &mut BitCursor,
    buf: &[u8],
    row: &ModestoreRow,
) -> Result<u32, DecodeError> {
    let tier = read_tier(cursor, buf)?;
    let field = cursor.read_bits(buf, row.width(tier))?;
    Ok(field + row.base(tier))
}

/// Count leading zero bits up to `MAX_COMPRESSION_TYPE`.
///
/// The last entry has no terminating one: after five zeros no further bit
/// is consumed.
#[inline]
pub fn read_compression_index(cursor: &mut BitCursor, buf: &[u8]) -> Result<usize, DecodeError> {
    let mut index = 0;
    while index != MAX_COMPRESSION_TYPE && cursor.read_bit(buf)? == 0 {
        index += 1;
    }
    Ok(index)
}

/// Read a compression type and its extra length bits.
///
/// Returns the copy length together with the selected table entry.
#[inline]
pub fn read_copy_length(
    cursor: &mut BitCursor,
    buf: &[u8],
) -> Result<(u32, &'static CompressionType), DecodeError> {
    let ctype = &COMPRESSION_TYPES[read_compression_index(cursor, buf)?];
    let length = u32::from(ctype.base) + cursor.read_bits(buf, ctype.extra_bits)?;
    Ok((length, ctype))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
