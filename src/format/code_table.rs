// DHp2 static code tables.
//
// Three tables drive the bitstream:
//   - OFFSET_MODESTORES: back-reference offset widths, one row set per pack mode
//   - UNPACKED_MODESTORE: widths for the literal run that follows each copy
//   - COMPRESSION_TYPES: copy length base/extra bits and the modestore kind

use std::ops::Range;

/// Number of pack modes a header may select (`0..PACK_MODES`).
pub const PACK_MODES: usize = 9;

/// Number of modestore kinds (rows per table).
pub const KINDS: usize = 4;

/// Index of the catch-all compression type (five zero bits, no terminating one).
pub const MAX_COMPRESSION_TYPE: usize = COMPRESSION_TYPES.len() - 1;

// ---------------------------------------------------------------------------
// Modestore rows
// ---------------------------------------------------------------------------

/// Which of the three escape-coded fields a modestore value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Prefix `1`, `small` bits follow.
    Small,
    /// Prefix `01`, `medium` bits follow.
    Medium,
    /// Prefix `00`, `large` bits follow.
    Large,
}

/// Bit widths of the small/medium/large fields of one modestore row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModestoreRow {
    pub small: u8,
    pub medium: u8,
    pub large: u8,
}

impl ModestoreRow {
    pub const fn new(small: u8, medium: u8, large: u8) -> Self {
        Self {
            small,
            medium,
            large,
        }
    }

    /// Bit width of the field selected by `tier`.
    #[inline]
    pub const fn width(&self, tier: Tier) -> u8 {
        match tier {
            Tier::Small => self.small,
            Tier::Medium => self.medium,
            Tier::Large => self.large,
        }
    }

    /// Value added to the field read for `tier`.
    #[inline]
    pub const fn base(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Small => 0,
            Tier::Medium => 1 << self.small,
            Tier::Large => (1 << self.small) + (1 << self.medium),
        }
    }

    /// Values reachable through `tier`.
    pub const fn range(&self, tier: Tier) -> Range<u32> {
        let base = self.base(tier);
        base..base + (1 << self.width(tier))
    }

    /// Largest value this row can encode.
    pub const fn max_value(&self) -> u32 {
        self.range(Tier::Large).end - 1
    }

    /// The tier a value of this row is encoded in, if it is representable.
    pub fn tier_of(&self, value: u32) -> Option<Tier> {
        [Tier::Small, Tier::Medium, Tier::Large]
            .into_iter()
            .find(|&tier| self.range(tier).contains(&value))
    }
}

const fn row(small: u8, medium: u8, large: u8) -> ModestoreRow {
    ModestoreRow::new(small, medium, large)
}

/// Offset widths, indexed `[pack_mode][kind]`.
pub const OFFSET_MODESTORES: [[ModestoreRow; KINDS]; PACK_MODES] = [
    [row(5, 5, 6), row(5, 5, 6), row(5, 5, 6), row(5, 5, 6)],
    // Mode 1 is the only set whose medium width shrinks for the higher kinds.
    [row(5, 6, 7), row(6, 6, 7), row(7, 6, 6), row(7, 6, 6)],
    [row(5, 7, 8), row(6, 7, 8), row(7, 7, 8), row(7, 7, 8)],
    [row(5, 7, 8), row(6, 7, 9), row(7, 8, 9), row(8, 8, 9)],
    [row(6, 7, 8), row(7, 8, 9), row(7, 9, 10), row(8, 9, 10)],
    [row(6, 7, 8), row(7, 9, 10), row(7, 9, 11), row(8, 10, 11)],
    [row(6, 7, 8), row(7, 9, 10), row(7, 9, 12), row(8, 10, 12)],
    [row(6, 7, 8), row(7, 9, 11), row(7, 10, 12), row(8, 10, 13)],
    [row(6, 7, 8), row(7, 9, 11), row(7, 10, 13), row(8, 11, 14)],
];

/// Widths for the literal run following a back-reference, indexed by kind.
pub const UNPACKED_MODESTORE: [ModestoreRow; KINDS] =
    [row(1, 2, 4), row(1, 3, 5), row(1, 3, 7), row(1, 4, 14)];

/// Offset row for `(pack_mode, kind)`.
///
/// Returns `None` when `pack_mode` is out of range; `kind` always comes from
/// [`COMPRESSION_TYPES`] and is therefore in range.
#[inline]
pub fn offset_row(pack_mode: u8, kind: u8) -> Option<&'static ModestoreRow> {
    OFFSET_MODESTORES
        .get(pack_mode as usize)
        .and_then(|rows| rows.get(kind as usize))
}

/// Literal-run row for `kind`.
#[inline]
pub fn unpacked_row(kind: u8) -> &'static ModestoreRow {
    &UNPACKED_MODESTORE[kind as usize % KINDS]
}

// ---------------------------------------------------------------------------
// Compression types
// ---------------------------------------------------------------------------

/// One entry of the compression-type table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionType {
    /// Minimum copy length.
    pub base: u16,
    /// Extra bits added to `base`.
    pub extra_bits: u8,
    /// Modestore row used for the offset and the following literal run.
    pub kind: u8,
}

impl CompressionType {
    /// Copy lengths this entry can express.
    pub const fn lengths(&self) -> Range<u32> {
        let base = self.base as u32;
        base..base + (1 << self.extra_bits)
    }
}

const fn ctype(base: u16, extra_bits: u8, kind: u8) -> CompressionType {
    CompressionType {
        base,
        extra_bits,
        kind,
    }
}

/// Compression types, selected by the number of leading zero bits.
///
/// | idx | code            | length  |
/// |-----|-----------------|---------|
/// | 0   | `1`             | 2       |
/// | 1   | `01`            | 3       |
/// | 2   | `001`           | 4       |
/// | 3   | `0001`          | 5       |
/// | 4   | `00001xxx`      | 6-13    |
/// | 5   | `00000xxxxxxxx` | 14-269  |
pub const COMPRESSION_TYPES: [CompressionType; 6] = [
    ctype(2, 0, 0),
    ctype(3, 0, 1),
    ctype(4, 0, 2),
    ctype(5, 0, 3),
    ctype(6, 3, 3),
    ctype(14, 8, 3),
];

/// Shortest and longest copy a single token can express.
pub const MIN_COPY_LENGTH: u32 = COMPRESSION_TYPES[0].base as u32;
pub const MAX_COPY_LENGTH: u32 = COMPRESSION_TYPES[MAX_COMPRESSION_TYPE].lengths().end - 1;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
