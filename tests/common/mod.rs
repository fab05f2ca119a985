// Test-only DHp2 container builder.
//
// `StreamBuilder` lays out bits and literal bytes in the order the decoder
// consumes them, and `Packer` drives it with a naive greedy match finder.
// Both exist to produce fixtures; neither is tuned for ratio or speed.

#![allow(dead_code)]

use dhp2::format::code_table::{
    COMPRESSION_TYPES, MAX_COMPRESSION_TYPE, MAX_COPY_LENGTH, ModestoreRow, Tier, offset_row,
    unpacked_row,
};
use dhp2::format::{HEADER_SIZE, Header};

/// Shift seed every builder container starts with.
pub const SEED: u8 = 0x80;

// ---------------------------------------------------------------------------
// Bit layout
// ---------------------------------------------------------------------------

/// Units (bit bytes and literal bytes) in consumption order.
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    units: Vec<u8>,
    bit_unit: usize,
    bits_used: u8,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            bit_unit: 0,
            bits_used: 8,
        }
    }

    /// Units consumed so far, counting a partly used bit byte.
    pub fn consumed(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[u8] {
        &self.units
    }

    pub fn bit(&mut self, set: bool) {
        if self.bits_used == 8 {
            self.units.push(0);
            self.bit_unit = self.units.len() - 1;
            self.bits_used = 0;
        }
        if set {
            self.units[self.bit_unit] |= 0x80 >> self.bits_used;
        }
        self.bits_used += 1;
    }

    /// `count` bits of `value`, most significant first.
    pub fn bits(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.bit((value >> i) & 1 == 1);
        }
    }

    /// A bit pattern written as text, e.g. `"0 1101"`.
    pub fn pattern(&mut self, bits: &str) {
        for c in bits.chars().filter(|c| !c.is_whitespace()) {
            self.bit(c == '1');
        }
    }

    pub fn literal(&mut self, byte: u8) {
        self.units.push(byte);
    }

    pub fn modestore(&mut self, row: &ModestoreRow, value: u32) {
        let tier = row
            .tier_of(value)
            .unwrap_or_else(|| panic!("{value} does not fit {row:?}"));
        match tier {
            Tier::Small => self.pattern("1"),
            Tier::Medium => self.pattern("01"),
            Tier::Large => self.pattern("00"),
        }
        self.bits(value - row.base(tier), row.width(tier));
    }

    /// Emit the compression type and extra bits for `length`; returns the kind.
    pub fn copy_length(&mut self, length: u32) -> u8 {
        let (index, ctype) = COMPRESSION_TYPES
            .iter()
            .enumerate()
            .find(|(_, c)| c.lengths().contains(&length))
            .unwrap_or_else(|| panic!("copy length {length} out of range"));
        for _ in 0..index {
            self.bit(false);
        }
        if index != MAX_COMPRESSION_TYPE {
            self.bit(true);
        }
        self.bits(length - u32::from(ctype.base), ctype.extra_bits);
        ctype.kind
    }
}

/// Kind selected by a copy of `length` bytes.
pub fn kind_of(length: u32) -> u8 {
    COMPRESSION_TYPES
        .iter()
        .find(|c| c.lengths().contains(&length))
        .map(|c| c.kind)
        .unwrap_or_else(|| panic!("copy length {length} out of range"))
}

// ---------------------------------------------------------------------------
// Container assembly
// ---------------------------------------------------------------------------

/// Lay out `units` as a container.
///
/// The payload is the reversed unit list, padded to the header size when
/// shorter. Its first `HEADER_SIZE` bytes move to the end of the file, where
/// the decoder's relocation step picks them up.
pub fn assemble(units: &[u8], full_length: u32, unpacked_prefix: u32, pack_mode: u8) -> Vec<u8> {
    let mut payload: Vec<u8> = units.iter().rev().copied().collect();
    if payload.len() < HEADER_SIZE {
        let pad = HEADER_SIZE - payload.len();
        payload.splice(0..0, std::iter::repeat_n(0xEE, pad));
    }
    let header = Header {
        full_length,
        packed_length: (payload.len() + HEADER_SIZE) as u32,
        unpacked_prefix,
        pack_mode,
        shift_seed: SEED,
    };
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(&payload[HEADER_SIZE..]);
    out.extend_from_slice(&payload[..HEADER_SIZE]);
    out
}

/// Size of the container `assemble` produces for `units` units.
pub fn container_len(units: usize) -> usize {
    units.max(HEADER_SIZE) + HEADER_SIZE
}

// ---------------------------------------------------------------------------
// Greedy packer
// ---------------------------------------------------------------------------

/// One back-reference plus the literal run after it, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub length: u32,
    /// Distance back into already produced output (at least 1).
    pub distance: u32,
    pub literals: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Packer {
    pub pack_mode: u8,
    /// Shortest match worth a back-reference (2..=5).
    pub min_match: u32,
    /// Largest distance searched.
    pub window: u32,
}

impl Default for Packer {
    fn default() -> Self {
        Self {
            pack_mode: 0,
            min_match: 5,
            window: 256,
        }
    }
}

impl Packer {
    pub fn with_mode(pack_mode: u8) -> Self {
        Self {
            pack_mode,
            ..Self::default()
        }
    }

    /// Pack `data`, or `None` when the greedy parse cannot produce a
    /// container that unpacks in place (too little compression, or a literal
    /// run longer than its row allows).
    pub fn pack(&self, data: &[u8]) -> Option<Vec<u8>> {
        let (prefix, steps) = self.parse(data)?;
        encode(data, prefix, &steps, self.pack_mode)
    }

    /// Greedy parse of `data` into a literal prefix and steps.
    ///
    /// The decoder produces output from the end, so matching runs over the
    /// reversed input.
    pub fn parse(&self, data: &[u8]) -> Option<(u32, Vec<Step>)> {
        let rev: Vec<u8> = data.iter().rev().copied().collect();
        let mut prefix = None;
        let mut steps = Vec::new();
        let mut pending: Option<(u32, u32)> = None;
        let mut lit_start = 0;
        let mut i = 0;

        while i < rev.len() {
            let Some((length, distance)) = self.find_match(&rev, i) else {
                i += 1;
                continue;
            };
            let literals = (i - lit_start) as u32;
            match pending {
                None => prefix = Some(literals),
                Some((len, dist)) => steps.push(close_step(len, dist, literals)?),
            }
            pending = Some((length, distance));
            i += length as usize;
            lit_start = i;
        }

        let literals = (rev.len() - lit_start) as u32;
        match pending {
            None => prefix = Some(literals),
            Some((len, dist)) => steps.push(close_step(len, dist, literals)?),
        }
        Some((prefix.unwrap_or(0), steps))
    }

    fn find_match(&self, rev: &[u8], i: usize) -> Option<(u32, u32)> {
        let max_len = (rev.len() - i).min(MAX_COPY_LENGTH as usize);
        let mut best: Option<(u32, u32)> = None;
        for d in 1..=i.min(self.window as usize) {
            let mut len = 0;
            while len < max_len && rev[i + len] == rev[i + len - d] {
                len += 1;
            }
            let len = len as u32;
            if len < self.min_match || best.is_some_and(|(l, _)| l >= len) {
                continue;
            }
            let row = offset_row(self.pack_mode, kind_of(len))?;
            if d as u32 - 1 <= row.max_value() {
                best = Some((len, d as u32));
            }
        }
        best
    }
}

fn close_step(length: u32, distance: u32, literals: u32) -> Option<Step> {
    (literals <= unpacked_row(kind_of(length)).max_value()).then_some(Step {
        length,
        distance,
        literals,
    })
}

/// Emit a parsed stream and assemble the container.
///
/// Returns `None` if some write would land on a packed byte the decoder has
/// not read yet.
pub fn encode(data: &[u8], prefix: u32, steps: &[Step], pack_mode: u8) -> Option<Vec<u8>> {
    let rev: Vec<u8> = data.iter().rev().copied().collect();
    let mut b = StreamBuilder::new();
    let mut written: usize = 0;
    // Largest (write index - units consumed) seen at any write.
    let mut worst: isize = isize::MIN;

    emit_literals(&mut b, &rev, &mut written, &mut worst, prefix);
    for step in steps {
        let kind = b.copy_length(step.length);
        b.modestore(offset_row(pack_mode, kind)?, step.distance - 1);
        b.modestore(unpacked_row(kind), step.literals);
        written += step.length as usize;
        let last_write = written as isize - 1;
        worst = worst.max(last_write - b.consumed() as isize);
        emit_literals(&mut b, &rev, &mut written, &mut worst, step.literals);
    }
    assert_eq!(written, data.len(), "parse does not cover the input");

    let payload_len = b.consumed().max(HEADER_SIZE);
    let fits = container_len(b.consumed()) <= data.len()
        && worst < data.len() as isize - payload_len as isize;
    fits.then(|| assemble(b.units(), data.len() as u32, prefix, pack_mode))
}

fn emit_literals(
    b: &mut StreamBuilder,
    rev: &[u8],
    written: &mut usize,
    worst: &mut isize,
    count: u32,
) {
    for _ in 0..count {
        b.literal(rev[*written]);
        *worst = (*worst).max(*written as isize - b.consumed() as isize);
        *written += 1;
    }
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

/// The data a stream of `prefix` literals and `steps` unpacks to.
///
/// Literal bytes come from a fixed byte sequence; copies are played out in
/// decode order, so overlapping distances repeat.
pub fn render(prefix: u32, steps: &[Step]) -> Vec<u8> {
    let mut rev = Vec::new();
    let mut next: u8 = 1;
    let mut literals = |rev: &mut Vec<u8>, count: u32| {
        for _ in 0..count {
            rev.push(next);
            next = next.wrapping_mul(37).wrapping_add(11);
        }
    };

    literals(&mut rev, prefix);
    for step in steps {
        for _ in 0..step.length {
            let byte = rev[rev.len() - step.distance as usize];
            rev.push(byte);
        }
        literals(&mut rev, step.literals);
    }
    rev.reverse();
    rev
}

/// A long trailing run that gives hand-built streams room to unpack in place.
pub fn runway(count: usize) -> impl Iterator<Item = Step> {
    std::iter::repeat_n(
        Step {
            length: MAX_COPY_LENGTH,
            distance: 1,
            literals: 0,
        },
        count,
    )
}

/// Text-like data with plenty of repeats.
pub fn sample_text(len: usize) -> Vec<u8> {
    const WORDS: [&[u8]; 8] = [
        b"level ", b"tile ", b"sprite ", b"palette ", b"map ", b"enemy ", b"door ", b"key ",
    ];
    let mut out = Vec::with_capacity(len);
    let mut state: u32 = 0x2545_F491;
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        out.extend_from_slice(WORDS[(state % 8) as usize]);
    }
    out.truncate(len);
    out
}
