// DHp2 container format.
//
// # Modules
//
// - `header`      18-byte header, magic and detection
// - `code_table`  offset/literal modestore rows and compression types
// - `bit_cursor`  backward bit and byte reader
// - `modestore`   escape-coded integer and compression-type decoding
// - `writer`      backward output writer with optional verification
// - `decoder`     header relocation and the token loop

pub mod bit_cursor;
pub mod code_table;
pub mod decoder;
pub mod header;
pub mod modestore;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key types for convenience.
pub use bit_cursor::BitCursor;
pub use code_table::{CompressionType, ModestoreRow, Tier};
pub use decoder::{
    DecodeError, DecodeOptions, NoTrace, Token, TokenCounter, TokenSink, unpack, unpack_in_place,
    unpack_verified, unpack_with,
};
pub use header::{HEADER_SIZE, Header, MAGIC, unpacked_size};
pub use writer::OutputWriter;
