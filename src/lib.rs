//! dhp2: decoder for DHp2 packed containers.
//!
//! A DHp2 file is an 18-byte header followed by a backward LZ stream that
//! unpacks in place: the same buffer holds the packed input and, once
//! decoding finishes, the unpacked output.
//!
//! The crate provides:
//! - The format engine (`format`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use dhp2::format;
//!
//! let data = std::fs::read("level1.bin").unwrap();
//! match format::unpacked_size(&data) {
//!     Some(size) => {
//!         let unpacked = format::unpack(&data).unwrap();
//!         assert_eq!(unpacked.len(), size);
//!     }
//!     None => println!("not packed"),
//! }
//! ```

pub mod format;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
