// File-level helpers for unpacking DHp2 containers.
//
// `unpack_file()` reads a file, unpacks it if it is a DHp2 container and
// writes the result back (in place by default). `verify_files()` decodes
// against a known-good unpacked file, and `unpack_batch()` runs many files,
// in parallel when the `parallel` feature is on. SHA-256 digests of the
// output are computed behind the `file-io` feature.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

#[cfg(feature = "file-io")]
use sha2::{Digest, Sha256};

use crate::format::{DecodeError, DecodeOptions, Header, NoTrace, Token, TokenCounter, TokenSink};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics for one unpacked container.
#[derive(Debug, Clone)]
pub struct UnpackStats {
    /// Container size on disk.
    pub packed_size: u64,
    /// Size after unpacking.
    pub unpacked_size: u64,
    /// Offset table set declared by the header.
    pub pack_mode: u8,
    /// Literal runs and back-references executed.
    pub tokens: TokenCounter,
    /// SHA-256 of the unpacked output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

impl UnpackStats {
    /// Unpacked size divided by packed size.
    pub fn ratio(&self) -> f64 {
        if self.packed_size == 0 {
            return 0.0;
        }
        self.unpacked_size as f64 / self.packed_size as f64
    }
}

/// Result of running one file through the unpacker.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// The file is not a DHp2 container and was left alone.
    NotPacked { size: u64 },
    /// The file was unpacked.
    Unpacked(UnpackStats),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The container failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Where unpacked output goes.
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    /// Overwrite the input file.
    InPlace,
    /// Write to another path.
    Path(&'a Path),
    /// Decode only; nothing is written.
    Discard,
}

// Counts tokens for the stats while forwarding them to a caller's sink.
struct Tally<'s, S> {
    counter: TokenCounter,
    inner: &'s mut S,
}

impl<S: TokenSink> TokenSink for Tally<'_, S> {
    fn token(&mut self, token: &Token) {
        self.counter.token(token);
        self.inner.token(token);
    }
}

// ---------------------------------------------------------------------------
// unpack_file
// ---------------------------------------------------------------------------

/// Unpack `input` if it is a DHp2 container, writing to `dest`.
///
/// Files without the DHp2 magic are reported as [`FileOutcome::NotPacked`]
/// and never written. When writing in place the input is only replaced after
/// decoding succeeds.
pub fn unpack_file(input: &Path, dest: Destination<'_>) -> Result<FileOutcome, IoError> {
    unpack_file_traced(input, dest, &mut NoTrace)
}

/// Like [`unpack_file`], forwarding every decoded token to `sink`.
pub fn unpack_file_traced<S: TokenSink>(
    input: &Path,
    dest: Destination<'_>,
    sink: &mut S,
) -> Result<FileOutcome, IoError> {
    let mut buf = std::fs::read(input)?;
    let packed_size = buf.len() as u64;

    let mut tally = Tally {
        counter: TokenCounter::default(),
        inner: sink,
    };
    let header = match crate::format::unpack_with(&mut buf, &DecodeOptions::default(), &mut tally)
    {
        Ok(h) => h,
        Err(DecodeError::NotRecognized) => {
            debug!("{}: not a DHp2 container", input.display());
            return Ok(FileOutcome::NotPacked { size: packed_size });
        }
        Err(e) => return Err(e.into()),
    };

    match dest {
        Destination::InPlace => write_output(input, &buf)?,
        Destination::Path(path) => write_output(path, &buf)?,
        Destination::Discard => {}
    }

    let stats = build_stats(packed_size, &header, tally.counter, &buf);
    info!(
        "{}: unpacked {} -> {} bytes (mode {}, {} tokens)",
        input.display(),
        stats.packed_size,
        stats.unpacked_size,
        stats.pack_mode,
        stats.tokens.tokens()
    );
    Ok(FileOutcome::Unpacked(stats))
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}

fn build_stats(packed_size: u64, header: &Header, tokens: TokenCounter, output: &[u8]) -> UnpackStats {
    #[cfg(feature = "file-io")]
    let output_sha256: Option<[u8; 32]> = Some(Sha256::digest(output).into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = {
        let _ = output;
        None
    };

    UnpackStats {
        packed_size,
        unpacked_size: u64::from(header.full_length),
        pack_mode: header.pack_mode,
        tokens,
        output_sha256,
    }
}

// ---------------------------------------------------------------------------
// verify_files
// ---------------------------------------------------------------------------

/// Unpack `packed` while checking each byte against the file `expected`.
///
/// Nothing is written. A file without the DHp2 magic is an error here.
pub fn verify_files(packed: &Path, expected: &Path) -> Result<UnpackStats, IoError> {
    let mut buf = std::fs::read(packed)?;
    let packed_size = buf.len() as u64;
    let reference = std::fs::read(expected)?;

    let mut counter = TokenCounter::default();
    let header = crate::format::unpack_with(
        &mut buf,
        &DecodeOptions::verify_against(&reference),
        &mut counter,
    )
    .inspect_err(|e| warn!("{}: verification failed: {e}", packed.display()))?;

    debug!(
        "{}: verified {} bytes against {}",
        packed.display(),
        buf.len(),
        expected.display()
    );
    Ok(build_stats(packed_size, &header, counter, &buf))
}

// ---------------------------------------------------------------------------
// unpack_batch
// ---------------------------------------------------------------------------

/// Unpack many files.
///
/// With `output_dir` set, each output keeps its input's file name inside
/// that directory; otherwise inputs are overwritten. Results come back in
/// input order. One failing file does not stop the others.
pub fn unpack_batch(
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
) -> Vec<(PathBuf, Result<FileOutcome, IoError>)> {
    let run = |input: &PathBuf| {
        let result = match output_dir {
            Some(dir) => match input.file_name() {
                Some(name) => unpack_file(input, Destination::Path(&dir.join(name))),
                None => Err(IoError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", input.display()),
                ))),
            },
            None => unpack_file(input, Destination::InPlace),
        };
        (input.clone(), result)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs.par_iter().map(run).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(run).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
