use std::path::PathBuf;

use thiserror::Error;

/// All errors raised while reading, writing or converting FITS data.
///
/// Validation problems are not errors: they are collected as diagnostics by
/// [`crate::validation::Checker`].
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The requested file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// Malformed FITS header block.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(String),
    /// Premature end of data while reading.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// NAXIS outside of the range allowed by the standard.
    #[error("invalid NAXIS value: {0} (expected 0..=999)")]
    InvalidNaxis(i64),
    /// Malformed keyword name in a header card.
    #[error("invalid keyword name: {0:?}")]
    InvalidKeyword(String),
    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(String),
    /// A runtime type with no FITS cell type.
    #[error("unsupported cell type: {0}")]
    UnsupportedType(&'static str),
    /// A unit token matching none of the known units.
    #[error("unsupported unit: {0:?}")]
    UnsupportedUnit(String),
    /// A unit conversion outside of the allowed one-hop graph.
    #[error("illegal unit conversion from {from} to {to}")]
    IllegalConversion { from: String, to: String },
    /// Nothing to write.
    #[error("no image data: {0}")]
    NoImageData(String),
    /// Corrupt gzip stream.
    #[error("decompression failed: {0}")]
    Decompress(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
