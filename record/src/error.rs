/*!
This module defines the primary error type for the `record` crate.

Decoding does not recover internally: the first failure aborts the parse
and surfaces here. Decode errors are deterministic for a given input, so
callers should not retry them.
*/

use thiserror::Error;

/// The primary error type for record decoding.
#[derive(Error, Debug)]
pub enum Error {
    /// A read ran past the end of the remaining input.
    #[error("Need {need} bytes but only {have} remain")]
    Truncated { need: usize, have: usize },

    /// The stored checksum disagrees with the checksum of the bytes that follow it.
    #[error("Stored checksum {stored} does not match computed {computed}")]
    InvalidChecksum { stored: u32, computed: u32 },

    /// The compression flag byte is neither 16 (plain) nor 24 (zlib).
    #[error("Invalid compression flag {0}")]
    InvalidCompressionFlag(u8),

    /// zlib inflation of the record body failed.
    #[error("Failed to decompress record body")]
    DecompressionFailed(#[source] std::io::Error),

    /// The object magic byte is not the expected sentinel.
    #[error("Invalid object magic byte {0}")]
    InvalidMagic(u8),

    /// The object version is not the supported v1 format.
    #[error("Unsupported object version {0}")]
    UnsupportedVersion(u8),

    /// The record carries more than one sibling; carries the observed count.
    #[error("Record has {0} siblings, only 1 is supported")]
    TooManySiblings(u32),

    /// Input remained after the record was fully parsed.
    #[error("{0} bytes of additional data after record")]
    TrailingBytes(usize),

    /// Metadata entries ran past the declared block length.
    #[error("Metadata entries overran the declared block length by {0} bytes")]
    MetadataOverrun(usize),

    /// A non-binary payload failed to decode as an Erlang term.
    #[error(transparent)]
    InvalidTerm(#[from] replsink_eterm::decode::Error),

    /// A vector clock term decoded, but not to a list of actor entries.
    #[error("Invalid vector clock structure: {0}")]
    InvalidVectorClocks(&'static str),

    /// An unrecognized vector clock output format name.
    #[error("Invalid vector clock format {0:?}")]
    InvalidFormat(String),
}
