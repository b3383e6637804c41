//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Broad classification of an [`Error`], stable enough to branch on
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Reading or writing the underlying buffer failed
    Io,
    /// The bundle violates one of its structural invariants
    Structural,
    /// A compressed stream could not be inflated or deflated
    Compression,
    /// A reference inside the data does not resolve
    Integrity,
    /// The caller asked for something the bundle cannot provide
    InvalidInput,
}

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    #[diagnostic(code(bnd_bundle::io))]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    #[diagnostic(code(bnd_bundle::binrw))]
    BinRWError(#[from] binrw::Error),

    /// bundle does not start with the `bnd2` tag
    #[error("invalid bundle magic {found:02X?}, expected \"bnd2\"")]
    #[diagnostic(code(bnd_bundle::invalid_magic))]
    InvalidMagic { found: [u8; 4] },

    /// bundle version is not 2
    #[error("unsupported bundle version {found}")]
    #[diagnostic(code(bnd_bundle::unsupported_version))]
    UnsupportedVersion { found: u32 },

    /// platform field is outside 1..=3
    #[error("unknown platform {found}")]
    #[diagnostic(code(bnd_bundle::invalid_platform))]
    InvalidPlatform { found: u32 },

    /// entry count is larger than the configured sanity limit
    #[error("resource entry count {count} exceeds the sanity limit of {limit}")]
    #[diagnostic(
        code(bnd_bundle::entry_count),
        help("some shipped bundles exceed this limit, parse leniently to continue")
    )]
    EntryCountTooLarge { count: u32, limit: u32 },

    /// a structure lies partially or entirely outside of the buffer
    #[error("{what} at {offset:#x} (+{length:#x}) lies outside the {buffer_len:#x} byte buffer")]
    #[diagnostic(code(bnd_bundle::out_of_bounds))]
    OutOfBounds {
        what: &'static str,
        entry: Option<usize>,
        offset: u64,
        length: u64,
        buffer_len: usize,
    },

    /// a structure does not start on its required alignment
    #[error("{what} at {offset:#x} is not aligned to {alignment:#x}")]
    #[diagnostic(code(bnd_bundle::misaligned))]
    Misaligned {
        what: &'static str,
        entry: Option<usize>,
        offset: u64,
        alignment: u64,
    },

    /// two directory entries share a resource id
    #[error("duplicate resource id {id:#018x} at entry {entry}")]
    #[diagnostic(code(bnd_bundle::duplicate_id))]
    DuplicateResourceId { id: u64, entry: usize },

    /// two resources claim the same bytes
    #[error("resource data of entries {first} and {second} overlaps at {offset:#x}")]
    #[diagnostic(code(bnd_bundle::overlap))]
    OverlappingResources {
        offset: u64,
        first: usize,
        second: usize,
    },

    /// the zlib stream is malformed
    #[error("malformed zlib stream of {length:#x} bytes")]
    #[diagnostic(code(bnd_bundle::decompression))]
    Decompression {
        length: usize,
        #[source]
        source: std::io::Error,
    },

    /// a payload no longer fits into the 28 bit size field
    #[error("payload of {size:#x} bytes for entry {entry} does not fit a 28 bit size field")]
    #[diagnostic(code(bnd_bundle::size_overflow))]
    SizeOverflow { entry: usize, size: u64 },

    /// no resource with this id exists
    #[error("no resource with id {id:#018x}")]
    #[diagnostic(code(bnd_bundle::unknown_resource))]
    UnknownResource { id: u64 },

    /// the resource has no data region that could be replaced
    #[error("resource {id:#018x} has no data region")]
    #[diagnostic(code(bnd_bundle::empty_resource))]
    EmptyResource { id: u64 },

    /// {0}
    #[error("{0}")]
    #[diagnostic(code(bnd_bundle::custom))]
    CustomError(String),
}

impl Error {
    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::IOError(_) | Error::BinRWError(_) => ErrorCategory::Io,
            Error::InvalidMagic { .. }
            | Error::UnsupportedVersion { .. }
            | Error::InvalidPlatform { .. }
            | Error::EntryCountTooLarge { .. }
            | Error::OutOfBounds { .. }
            | Error::Misaligned { .. }
            | Error::DuplicateResourceId { .. }
            | Error::OverlappingResources { .. }
            | Error::SizeOverflow { .. } => ErrorCategory::Structural,
            Error::Decompression { .. } => ErrorCategory::Compression,
            Error::UnknownResource { .. } | Error::EmptyResource { .. } | Error::CustomError(_) => {
                ErrorCategory::InvalidInput
            }
        }
    }

    /// Directory index of the entry this error refers to, if any
    pub fn entry(&self) -> Option<usize> {
        match self {
            Error::OutOfBounds { entry, .. } | Error::Misaligned { entry, .. } => *entry,
            Error::DuplicateResourceId { entry, .. } | Error::SizeOverflow { entry, .. } => {
                Some(*entry)
            }
            Error::OverlappingResources { second, .. } => Some(*second),
            _ => None,
        }
    }

    /// Machine readable diagnostic code, e.g. `bnd_bundle::invalid_magic`
    pub fn code_str(&self) -> String {
        self.code().map(|c| c.to_string()).unwrap_or_default()
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
