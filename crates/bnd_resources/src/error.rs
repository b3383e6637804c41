//! Error types that can be emitted from this library

use bnd_bundle::error::ErrorCategory;
use bnd_bundle::ResourceType;
use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    #[diagnostic(code(bnd_resources::io))]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    #[diagnostic(code(bnd_resources::binrw))]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`bnd_bundle::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bundle(#[from] bnd_bundle::error::Error),

    /// string cannot be represented as a packed identifier
    #[error("cannot encode {value:?} as an identifier: {reason}")]
    #[diagnostic(code(bnd_resources::invalid_identifier))]
    InvalidIdentifier { value: String, reason: &'static str },

    /// a record count is too large in either byte order
    #[error("{what} count {count} exceeds the plausible maximum of {limit}")]
    #[diagnostic(code(bnd_resources::implausible_count))]
    ImplausibleCount {
        what: &'static str,
        count: u32,
        limit: u32,
    },

    /// a record or array lies outside of the payload
    #[error("{what} at {offset:#x} (+{length:#x}) lies outside the {payload_len:#x} byte payload")]
    #[diagnostic(code(bnd_resources::out_of_bounds))]
    OutOfBounds {
        what: &'static str,
        offset: u64,
        length: u64,
        payload_len: usize,
    },

    /// the entity graph cannot be encoded as it is
    #[error("invalid {what}: {reason}")]
    #[diagnostic(code(bnd_resources::invalid_graph))]
    InvalidGraph { what: String, reason: String },

    /// a record names a region id that does not exist
    #[error("{record} references generic region {id}, which does not exist")]
    #[diagnostic(code(bnd_resources::dangling_reference))]
    DanglingReference { record: String, id: i32 },

    /// an offset in the payload does not point at a generic region
    #[error("{record} points at {offset:#x}, which is not a generic region")]
    #[diagnostic(code(bnd_resources::dangling_offset))]
    DanglingOffset { record: String, offset: u32 },

    /// two generic regions share an id
    #[error("generic region id {id} is used more than once")]
    #[diagnostic(code(bnd_resources::duplicate_region_id))]
    DuplicateRegionId { id: i32 },

    /// the resource has no data
    #[error("resource {id:#018x} has no payload")]
    #[diagnostic(code(bnd_resources::missing_payload))]
    MissingPayload { id: u64 },

    /// a replacement targets a type the bundle does not contain
    #[error("bundle has no {resource_type} resource to replace")]
    #[diagnostic(code(bnd_resources::missing_resource))]
    MissingResource { resource_type: ResourceType },

    /// no codec exists for the resource type
    #[error("no codec for resource type {resource_type}")]
    #[diagnostic(code(bnd_resources::unsupported_type))]
    UnsupportedResourceType { resource_type: ResourceType },

    /// {0}
    #[error("{0}")]
    #[diagnostic(code(bnd_resources::custom))]
    CustomError(String),
}

impl Error {
    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::IOError(_) | Error::BinRWError(_) => ErrorCategory::Io,
            Error::Bundle(error) => error.category(),
            Error::ImplausibleCount { .. } | Error::OutOfBounds { .. } => {
                ErrorCategory::Structural
            }
            Error::DanglingReference { .. }
            | Error::DanglingOffset { .. }
            | Error::DuplicateRegionId { .. } => ErrorCategory::Integrity,
            Error::InvalidIdentifier { .. }
            | Error::InvalidGraph { .. }
            | Error::MissingPayload { .. }
            | Error::MissingResource { .. }
            | Error::UnsupportedResourceType { .. }
            | Error::CustomError(_) => ErrorCategory::InvalidInput,
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

/// Slice `length` bytes at `offset` out of a payload
pub(crate) fn slice<'a>(
    payload: &'a [u8],
    what: &'static str,
    offset: u64,
    length: u64,
) -> Result<&'a [u8]> {
    match offset.checked_add(length) {
        Some(end) if end <= payload.len() as u64 => Ok(&payload[offset as usize..end as usize]),
        _ => Err(Error::OutOfBounds {
            what,
            offset,
            length,
            payload_len: payload.len(),
        }),
    }
}

#[cfg(test)]
mod test {
    use bnd_bundle::error::ErrorCategory;

    use crate::error::Error;

    #[test]
    fn bundle_errors_keep_their_category() {
        let error = Error::from(bnd_bundle::error::Error::UnknownResource { id: 7 });
        assert_eq!(error.category(), ErrorCategory::InvalidInput);

        let error = Error::DanglingReference {
            record: "killzone 0".into(),
            id: 12,
        };
        assert_eq!(error.category(), ErrorCategory::Integrity);
        assert_eq!(
            error.to_string(),
            "killzone 0 references generic region 12, which does not exist"
        );
    }
}
