//! Locating and unpacking resource payloads
//!
//! A payload is the on-disk data of the first region of an entry that carries any. It may be
//! stored raw, as a zlib stream or, for some resources, as a complete bundle of its own.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, instrument};

use crate::{
    compression::{decompress, CompressionMethod},
    error::{Error, Result},
    read::{Bundle, BundleResource, ParseOptions},
    types::{BUNDLE_MAGIC, BUNDLE_VERSION, HEADER_SIZE, REGION_COUNT},
};

/// Payload bytes of a resource together with where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayload {
    /// Decompressed bytes
    pub bytes: Vec<u8>,

    /// Region the data was read from
    pub region: usize,

    /// Absolute offset of the stored slice. Relative to the nested bundle when `nested` is set.
    pub offset: u64,

    pub was_compressed: bool,

    /// Length of the stored slice
    pub compressed_len: usize,

    /// Length of `bytes`
    pub decompressed_len: usize,

    /// The payload was lifted out of a bundle stored inside the resource
    pub nested: bool,
}

/// Read and decompress the payload of `resource`
///
/// Returns `None` when none of the entry's regions carry data.
#[instrument(skip(bundle, resource, buffer), fields(id = resource.id()), err)]
pub fn resolve(
    bundle: &Bundle,
    resource: &BundleResource,
    buffer: &[u8],
) -> Result<Option<ResolvedPayload>> {
    let Some(region) = resource.entry.primary_region() else {
        return Ok(None);
    };
    let Some(range) = bundle.data_range(resource, region) else {
        return Ok(None);
    };

    let slice = slice(buffer, range.start, range.end - range.start, Some(resource.index))?;
    let decompressed = decompress(slice)?;

    Ok(Some(ResolvedPayload {
        was_compressed: decompressed.method == CompressionMethod::Zlib,
        compressed_len: decompressed.compressed_len,
        decompressed_len: decompressed.decompressed_len,
        bytes: decompressed.bytes,
        region,
        offset: range.start,
        nested: false,
    }))
}

fn slice(buffer: &[u8], offset: u64, length: u64, entry: Option<usize>) -> Result<&[u8]> {
    match offset.checked_add(length) {
        Some(end) if end <= buffer.len() as u64 => Ok(&buffer[offset as usize..end as usize]),
        _ => Err(Error::OutOfBounds {
            what: "resource data",
            entry,
            offset,
            length,
            buffer_len: buffer.len(),
        }),
    }
}

/// Whether `data` starts with a bundle header
pub fn looks_like_bundle(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE || data[0..4] != BUNDLE_MAGIC {
        return false;
    }

    let (version, platform) = if LittleEndian::read_u32(&data[4..8]) == BUNDLE_VERSION {
        (BUNDLE_VERSION, LittleEndian::read_u32(&data[8..12]))
    } else {
        (BigEndian::read_u32(&data[4..8]), BigEndian::read_u32(&data[8..12]))
    };

    version == BUNDLE_VERSION && (1..=3).contains(&platform)
}

/// Resolve a payload and, when it is itself a bundle, lift the matching resource out of it
///
/// Offsets inside nested bundles are not reliable, so every region of the inner entry is tried at
/// its base plus offset, at its offset alone and at its base alone. The first candidate that is a
/// valid zlib stream wins, otherwise the first one accepted by `plausible`.
///
/// Only one level is unwrapped. The result is returned as is even if it looks like a bundle again.
#[instrument(skip(bundle, resource, buffer, plausible), fields(id = resource.id()), err)]
pub fn resolve_unwrapped<F>(
    bundle: &Bundle,
    resource: &BundleResource,
    buffer: &[u8],
    plausible: F,
) -> Result<Option<ResolvedPayload>>
where
    F: Fn(&[u8]) -> bool,
{
    let Some(payload) = resolve(bundle, resource, buffer)? else {
        return Ok(None);
    };

    if !looks_like_bundle(&payload.bytes) {
        return Ok(Some(payload));
    }

    let inner = match Bundle::parse(&payload.bytes, &ParseOptions::lenient()) {
        Ok(inner) => inner,
        Err(error) => {
            debug!("nested bundle could not be parsed: {error}");
            return Ok(None);
        }
    };

    let Some(inner_resource) = inner.by_type(resource.resource_type()) else {
        debug!("nested bundle has no {} resource", resource.resource_type());
        return Ok(None);
    };

    let candidates = candidates(&inner, inner_resource, &payload.bytes);

    for (region, offset, data) in &candidates {
        if CompressionMethod::detect(data) != CompressionMethod::Zlib {
            continue;
        }

        if let Ok(decompressed) = decompress(data) {
            debug!(region, offset, "unwrapped compressed nested payload");
            return Ok(Some(ResolvedPayload {
                was_compressed: true,
                compressed_len: decompressed.compressed_len,
                decompressed_len: decompressed.decompressed_len,
                bytes: decompressed.bytes,
                region: *region,
                offset: *offset,
                nested: true,
            }));
        }
    }

    for (region, offset, data) in candidates {
        if plausible(data) {
            debug!(region, offset, "unwrapped raw nested payload");
            return Ok(Some(ResolvedPayload {
                was_compressed: false,
                compressed_len: data.len(),
                decompressed_len: data.len(),
                bytes: data.to_vec(),
                region,
                offset,
                nested: true,
            }));
        }
    }

    debug!("no plausible payload inside nested bundle");
    Ok(None)
}

/// In bounds sub-slices of `data` that could hold the inner resource, in trial order
fn candidates<'a>(
    inner: &Bundle,
    resource: &BundleResource,
    data: &'a [u8],
) -> Vec<(usize, u64, &'a [u8])> {
    let mut result = Vec::new();

    for region in 0..REGION_COUNT {
        let size = resource.entry.size_on_disk[region].size() as u64;
        if size == 0 {
            continue;
        }

        let base = inner.header.region_offsets[region] as u64;
        let offset = resource.entry.disk_offset[region] as u64;

        for start in [base + offset, offset, base] {
            if result.iter().any(|(r, s, _)| *r == region && *s == start) {
                continue;
            }
            if let Ok(candidate) = slice(data, start, size, None) {
                result.push((region, start, candidate));
            }
        }
    }

    result
}
