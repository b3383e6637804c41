//! Types for writing bundles
//!

use binrw::{BinRead, BinWrite};
use bon::Builder;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, instrument};

use crate::compression::{compress, CompressionMethod};
use crate::error::{Error, Result};
use crate::read::Bundle;
use crate::types::{
    BundleFlags, BundleHeader, Platform, ResourceEntry, ResourceType, SizeAndAlignment,
    HEADER_SIZE, REGION_COUNT, RESOURCE_ENTRY_SIZE,
};

/// Options for how bundles should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct BundleWriterOptions {
    /// zlib level used when a payload has to be compressed
    #[builder(default = 9)]
    pub compression_level: u32,

    /// Lower bound for the alignment that size changes are rounded up to
    #[builder(default = 16)]
    pub minimum_alignment: u32,
}

impl Default for BundleWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A stored slice of resource data
#[derive(Debug)]
struct Piece {
    start: u64,
    end: u64,
    entry: usize,
    id: u64,
    region: usize,
}

/// Rebuilds a bundle with some payloads replaced
///
/// Everything that is not replaced is copied from the original buffer. Data after a replaced
/// payload moves by the size difference rounded up to the largest alignment in the bundle, so
/// every resource keeps its alignment, and all offsets pointing past it are relocated.
///
/// ```no_run
/// # fn doit(data: &[u8]) -> bnd_bundle::error::Result<()>
/// # {
/// use bnd_bundle::{Bundle, BundleWriter};
///
/// let bundle = Bundle::parse(data, &Default::default())?;
///
/// let mut writer = BundleWriter::new(data, &bundle, Default::default());
/// writer.replace(0x0D2A_8B71, b"new payload".to_vec())?;
/// let output = writer.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct BundleWriter<'a> {
    original: &'a [u8],
    bundle: &'a Bundle,
    options: BundleWriterOptions,
    replacements: IndexMap<u64, Vec<u8>>,
}

impl<'a> BundleWriter<'a> {
    pub fn new(original: &'a [u8], bundle: &'a Bundle, options: BundleWriterOptions) -> Self {
        BundleWriter {
            original,
            bundle,
            options,
            replacements: IndexMap::new(),
        }
    }

    /// Queue a new decompressed payload for the primary region of a resource
    pub fn replace(&mut self, id: u64, payload: Vec<u8>) -> Result<()> {
        let resource = self
            .bundle
            .by_id(id)
            .ok_or(Error::UnknownResource { id })?;

        if resource.entry.primary_region().is_none() {
            return Err(Error::EmptyResource { id });
        }

        self.replacements.insert(id, payload);
        Ok(())
    }

    /// Number of queued replacements
    pub fn replacement_count(&self) -> usize {
        self.replacements.len()
    }

    fn pieces(&self) -> Result<Vec<Piece>> {
        let mut pieces = Vec::new();
        for resource in self.bundle.resources() {
            for region in 0..REGION_COUNT {
                if let Some(range) = self.bundle.data_range(resource, region) {
                    pieces.push(Piece {
                        start: range.start,
                        end: range.end,
                        entry: resource.index,
                        id: resource.id(),
                        region,
                    });
                }
            }
        }

        pieces.sort_by_key(|p| (p.start, p.entry));

        for pair in pieces.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(Error::OverlappingResources {
                    offset: pair[1].start,
                    first: pair[0].entry,
                    second: pair[1].entry,
                });
            }
        }

        if let Some(last) = pieces.last() {
            if last.end > self.original.len() as u64 {
                return Err(Error::OutOfBounds {
                    what: "resource data",
                    entry: Some(last.entry),
                    offset: last.start,
                    length: last.end - last.start,
                    buffer_len: self.original.len(),
                });
            }
        }

        Ok(pieces)
    }

    fn alignment(&self) -> u64 {
        self.bundle
            .resources()
            .flat_map(|r| r.entry.size_on_disk.iter())
            .filter(|s| s.size() != 0)
            .map(|s| s.alignment() as u64)
            .chain([self.options.minimum_alignment.max(16) as u64])
            .max()
            .unwrap_or(16)
    }

    /// Produce the new bundle
    #[instrument(skip(self), fields(replacements = self.replacements.len()), err)]
    pub fn finish(self) -> Result<Vec<u8>> {
        let pieces = self.pieces()?;
        let alignment = self.alignment();

        let mut output = Vec::with_capacity(self.original.len());
        let mut shifts: Vec<(u64, i64)> = Vec::new();
        // (entry index, region) -> (stored size, decompressed size)
        let mut sizes: IndexMap<(usize, usize), (usize, usize)> = IndexMap::new();
        let mut position = 0u64;

        for piece in &pieces {
            output.extend_from_slice(&self.original[position as usize..piece.start as usize]);

            let primary = self
                .bundle
                .by_id(piece.id)
                .and_then(|r| r.entry.primary_region());
            let replacement = match self.replacements.get(&piece.id) {
                Some(payload) if primary == Some(piece.region) => payload,
                _ => {
                    output.extend_from_slice(&self.original[piece.start as usize..piece.end as usize]);
                    position = piece.end;
                    continue;
                }
            };

            let original = &self.original[piece.start as usize..piece.end as usize];
            let stored = match CompressionMethod::detect(original) {
                CompressionMethod::Zlib => compress(replacement, self.options.compression_level)?,
                CompressionMethod::None => replacement.clone(),
            };

            let old_len = original.len() as i64;
            let new_len = stored.len() as i64;
            let shift = round_up(new_len - old_len, alignment as i64);

            debug!(
                id = piece.id,
                old_len,
                new_len,
                shift,
                "replacing resource data"
            );

            output.extend_from_slice(&stored);
            output.resize(output.len() + (old_len + shift - new_len) as usize, 0);

            sizes.insert((piece.entry, piece.region), (stored.len(), replacement.len()));
            shifts.push((piece.end, shift));
            position = piece.end;
        }
        output.extend_from_slice(&self.original[position as usize..]);

        let relocate = |offset: u64| -> Result<u32> {
            let shifted = offset as i64
                + shifts
                    .iter()
                    .filter(|(end, _)| *end <= offset)
                    .map(|(_, shift)| shift)
                    .sum::<i64>();
            u32::try_from(shifted)
                .map_err(|_| Error::CustomError(format!("offset {offset:#x} cannot be relocated")))
        };

        let mut header = self.bundle.header;
        for region in 0..REGION_COUNT {
            header.region_offsets[region] = relocate(header.region_offsets[region] as u64)?;
        }
        if header.debug_data_offset != 0 {
            header.debug_data_offset = relocate(header.debug_data_offset as u64)?;
        }
        header.resource_entries_offset = relocate(header.resource_entries_offset as u64)?;

        let endian = self.bundle.endian.into();
        let mut writer = Cursor::new(&mut output);
        header.write_options(&mut writer, endian, ())?;

        // every directory entry is rewritten, including entries a lenient parse skipped
        let parsed: HashSet<usize> = self.bundle.resources().map(|r| r.index).collect();
        let replaced: Vec<&Piece> = pieces
            .iter()
            .filter(|p| sizes.contains_key(&(p.entry, p.region)))
            .collect();

        let old_table = self.bundle.header.resource_entries_offset as u64;
        let fits =
            (self.original.len() as u64).saturating_sub(old_table) / RESOURCE_ENTRY_SIZE as u64;
        let count = (self.bundle.header.resource_count as u64).min(fits) as usize;
        let mut reader = Cursor::new(self.original);

        for index in 0..count {
            reader.set_position(old_table + (index * RESOURCE_ENTRY_SIZE) as u64);
            let mut entry = ResourceEntry::read_options(&mut reader, endian, ())?;
            let skipped = !parsed.contains(&index);
            if skipped {
                debug!(entry = index, "relocating entry skipped by the parse");
            }

            for region in 0..REGION_COUNT {
                let size = entry.size_on_disk[region].size() as u64;
                if size == 0 {
                    continue;
                }

                let absolute = self.bundle.header.region_offsets[region] as u64
                    + entry.disk_offset[region] as u64;
                if skipped {
                    if let Some(piece) = replaced
                        .iter()
                        .find(|p| absolute < p.end && p.start < absolute + size)
                    {
                        return Err(Error::OverlappingResources {
                            offset: absolute,
                            first: piece.entry,
                            second: index,
                        });
                    }
                }

                entry.disk_offset[region] = relocate(absolute)?
                    .checked_sub(header.region_offsets[region])
                    .ok_or_else(|| {
                        Error::CustomError(format!(
                            "data of entry {index} at {absolute:#x} lies before its region"
                        ))
                    })?;

                if let Some(&(stored, decompressed)) = sizes.get(&(index, region)) {
                    entry.size_on_disk[region] = resized(entry.size_on_disk[region], stored, index)?;
                    entry.uncompressed_size[region] =
                        resized(entry.uncompressed_size[region], decompressed, index)?;
                }
            }

            if entry.import_count != 0 {
                entry.import_offset = relocate(entry.import_offset as u64)?;
            }

            writer.set_position(
                header.resource_entries_offset as u64 + (index * RESOURCE_ENTRY_SIZE) as u64,
            );
            entry.write_options(&mut writer, endian, ())?;
        }

        Ok(output)
    }
}

/// Round `value` towards positive infinity to a multiple of `alignment`
fn round_up(value: i64, alignment: i64) -> i64 {
    (value + alignment - 1).div_euclid(alignment) * alignment
}

fn align(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

fn resized(packed: SizeAndAlignment, size: usize, entry: usize) -> Result<SizeAndAlignment> {
    u32::try_from(size)
        .ok()
        .and_then(|size| packed.with_size(size))
        .ok_or(Error::SizeOverflow {
            entry,
            size: size as u64,
        })
}

#[derive(Debug, Clone)]
struct NewResource {
    id: u64,
    resource_type: ResourceType,
    payload: Vec<u8>,
    compressed: bool,
}

/// Builds a bundle from scratch
///
/// Every resource is placed in the first region, in the order it was added.
///
/// ```
/// # fn doit() -> bnd_bundle::error::Result<()>
/// # {
/// use bnd_bundle::{Bundle, BundleBuilder, Platform, ResourceType};
///
/// let data = BundleBuilder::new(Platform::Pc)
///     .add(1, ResourceType::VEHICLE_LIST, b"vehicles".to_vec(), false)
///     .add(2, ResourceType::TRIGGER_DATA, b"triggers".to_vec(), true)
///     .build()?;
///
/// let bundle = Bundle::parse(&data, &Default::default())?;
/// assert_eq!(bundle.len(), 2);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    platform: Platform,
    options: BundleWriterOptions,
    resources: Vec<NewResource>,
}

impl BundleBuilder {
    pub fn new(platform: Platform) -> Self {
        BundleBuilder {
            platform,
            options: BundleWriterOptions::default(),
            resources: Vec::new(),
        }
    }

    pub fn options(mut self, options: BundleWriterOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a resource, `compressed` stores it as a zlib stream
    pub fn add(
        mut self,
        id: u64,
        resource_type: ResourceType,
        payload: Vec<u8>,
        compressed: bool,
    ) -> Self {
        self.resources.push(NewResource {
            id,
            resource_type,
            payload,
            compressed,
        });
        self
    }

    #[instrument(skip(self), fields(resources = self.resources.len()), err)]
    pub fn build(self) -> Result<Vec<u8>> {
        let alignment = self.options.minimum_alignment.max(1).next_power_of_two() as u64;
        let exponent = alignment.trailing_zeros() as u8;

        let entries_offset = align(HEADER_SIZE as u64, alignment);
        let data_offset = align(
            entries_offset + (self.resources.len() * RESOURCE_ENTRY_SIZE) as u64,
            alignment,
        );

        let mut entries = Vec::with_capacity(self.resources.len());
        let mut data = Vec::new();
        let mut any_compressed = false;

        for (index, resource) in self.resources.iter().enumerate() {
            if self.resources[..index].iter().any(|r| r.id == resource.id) {
                return Err(Error::DuplicateResourceId {
                    id: resource.id,
                    entry: index,
                });
            }

            let stored = if resource.compressed {
                any_compressed = true;
                compress(&resource.payload, self.options.compression_level)?
            } else {
                resource.payload.clone()
            };

            data.resize(align(data.len() as u64, alignment) as usize, 0);
            let disk_offset = data.len() as u32;
            data.extend_from_slice(&stored);

            let packed = |size: usize| {
                u32::try_from(size)
                    .ok()
                    .and_then(|size| SizeAndAlignment::new(size, exponent))
                    .ok_or(Error::SizeOverflow {
                        entry: index,
                        size: size as u64,
                    })
            };

            entries.push(ResourceEntry {
                resource_id: resource.id,
                uncompressed_size: [packed(resource.payload.len())?, Default::default(), Default::default()],
                size_on_disk: [packed(stored.len())?, Default::default(), Default::default()],
                resource_type: resource.resource_type,
                disk_offset: [disk_offset, 0, 0],
                ..Default::default()
            });
        }
        data.resize(align(data.len() as u64, alignment) as usize, 0);

        let data_end = data_offset + data.len() as u64;
        let to_u32 = |value: u64| {
            u32::try_from(value)
                .map_err(|_| Error::CustomError(format!("bundle grows past {value:#x} bytes")))
        };

        let mut flags = 0;
        if any_compressed {
            flags |= BundleFlags::COMPRESSED;
        }

        let header = BundleHeader {
            platform: self.platform as u32,
            resource_count: self.resources.len() as u32,
            resource_entries_offset: to_u32(entries_offset)?,
            region_offsets: [to_u32(data_offset)?, to_u32(data_end)?, to_u32(data_end)?],
            flags: BundleFlags(flags),
            ..Default::default()
        };

        let endian = self.platform.endian().into();
        let mut writer = Cursor::new(Vec::with_capacity(data_end as usize));
        header.write_options(&mut writer, endian, ())?;

        writer.set_position(entries_offset);
        for entry in &entries {
            entry.write_options(&mut writer, endian, ())?;
        }

        let mut output = writer.into_inner();
        output.resize(data_offset as usize, 0);
        output.extend_from_slice(&data);

        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::{Bundle, ParseOptions};
    use crate::resolve::resolve;
    use crate::types::{Platform, ResourceType};
    use crate::write::{BundleBuilder, BundleWriter, BundleWriterOptions};

    #[traced_test]
    #[test]
    fn build_single_entry() -> Result<()> {
        #[rustfmt::skip]
        let mut expected = vec![
            // Header
            b'b', b'n', b'd', b'2',
            0x02, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x30, 0x00, 0x00, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x90, 0x00, 0x00, 0x00,
            0x90, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            // Padding
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Entry
            0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x05, 0x00, 0x01, 0x00,
            0x00, 0x00,
            0x00,
            0x00,
        ];
        expected.extend_from_slice(&[0; 16]);
        expected.extend_from_slice(b"0123456789ABCDEF");

        let result = BundleBuilder::new(Platform::Pc)
            .add(
                0x1122_3344_5566_7788,
                ResourceType::VEHICLE_LIST,
                b"0123456789ABCDEF".to_vec(),
                false,
            )
            .build()?;

        assert_eq!(result.len(), expected.len());
        assert_str_eq!(format!("{:02X?}", result), format!("{:02X?}", expected));

        Ok(())
    }

    #[test]
    fn build_rejects_duplicate_ids() {
        let result = BundleBuilder::new(Platform::Pc)
            .add(1, ResourceType::VEHICLE_LIST, vec![1], false)
            .add(1, ResourceType::TRIGGER_DATA, vec![2], false)
            .build();

        assert!(matches!(
            result,
            Err(Error::DuplicateResourceId { id: 1, entry: 1 })
        ));
    }

    fn two_resources(compressed: bool) -> Result<Vec<u8>> {
        BundleBuilder::new(Platform::Xbox360)
            .add(1, ResourceType::VEHICLE_LIST, vec![0xAA; 0x30], compressed)
            .add(2, ResourceType::TRIGGER_DATA, vec![0xBB; 0x20], compressed)
            .build()
    }

    fn payload(data: &[u8], id: u64) -> Result<Vec<u8>> {
        let bundle = Bundle::parse(data, &ParseOptions::default())?;
        let resource = bundle.by_id(id).unwrap();
        Ok(resolve(&bundle, resource, data)?.unwrap().bytes)
    }

    #[traced_test]
    #[test]
    fn unchanged_bundle_is_identical() -> Result<()> {
        let original = two_resources(true)?;
        let bundle = Bundle::parse(&original, &ParseOptions::default())?;

        let output = BundleWriter::new(&original, &bundle, Default::default()).finish()?;
        assert_eq!(output, original);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn grow_raw_payload() -> Result<()> {
        let original = two_resources(false)?;
        let bundle = Bundle::parse(&original, &ParseOptions::default())?;

        let mut writer = BundleWriter::new(&original, &bundle, Default::default());
        writer.replace(1, vec![0xCC; 0x38])?;
        let output = writer.finish()?;

        // 8 extra bytes round up to one 16 byte step
        assert_eq!(output.len(), original.len() + 0x10);

        let rebuilt = Bundle::parse(&output, &ParseOptions::default())?;
        let first = rebuilt.by_id(1).unwrap();
        let second = rebuilt.by_id(2).unwrap();
        assert_eq!(first.entry.size_on_disk[0].size(), 0x38);
        assert_eq!(first.entry.size_on_disk[0].alignment(), 16);
        assert_eq!(second.entry.disk_offset[0], 0x40);
        assert_eq!(
            rebuilt.header.region_offsets[1],
            bundle.header.region_offsets[1] + 0x10
        );

        assert_eq!(payload(&output, 1)?, vec![0xCC; 0x38]);
        assert_eq!(payload(&output, 2)?, vec![0xBB; 0x20]);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn shrink_compressed_payload() -> Result<()> {
        let original = two_resources(true)?;
        let bundle = Bundle::parse(&original, &ParseOptions::default())?;

        let mut writer = BundleWriter::new(&original, &bundle, Default::default());
        writer.replace(1, vec![0xDD; 4])?;
        let output = writer.finish()?;

        let rebuilt = Bundle::parse(&output, &ParseOptions::default())?;
        let first = rebuilt.by_id(1).unwrap();
        assert_eq!(first.entry.uncompressed_size[0].size(), 4);
        assert!(resolve(&rebuilt, first, &output)?.unwrap().was_compressed);

        assert_eq!(payload(&output, 1)?, vec![0xDD; 4]);
        assert_eq!(payload(&output, 2)?, payload(&original, 2)?);

        Ok(())
    }

    #[test]
    fn replace_unknown_resource() -> Result<()> {
        let original = two_resources(false)?;
        let bundle = Bundle::parse(&original, &ParseOptions::default())?;

        let mut writer = BundleWriter::new(&original, &bundle, BundleWriterOptions::default());
        assert!(matches!(
            writer.replace(3, vec![]),
            Err(Error::UnknownResource { id: 3 })
        ));
        assert_eq!(writer.replacement_count(), 0);

        Ok(())
    }

    #[test]
    fn overlapping_resources() -> Result<()> {
        let mut original = two_resources(false)?;
        // point the second entry's data at the first one's
        let disk_offset = 0x30 + 0x50 + 0x28;
        original[disk_offset..disk_offset + 4].fill(0);

        let bundle = Bundle::parse(&original, &ParseOptions::default())?;
        let result = BundleWriter::new(&original, &bundle, Default::default()).finish();

        assert!(matches!(
            result,
            Err(Error::OverlappingResources {
                first: 0,
                second: 1,
                ..
            })
        ));

        Ok(())
    }
}
