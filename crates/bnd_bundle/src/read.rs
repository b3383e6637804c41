//! Types for reading bundles
//!

use binrw::BinRead;
use bon::Builder;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use indexmap::IndexMap;
use std::io::Cursor;
use std::ops::Range;
use tracing::{debug, instrument, warn};

use crate::{
    debug::DebugData,
    error::{Error, Result},
    types::{
        BundleHeader, Endian, ImportEntry, Platform, ResourceEntry, ResourceType,
        BUNDLE_MAGIC, BUNDLE_VERSION, HEADER_SIZE, IMPORT_ENTRY_SIZE, REGION_COUNT,
        RESOURCE_ENTRY_SIZE,
    },
};

/// Default ceiling on the number of directory entries before a bundle is considered corrupt
pub const DEFAULT_MAX_ENTRIES: u32 = 0x4000;

/// How structural problems are handled
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Strictness {
    /// The first violation aborts the parse
    #[default]
    Strict,

    /// Violations are logged and recorded, offending entries are skipped
    Lenient,
}

/// Options for how a bundle should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct ParseOptions {
    #[builder(default)]
    pub strictness: Strictness,

    /// Entry counts above this are treated as corruption
    #[builder(default = DEFAULT_MAX_ENTRIES)]
    pub max_entries: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ParseOptions {
    pub fn lenient() -> Self {
        Self::builder().strictness(Strictness::Lenient).build()
    }
}

/// A structural problem that was tolerated in [`Strictness::Lenient`] mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Diagnostic code of the error that was demoted
    pub code: String,
    /// Directory index of the skipped entry, if the problem was entry specific
    pub entry: Option<usize>,
    pub message: String,
}

impl From<&Error> for ParseWarning {
    fn from(value: &Error) -> Self {
        ParseWarning {
            code: value.code_str(),
            entry: value.entry(),
            message: value.to_string(),
        }
    }
}

/// A directory entry together with its position and imports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleResource {
    /// Position of the entry in the directory
    pub index: usize,
    pub entry: ResourceEntry,
    pub imports: Vec<ImportEntry>,
}

impl BundleResource {
    pub fn id(&self) -> u64 {
        self.entry.resource_id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.entry.resource_type
    }
}

/// Bundle reader
///
/// The bundle only describes where things are, the bytes stay with the caller and are passed
/// back in whenever a payload is needed (see [`crate::resolve`]).
///
/// ```no_run
/// fn list_bundle_contents(data: &[u8]) -> bnd_bundle::error::Result<()> {
///     let bundle = bnd_bundle::Bundle::parse(data, &Default::default())?;
///
///     for resource in bundle.resources() {
///         println!("{:016x} {}", resource.id(), resource.resource_type());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bundle {
    pub header: BundleHeader,
    pub endian: Endian,
    pub platform: Platform,
    pub debug_data: Option<DebugData>,
    pub warnings: Vec<ParseWarning>,
    resources: IndexMap<u64, BundleResource>,
}

struct Validator {
    strictness: Strictness,
    warnings: Vec<ParseWarning>,
}

impl Validator {
    /// Either fail with `error` or record it and let the caller carry on
    fn report(&mut self, error: Error) -> Result<()> {
        match self.strictness {
            Strictness::Strict => Err(error),
            Strictness::Lenient => {
                warn!("{error}");
                self.warnings.push(ParseWarning::from(&error));
                Ok(())
            }
        }
    }
}

fn check_range(
    what: &'static str,
    entry: Option<usize>,
    offset: u64,
    length: u64,
    buffer_len: usize,
) -> Result<Range<usize>> {
    let end = offset.checked_add(length);
    match end {
        Some(end) if end <= buffer_len as u64 => Ok(offset as usize..end as usize),
        _ => Err(Error::OutOfBounds {
            what,
            entry,
            offset,
            length,
            buffer_len,
        }),
    }
}

fn detect_endian(data: &[u8]) -> Option<Endian> {
    let version = &data[4..8];
    if LittleEndian::read_u32(version) == BUNDLE_VERSION {
        Some(Endian::Little)
    } else if BigEndian::read_u32(version) == BUNDLE_VERSION {
        Some(Endian::Big)
    } else {
        None
    }
}

impl Bundle {
    /// Read the header, directory, import tables and debug data of a bundle.
    #[instrument(skip(data), fields(size = data.len()), err)]
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<Bundle> {
        if data.len() < HEADER_SIZE {
            return Err(Error::OutOfBounds {
                what: "bundle header",
                entry: None,
                offset: 0,
                length: HEADER_SIZE as u64,
                buffer_len: data.len(),
            });
        }

        let mut validator = Validator {
            strictness: options.strictness,
            warnings: Vec::new(),
        };

        let endian = match detect_endian(data) {
            Some(endian) => endian,
            None => {
                validator.report(Error::UnsupportedVersion {
                    found: LittleEndian::read_u32(&data[4..8]),
                })?;
                Endian::Little
            }
        };

        let mut reader = Cursor::new(data);
        let header = BundleHeader::read_options(&mut reader, endian.into(), ())?;

        if header.magic != BUNDLE_MAGIC {
            validator.report(Error::InvalidMagic {
                found: header.magic,
            })?;
        }

        let platform = match Platform::try_from(header.platform) {
            Ok(platform) => platform,
            Err(found) => {
                validator.report(Error::InvalidPlatform { found })?;
                match endian {
                    Endian::Little => Platform::Pc,
                    Endian::Big => Platform::Ps3,
                }
            }
        };

        if header.resource_count > options.max_entries {
            validator.report(Error::EntryCountTooLarge {
                count: header.resource_count,
                limit: options.max_entries,
            })?;
        }

        let table_offset = header.resource_entries_offset as u64;
        if table_offset % 4 != 0 {
            validator.report(Error::Misaligned {
                what: "resource entry table",
                entry: None,
                offset: table_offset,
                alignment: 4,
            })?;
        }

        let mut count = header.resource_count as u64;
        let table_len = count * RESOURCE_ENTRY_SIZE as u64;
        if let Err(error) = check_range("resource entry table", None, table_offset, table_len, data.len()) {
            validator.report(error)?;
            count = (data.len() as u64).saturating_sub(table_offset) / RESOURCE_ENTRY_SIZE as u64;
        }

        let mut resources = IndexMap::with_capacity(count as usize);
        for index in 0..count as usize {
            reader.set_position(table_offset + (index * RESOURCE_ENTRY_SIZE) as u64);
            let entry = ResourceEntry::read_options(&mut reader, endian.into(), ())?;

            if let Err(error) = Self::validate_entry(&header, &entry, index, data.len()) {
                validator.report(error)?;
                continue;
            }

            let imports = match Self::read_imports(&mut reader, &entry, index, endian) {
                Ok(imports) => imports,
                Err(error) => {
                    validator.report(error)?;
                    continue;
                }
            };

            if resources.contains_key(&entry.resource_id) {
                validator.report(Error::DuplicateResourceId {
                    id: entry.resource_id,
                    entry: index,
                })?;
                continue;
            }

            resources.insert(
                entry.resource_id,
                BundleResource {
                    index,
                    entry,
                    imports,
                },
            );
        }

        let debug_data = match Self::read_debug_data(&header, data) {
            Ok(debug_data) => debug_data,
            Err(error) => {
                validator.report(error)?;
                None
            }
        };

        debug!(
            resources = resources.len(),
            warnings = validator.warnings.len(),
            "parsed {platform} bundle"
        );

        Ok(Bundle {
            header,
            endian,
            platform,
            debug_data,
            warnings: validator.warnings,
            resources,
        })
    }

    fn validate_entry(
        header: &BundleHeader,
        entry: &ResourceEntry,
        index: usize,
        buffer_len: usize,
    ) -> Result<()> {
        for region in 0..REGION_COUNT {
            let size = entry.size_on_disk[region];
            if size.size() == 0 {
                continue;
            }

            let offset = header.region_offsets[region] as u64 + entry.disk_offset[region] as u64;
            check_range("resource data", Some(index), offset, size.size() as u64, buffer_len)?;

            let alignment = size.alignment() as u64;
            if offset % alignment != 0 {
                return Err(Error::Misaligned {
                    what: "resource data",
                    entry: Some(index),
                    offset,
                    alignment,
                });
            }
        }

        Ok(())
    }

    fn read_imports(
        reader: &mut Cursor<&[u8]>,
        entry: &ResourceEntry,
        index: usize,
        endian: Endian,
    ) -> Result<Vec<ImportEntry>> {
        if entry.import_count == 0 {
            return Ok(Vec::new());
        }

        let offset = entry.import_offset as u64;
        let length = entry.import_count as u64 * IMPORT_ENTRY_SIZE as u64;
        check_range("import table", Some(index), offset, length, reader.get_ref().len())?;

        reader.set_position(offset);
        (0..entry.import_count)
            .map(|_| ImportEntry::read_options(&mut *reader, endian.into(), ()).map_err(Error::from))
            .collect()
    }

    fn read_debug_data(header: &BundleHeader, data: &[u8]) -> Result<Option<DebugData>> {
        if !header.flags.has_debug_data() || header.debug_data_offset == 0 {
            return Ok(None);
        }

        let offset = header.debug_data_offset as u64;
        let range = check_range("debug data", None, offset, 1, data.len())?;
        Ok(Some(DebugData::parse(&data[range.start..])))
    }

    /// Number of resources that were read
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether this bundle contains no resources
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resources in directory order
    pub fn resources(&self) -> impl Iterator<Item = &BundleResource> {
        self.resources.values()
    }

    /// Search for a resource by id
    pub fn by_id(&self, id: u64) -> Option<&BundleResource> {
        self.resources.get(&id)
    }

    /// Get a resource by its position among the resources that were read
    pub fn by_index(&self, index: usize) -> Option<&BundleResource> {
        self.resources.get_index(index).map(|(_, r)| r)
    }

    /// First resource of a type
    pub fn by_type(&self, resource_type: ResourceType) -> Option<&BundleResource> {
        self.resources_of_type(resource_type).next()
    }

    /// Every resource of a type, in directory order
    pub fn resources_of_type(
        &self,
        resource_type: ResourceType,
    ) -> impl Iterator<Item = &BundleResource> {
        self.resources
            .values()
            .filter(move |r| r.resource_type() == resource_type)
    }

    /// Name from the debug table, if the bundle carries one
    pub fn debug_name(&self, id: u64) -> Option<&str> {
        self.debug_data.as_ref().and_then(|d| d.name_of(id))
    }

    /// Absolute byte range of a resource's data in one region, `None` when the region is unused
    pub fn data_range(&self, resource: &BundleResource, region: usize) -> Option<Range<u64>> {
        let size = resource.entry.size_on_disk.get(region)?.size() as u64;
        if size == 0 {
            return None;
        }

        let start =
            self.header.region_offsets[region] as u64 + resource.entry.disk_offset[region] as u64;
        Some(start..start + size)
    }
}
