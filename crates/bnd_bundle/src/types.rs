//! Base types for structure of a bundle.

use std::fmt;

use binrw::{BinRead, BinWrite};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tag every bundle starts with
pub const BUNDLE_MAGIC: [u8; 4] = *b"bnd2";

/// The only bundle version this library understands
pub const BUNDLE_VERSION: u32 = 2;

/// Size of [`BundleHeader`] on disk
pub const HEADER_SIZE: usize = 0x28;

/// Size of [`ResourceEntry`] on disk
pub const RESOURCE_ENTRY_SIZE: usize = 0x50;

/// Size of [`ImportEntry`] on disk
pub const IMPORT_ENTRY_SIZE: usize = 0x10;

/// Number of memory regions a resource can place data in
pub const REGION_COUNT: usize = 3;

/// Byte order of a bundle or payload
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// The other byte order
    pub const fn opposite(self) -> Self {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }
}

impl From<Endian> for binrw::Endian {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Little => binrw::Endian::Little,
            Endian::Big => binrw::Endian::Big,
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Little => f.write_str("little endian"),
            Endian::Big => f.write_str("big endian"),
        }
    }
}

/// Platform a bundle was built for
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Platform {
    #[default]
    Pc = 1,
    Xbox360 = 2,
    Ps3 = 3,
}

impl Platform {
    /// Byte order the platform stores its resources in
    pub const fn endian(self) -> Endian {
        match self {
            Platform::Pc => Endian::Little,
            Platform::Xbox360 | Platform::Ps3 => Endian::Big,
        }
    }
}

impl TryFrom<u32> for Platform {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Platform::Pc),
            2 => Ok(Platform::Xbox360),
            3 => Ok(Platform::Ps3),
            other => Err(other),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Pc => f.write_str("PC"),
            Platform::Xbox360 => f.write_str("Xbox 360"),
            Platform::Ps3 => f.write_str("PS3"),
        }
    }
}

/// Bundle level flag word
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BundleFlags(pub u32);

impl BundleFlags {
    pub const COMPRESSED: u32 = 1 << 0;
    pub const MAIN_MEMORY_OPTIMISED: u32 = 1 << 1;
    pub const GRAPHICS_MEMORY_OPTIMISED: u32 = 1 << 2;
    pub const HAS_DEBUG_DATA: u32 = 1 << 3;

    pub const fn compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub const fn main_memory_optimised(self) -> bool {
        self.0 & Self::MAIN_MEMORY_OPTIMISED != 0
    }

    pub const fn graphics_memory_optimised(self) -> bool {
        self.0 & Self::GRAPHICS_MEMORY_OPTIMISED != 0
    }

    pub const fn has_debug_data(self) -> bool {
        self.0 & Self::HAS_DEBUG_DATA != 0
    }
}

/// Bundle header
///
/// Always found at offset 0. Every integer is stored in the platform's byte order, which is
/// why the magic is kept as a plain field instead of being validated during the read.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    /// Should always be `bnd2`
    pub magic: [u8; 4],

    /// Should always be [`BUNDLE_VERSION`]
    pub version: u32,

    /// Raw platform id, see [`Platform`]
    pub platform: u32,

    /// Offset of the debug string table, zero when absent
    pub debug_data_offset: u32,

    /// The number of entries in the resource directory
    pub resource_count: u32,

    /// Offset of the resource directory
    pub resource_entries_offset: u32,

    /// Start of every memory region, resource offsets are relative to these
    pub region_offsets: [u32; REGION_COUNT],

    pub flags: BundleFlags,
}

impl Default for BundleHeader {
    fn default() -> Self {
        Self {
            magic: BUNDLE_MAGIC,
            version: BUNDLE_VERSION,
            platform: Platform::Pc as u32,
            debug_data_offset: 0,
            resource_count: 0,
            resource_entries_offset: HEADER_SIZE as u32,
            region_offsets: [0; REGION_COUNT],
            flags: BundleFlags::default(),
        }
    }
}

/// A 28 bit size packed together with a power of two alignment exponent in the top nibble
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SizeAndAlignment(pub u32);

impl SizeAndAlignment {
    pub const SIZE_MASK: u32 = 0x0FFF_FFFF;
    pub const MAX_SIZE: u32 = Self::SIZE_MASK;

    /// Pack a size and alignment exponent, `None` if the size needs more than 28 bits
    pub const fn new(size: u32, alignment_exponent: u8) -> Option<Self> {
        if size > Self::MAX_SIZE || alignment_exponent > 0xF {
            return None;
        }
        Some(Self(((alignment_exponent as u32) << 28) | size))
    }

    pub const fn size(self) -> u32 {
        self.0 & Self::SIZE_MASK
    }

    pub const fn alignment_exponent(self) -> u8 {
        (self.0 >> 28) as u8
    }

    pub const fn alignment(self) -> u32 {
        1 << self.alignment_exponent()
    }

    /// Same alignment, different size
    pub const fn with_size(self, size: u32) -> Option<Self> {
        Self::new(size, self.alignment_exponent())
    }
}

/// Resource type id as stored in a directory entry
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceType(pub u32);

impl ResourceType {
    pub const TEXTURE: Self = Self(0x0000_0000);
    pub const MATERIAL: Self = Self(0x0000_0001);
    pub const RENDERABLE: Self = Self(0x0000_000C);
    pub const TRIGGER_DATA: Self = Self(0x0001_0003);
    pub const VEHICLE_LIST: Self = Self(0x0001_0005);
    pub const TAKE_DICTIONARY: Self = Self(0x0001_000B);
    pub const PLAYER_CAR_COLOURS: Self = Self(0x0001_001E);
    pub const CHALLENGE_LIST: Self = Self(0x0001_001F);

    /// Human readable name for the well known types
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::TEXTURE => Some("Texture"),
            Self::MATERIAL => Some("Material"),
            Self::RENDERABLE => Some("Renderable"),
            Self::TRIGGER_DATA => Some("TriggerData"),
            Self::VEHICLE_LIST => Some("VehicleList"),
            Self::TAKE_DICTIONARY => Some("TakeDictionary"),
            Self::PLAYER_CAR_COLOURS => Some("PlayerCarColours"),
            Self::CHALLENGE_LIST => Some("ChallengeList"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// Resource directory entry
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub resource_id: u64,

    pub import_hash: u64,

    /// Size of each region's data once decompressed
    pub uncompressed_size: [SizeAndAlignment; REGION_COUNT],

    /// Size of each region's data as stored in the bundle
    pub size_on_disk: [SizeAndAlignment; REGION_COUNT],

    /// Offset of each region's data relative to the region base, zero when unused
    pub disk_offset: [u32; REGION_COUNT],

    /// Offset of this entry's import table
    pub import_offset: u32,

    pub resource_type: ResourceType,

    pub import_count: u16,

    pub flags: u8,

    pub stream_index: u8,

    /// Unused tail of the entry, kept so the directory can be rewritten unchanged
    pub reserved: [u8; 16],
}

impl ResourceEntry {
    /// First region holding data, the one a payload is read from
    pub fn primary_region(&self) -> Option<usize> {
        (0..REGION_COUNT).find(|&r| self.size_on_disk[r].size() != 0)
    }
}

/// Import table entry, preserved but not interpreted
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub resource_id: u64,
    pub offset: u32,
    pub padding: u32,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{
        BundleFlags, BundleHeader, ResourceEntry, ResourceType, SizeAndAlignment,
        RESOURCE_ENTRY_SIZE,
    };

    #[test]
    fn read_little_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            b'b', b'n', b'd', b'2',
            0x02, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x30, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0xD0, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00,
            0x09, 0x00, 0x00, 0x00,
        ]);

        let expected = BundleHeader {
            debug_data_offset: 0x30,
            resource_count: 1,
            resource_entries_offset: 0x80,
            region_offsets: [0xD0, 0x100, 0x100],
            flags: BundleFlags(BundleFlags::COMPRESSED | BundleFlags::HAS_DEBUG_DATA),
            ..Default::default()
        };

        let header = BundleHeader::read_le(&mut input)?;
        assert_eq!(header, expected);
        assert!(header.flags.compressed());
        assert!(header.flags.has_debug_data());
        assert!(!header.flags.main_memory_optimised());

        Ok(())
    }

    #[test]
    fn write_big_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            b'b', b'n', b'd', b'2',
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x03,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x28,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let header = BundleHeader {
            platform: 3,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write_be(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn resource_entry_is_eighty_bytes() -> Result<()> {
        let entry = ResourceEntry {
            resource_id: 0x1122_3344_5566_7788,
            resource_type: ResourceType::VEHICLE_LIST,
            size_on_disk: [
                SizeAndAlignment::new(0x220, 4).unwrap(),
                Default::default(),
                Default::default(),
            ],
            ..Default::default()
        };

        let mut actual = Vec::new();
        entry.write_le(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual.len(), RESOURCE_ENTRY_SIZE);
        assert_eq!(&actual[0x1C..0x20], &[0x20, 0x02, 0x00, 0x40]);
        assert_eq!(&actual[0x38..0x3C], &[0x05, 0x00, 0x01, 0x00]);

        let read = ResourceEntry::read_le(&mut Cursor::new(&actual))?;
        assert_eq!(read, entry);
        assert_eq!(read.primary_region(), Some(0));

        Ok(())
    }

    #[test]
    fn size_and_alignment_packing() {
        let packed = SizeAndAlignment(0x4000_0108);
        assert_eq!(packed.size(), 0x108);
        assert_eq!(packed.alignment_exponent(), 4);
        assert_eq!(packed.alignment(), 16);

        assert_eq!(packed.with_size(0x10), Some(SizeAndAlignment(0x4000_0010)));
        assert_eq!(packed.with_size(0x1000_0000), None);
        assert_eq!(SizeAndAlignment::new(1, 0x10), None);
    }

    #[test]
    fn resource_type_names() {
        assert_eq!(ResourceType::TRIGGER_DATA.to_string(), "TriggerData");
        assert_eq!(ResourceType(0x1234).to_string(), "0x00001234");
    }
}
