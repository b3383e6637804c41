//! Trigger data resource
//!
//! All offsets are relative to the start of the payload. The header locates eight sections of
//! fixed size records and the region table:
//!
//! | Offset (bytes) | Field                   | Description                                    |
//! |----------------|-------------------------|------------------------------------------------|
//! | 0x00           | Version                 | 4 bytes                                        |
//! | 0x04           | Size                    | 4 bytes: Size of the payload                   |
//! | 0x08           | Reserved                | 8 bytes                                        |
//! | 0x10           | Player Start Position   | 16 bytes: [`Vec4`]                             |
//! | 0x20           | Player Start Direction  | 16 bytes: [`Vec4`]                             |
//! | 0x30           | Landmarks               | offset, count, online landmark count           |
//! | 0x3C           | Signature Stunts        | offset, count                                  |
//! | 0x44           | Generic Regions         | offset, count                                  |
//! | 0x4C           | Killzones               | offset, count                                  |
//! | 0x54           | Blackspots              | offset, count                                  |
//! | 0x5C           | VFX Box Regions         | offset, count                                  |
//! | 0x64           | Roaming Locations       | offset, count                                  |
//! | 0x6C           | Spawn Locations         | offset, count                                  |
//! | 0x74           | Region Table            | offset, count: region offsets by region index  |
//! | 0x7C           | Reserved                | 4 bytes                                        |
//!
//! Landmarks, stunts and killzones point at further tables of offsets. Stunts and killzones point
//! at generic regions, decoding maps those pointers back to generic region ids and encoding maps
//! the ids to wherever the regions were written.

use std::collections::HashMap;
use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use bnd_bundle::{Endian, ResourceType};
use tracing::{debug, instrument};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cgs_id::CgsId,
    codec::{pad_to, CodecOptions, ResourceCodec},
    error::{slice, Error, Result},
};

pub const HEADER_SIZE: usize = 0x80;
pub const REGION_SIZE: usize = 0x2C;
pub const LANDMARK_SIZE: usize = 0x34;
pub const GENERIC_REGION_SIZE: usize = 0x38;
pub const BLACKSPOT_SIZE: usize = 0x34;
pub const VFX_BOX_REGION_SIZE: usize = 0x30;
pub const SIGNATURE_STUNT_SIZE: usize = 0x18;
pub const KILLZONE_SIZE: usize = 0x10;
pub const ROAMING_LOCATION_SIZE: usize = 0x20;
pub const SPAWN_LOCATION_SIZE: usize = 0x30;
pub const STARTING_GRID_SIZE: usize = 0x100;

/// Positions in a starting grid
pub const GRID_SLOTS: usize = 8;

/// Region indices are 16 bit
pub const MAX_REGIONS: u32 = 0x8000;

const SECTION_ALIGNMENT: usize = 16;

// field offsets of the back-patched pointers inside their records
const LANDMARK_GRID_TABLE: usize = REGION_SIZE;
const STUNT_ELEMENT_TABLE: usize = 0x10;
const KILLZONE_TRIGGER_TABLE: usize = 0x00;
const KILLZONE_REGION_IDS: usize = 0x08;

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Vec4 { x, y, z, w }
    }
}

/// Oriented box a region covers
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxRegion {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub dimensions: [f32; 3],
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegionType {
    #[default]
    Landmark,
    Blackspot,
    GenericRegion,
    VfxBoxRegion,
    Unknown(u8),
}

impl From<u8> for RegionType {
    fn from(value: u8) -> Self {
        match value {
            0 => RegionType::Landmark,
            1 => RegionType::Blackspot,
            2 => RegionType::GenericRegion,
            3 => RegionType::VfxBoxRegion,
            other => RegionType::Unknown(other),
        }
    }
}

impl From<RegionType> for u8 {
    fn from(value: RegionType) -> Self {
        match value {
            RegionType::Landmark => 0,
            RegionType::Blackspot => 1,
            RegionType::GenericRegion => 2,
            RegionType::VfxBoxRegion => 3,
            RegionType::Unknown(other) => other,
        }
    }
}

/// Fields shared by every record listed in the region table
#[binrw]
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerRegion {
    pub box_region: BoxRegion,
    pub id: i32,

    /// Position in the region table, reassigned on encode
    pub region_index: i16,

    #[br(map = |raw: u8| RegionType::from(raw))]
    #[bw(map = |region_type: &RegionType| u8::from(*region_type))]
    pub region_type: RegionType,

    #[br(map = |raw: u8| raw != 0)]
    #[bw(map = |enabled: &bool| *enabled as u8)]
    pub enabled: bool,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StartingGrid {
    pub positions: [Vec4; GRID_SLOTS],
    pub directions: [Vec4; GRID_SLOTS],
}

#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Landmark {
    pub region: TriggerRegion,
    pub design_index: u8,
    pub district: u8,
    pub flags: u8,
    pub starting_grids: Vec<StartingGrid>,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenericRegion {
    pub region: TriggerRegion,
    pub group_id: i32,
    pub camera_cut_1: i16,
    pub camera_cut_2: i16,
    pub camera_type_1: i8,
    pub camera_type_2: i8,
    pub generic_type: u8,
    pub one_way: i8,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Blackspot {
    pub region: TriggerRegion,
    pub score_type: u8,
    pub reserved: [u8; 3],
    pub score_amount: i32,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VfxBoxRegion {
    pub region: TriggerRegion,
    pub reserved: u32,
}

#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignatureStunt {
    pub id: CgsId,
    pub camera: i64,

    /// Ids of the generic regions making up the stunt
    pub generic_regions: Vec<i32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Killzone {
    /// Ids of the generic regions that trigger the killzone
    pub generic_regions: Vec<i32>,
    pub region_ids: Vec<u64>,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoamingLocation {
    pub position: Vec4,
    pub district_index: u8,
    pub reserved: [u8; 15],
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpawnLocation {
    pub position: Vec4,
    pub direction: Vec4,
    pub junkyard_id: CgsId,
    pub spawn_type: u8,
    pub reserved: [u8; 7],
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Section {
    offset: u32,
    count: u32,
}

impl Section {
    fn new(offset: u32, count: usize) -> Self {
        Section {
            offset,
            count: count as u32,
        }
    }
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
struct TriggerHeader {
    version: i32,
    size: u32,
    reserved: [u8; 8],
    player_start_position: Vec4,
    player_start_direction: Vec4,
    landmarks: Section,
    online_landmark_count: u32,
    signature_stunts: Section,
    generic_regions: Section,
    killzones: Section,
    blackspots: Section,
    vfx_box_regions: Section,
    roaming_locations: Section,
    spawn_locations: Section,
    region_table: Section,
    reserved_tail: u32,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
struct LandmarkRecord {
    region: TriggerRegion,
    grid_table_offset: u32,
    grid_count: u8,
    design_index: u8,
    district: u8,
    flags: u8,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
struct SignatureStuntRecord {
    id: CgsId,
    camera: i64,
    element_table_offset: u32,
    element_count: i32,
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
struct KillzoneRecord {
    trigger_table_offset: u32,
    trigger_count: i32,
    region_ids_offset: u32,
    region_id_count: i32,
}

/// Decoded trigger data
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerData {
    pub version: i32,
    pub player_start_position: Vec4,
    pub player_start_direction: Vec4,
    pub online_landmark_count: u32,
    pub landmarks: Vec<Landmark>,
    pub signature_stunts: Vec<SignatureStunt>,
    pub generic_regions: Vec<GenericRegion>,
    pub killzones: Vec<Killzone>,
    pub blackspots: Vec<Blackspot>,
    pub vfx_box_regions: Vec<VfxBoxRegion>,
    pub roaming_locations: Vec<RoamingLocation>,
    pub spawn_locations: Vec<SpawnLocation>,
}

fn read_records<T>(
    payload: &[u8],
    what: &'static str,
    offset: u32,
    count: u32,
    size: usize,
    endian: Endian,
) -> Result<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let data = slice(payload, what, offset as u64, count as u64 * size as u64)?;
    let mut reader = Cursor::new(data);
    (0..count as u64)
        .map(|index| {
            reader.set_position(index * size as u64);
            T::read_options(&mut reader, endian.into(), ()).map_err(Error::from)
        })
        .collect()
}

fn signed_count(what: &'static str, count: i32) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::ImplausibleCount {
        what,
        count: count as u32,
        limit: i32::MAX as u32,
    })
}

fn align(writer: &mut Cursor<Vec<u8>>, alignment: usize) -> u32 {
    let data = writer.get_mut();
    pad_to(data, alignment);
    let end = data.len() as u64;
    writer.set_position(end);
    end as u32
}

fn patch_u32(writer: &mut Cursor<Vec<u8>>, at: usize, value: u32, endian: Endian) -> Result<()> {
    let end = writer.get_ref().len() as u64;
    writer.set_position(at as u64);
    value.write_options(writer, endian.into(), ())?;
    writer.set_position(end);
    Ok(())
}

impl TriggerData {
    /// Number of records listed in the region table
    pub fn region_count(&self) -> usize {
        self.landmarks.len()
            + self.generic_regions.len()
            + self.blackspots.len()
            + self.vfx_box_regions.len()
    }

    /// Give every region a unique index, VFX boxes first, then blackspots, generic regions and
    /// landmarks
    pub fn renumber_regions(&mut self) {
        let regions = self
            .vfx_box_regions
            .iter_mut()
            .map(|r| &mut r.region)
            .chain(self.blackspots.iter_mut().map(|r| &mut r.region))
            .chain(self.generic_regions.iter_mut().map(|r| &mut r.region))
            .chain(self.landmarks.iter_mut().map(|r| &mut r.region));

        for (index, region) in regions.enumerate() {
            region.region_index = index as i16;
        }
    }

    fn decode_landmark(payload: &[u8], record: LandmarkRecord, endian: Endian) -> Result<Landmark> {
        let table = read_records::<u32>(
            payload,
            "starting grid table",
            record.grid_table_offset,
            record.grid_count as u32,
            4,
            endian,
        )?;

        let starting_grids = table
            .into_iter()
            .map(|offset| {
                read_records::<StartingGrid>(
                    payload,
                    "starting grid",
                    offset,
                    1,
                    STARTING_GRID_SIZE,
                    endian,
                )
                .map(|mut grids| grids.remove(0))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Landmark {
            region: record.region,
            design_index: record.design_index,
            district: record.district,
            flags: record.flags,
            starting_grids,
        })
    }
}

/// Map a table of generic region offsets back to region ids
fn generic_region_ids(
    payload: &[u8],
    generic_ids: &HashMap<u32, i32>,
    record: impl Fn() -> String,
    offset: u32,
    count: u32,
    endian: Endian,
) -> Result<Vec<i32>> {
    read_records::<u32>(payload, "generic region table", offset, count, 4, endian)?
        .into_iter()
        .map(|offset| {
            generic_ids
                .get(&offset)
                .copied()
                .ok_or_else(|| Error::DanglingOffset {
                    record: record(),
                    offset,
                })
        })
        .collect()
}

impl ResourceCodec for TriggerData {
    const RESOURCE_TYPE: ResourceType = ResourceType::TRIGGER_DATA;

    #[instrument(skip(payload, _options), fields(size = payload.len()), err)]
    fn decode(payload: &[u8], endian: Endian, _options: &CodecOptions) -> Result<Self> {
        let header_data = slice(payload, "trigger data header", 0, HEADER_SIZE as u64)?;
        let header = TriggerHeader::read_options(&mut Cursor::new(header_data), endian.into(), ())?;

        let generic_regions: Vec<GenericRegion> = read_records(
            payload,
            "generic regions",
            header.generic_regions.offset,
            header.generic_regions.count,
            GENERIC_REGION_SIZE,
            endian,
        )?;
        let generic_ids: HashMap<u32, i32> = generic_regions
            .iter()
            .enumerate()
            .map(|(index, generic)| {
                let offset = header.generic_regions.offset + (index * GENERIC_REGION_SIZE) as u32;
                (offset, generic.region.id)
            })
            .collect();

        let landmarks = read_records::<LandmarkRecord>(
            payload,
            "landmarks",
            header.landmarks.offset,
            header.landmarks.count,
            LANDMARK_SIZE,
            endian,
        )?
        .into_iter()
        .map(|record| Self::decode_landmark(payload, record, endian))
        .collect::<Result<Vec<_>>>()?;

        let signature_stunts = read_records::<SignatureStuntRecord>(
            payload,
            "signature stunts",
            header.signature_stunts.offset,
            header.signature_stunts.count,
            SIGNATURE_STUNT_SIZE,
            endian,
        )?
        .into_iter()
        .map(|record| -> Result<SignatureStunt> {
            let count = signed_count("signature stunt element", record.element_count)?;
            Ok(SignatureStunt {
                id: record.id,
                camera: record.camera,
                generic_regions: generic_region_ids(
                    payload,
                    &generic_ids,
                    || format!("signature stunt {}", record.id),
                    record.element_table_offset,
                    count,
                    endian,
                )?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let killzones = read_records::<KillzoneRecord>(
            payload,
            "killzones",
            header.killzones.offset,
            header.killzones.count,
            KILLZONE_SIZE,
            endian,
        )?
        .into_iter()
        .enumerate()
        .map(|(index, record)| -> Result<Killzone> {
            let trigger_count = signed_count("killzone trigger", record.trigger_count)?;
            let region_id_count = signed_count("killzone region id", record.region_id_count)?;
            Ok(Killzone {
                generic_regions: generic_region_ids(
                    payload,
                    &generic_ids,
                    || format!("killzone {index}"),
                    record.trigger_table_offset,
                    trigger_count,
                    endian,
                )?,
                region_ids: read_records(
                    payload,
                    "killzone region ids",
                    record.region_ids_offset,
                    region_id_count,
                    8,
                    endian,
                )?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let result = TriggerData {
            version: header.version,
            player_start_position: header.player_start_position,
            player_start_direction: header.player_start_direction,
            online_landmark_count: header.online_landmark_count,
            landmarks,
            signature_stunts,
            generic_regions,
            killzones,
            blackspots: read_records(
                payload,
                "blackspots",
                header.blackspots.offset,
                header.blackspots.count,
                BLACKSPOT_SIZE,
                endian,
            )?,
            vfx_box_regions: read_records(
                payload,
                "vfx box regions",
                header.vfx_box_regions.offset,
                header.vfx_box_regions.count,
                VFX_BOX_REGION_SIZE,
                endian,
            )?,
            roaming_locations: read_records(
                payload,
                "roaming locations",
                header.roaming_locations.offset,
                header.roaming_locations.count,
                ROAMING_LOCATION_SIZE,
                endian,
            )?,
            spawn_locations: read_records(
                payload,
                "spawn locations",
                header.spawn_locations.offset,
                header.spawn_locations.count,
                SPAWN_LOCATION_SIZE,
                endian,
            )?,
        };

        if header.region_table.count as usize != result.region_count() {
            debug!(
                table = header.region_table.count,
                regions = result.region_count(),
                "region table does not list every region"
            );
        }

        Ok(result)
    }

    /// Lays the sections out from scratch with fresh region indices
    #[instrument(skip(self, options), fields(regions = self.region_count()), err)]
    fn encode(&self, endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        let endian = options.endian.unwrap_or(endian);
        let e: binrw::Endian = endian.into();

        if self.region_count() > MAX_REGIONS as usize {
            return Err(Error::ImplausibleCount {
                what: "trigger region",
                count: self.region_count() as u32,
                limit: MAX_REGIONS,
            });
        }

        let mut graph = self.clone();
        graph.renumber_regions();

        let mut header = TriggerHeader {
            version: graph.version,
            player_start_position: graph.player_start_position,
            player_start_direction: graph.player_start_direction,
            online_landmark_count: graph.online_landmark_count,
            ..Default::default()
        };
        let mut region_offsets = vec![0u32; graph.region_count()];
        let mut writer = Cursor::new(vec![0u8; HEADER_SIZE]);

        // primary sections, indirect offsets are patched in further down
        let landmarks = align(&mut writer, SECTION_ALIGNMENT);
        for landmark in &graph.landmarks {
            region_offsets[landmark.region.region_index as usize] = writer.position() as u32;
            let grid_count =
                u8::try_from(landmark.starting_grids.len()).map_err(|_| Error::ImplausibleCount {
                    what: "starting grid",
                    count: landmark.starting_grids.len() as u32,
                    limit: u8::MAX as u32,
                })?;

            LandmarkRecord {
                region: landmark.region.clone(),
                grid_table_offset: 0,
                grid_count,
                design_index: landmark.design_index,
                district: landmark.district,
                flags: landmark.flags,
            }
            .write_options(&mut writer, e, ())?;
        }
        header.landmarks = Section::new(landmarks, graph.landmarks.len());

        let stunts = align(&mut writer, SECTION_ALIGNMENT);
        for stunt in &graph.signature_stunts {
            SignatureStuntRecord {
                id: stunt.id,
                camera: stunt.camera,
                element_table_offset: 0,
                element_count: stunt.generic_regions.len() as i32,
            }
            .write_options(&mut writer, e, ())?;
        }
        header.signature_stunts = Section::new(stunts, graph.signature_stunts.len());

        let generics = align(&mut writer, SECTION_ALIGNMENT);
        let mut generic_offsets: HashMap<i32, u32> = HashMap::new();
        for generic in &graph.generic_regions {
            let offset = writer.position() as u32;
            if generic_offsets.insert(generic.region.id, offset).is_some() {
                return Err(Error::DuplicateRegionId {
                    id: generic.region.id,
                });
            }
            region_offsets[generic.region.region_index as usize] = offset;
            generic.write_options(&mut writer, e, ())?;
        }
        header.generic_regions = Section::new(generics, graph.generic_regions.len());

        let killzones = align(&mut writer, SECTION_ALIGNMENT);
        for killzone in &graph.killzones {
            KillzoneRecord {
                trigger_table_offset: 0,
                trigger_count: killzone.generic_regions.len() as i32,
                region_ids_offset: 0,
                region_id_count: killzone.region_ids.len() as i32,
            }
            .write_options(&mut writer, e, ())?;
        }
        header.killzones = Section::new(killzones, graph.killzones.len());

        let blackspots = align(&mut writer, SECTION_ALIGNMENT);
        for blackspot in &graph.blackspots {
            region_offsets[blackspot.region.region_index as usize] = writer.position() as u32;
            blackspot.write_options(&mut writer, e, ())?;
        }
        header.blackspots = Section::new(blackspots, graph.blackspots.len());

        let vfx_box_regions = align(&mut writer, SECTION_ALIGNMENT);
        for vfx in &graph.vfx_box_regions {
            region_offsets[vfx.region.region_index as usize] = writer.position() as u32;
            vfx.write_options(&mut writer, e, ())?;
        }
        header.vfx_box_regions = Section::new(vfx_box_regions, graph.vfx_box_regions.len());

        let roaming = align(&mut writer, SECTION_ALIGNMENT);
        graph.roaming_locations.write_options(&mut writer, e, ())?;
        header.roaming_locations = Section::new(roaming, graph.roaming_locations.len());

        let spawns = align(&mut writer, SECTION_ALIGNMENT);
        graph.spawn_locations.write_options(&mut writer, e, ())?;
        header.spawn_locations = Section::new(spawns, graph.spawn_locations.len());

        // indirect tables
        for (index, landmark) in graph.landmarks.iter().enumerate() {
            if landmark.starting_grids.is_empty() {
                continue;
            }

            let mut grid_offsets = Vec::with_capacity(landmark.starting_grids.len());
            for grid in &landmark.starting_grids {
                grid_offsets.push(align(&mut writer, SECTION_ALIGNMENT));
                grid.write_options(&mut writer, e, ())?;
            }

            let table = align(&mut writer, 4);
            grid_offsets.write_options(&mut writer, e, ())?;
            let owner = landmarks as usize + index * LANDMARK_SIZE;
            patch_u32(&mut writer, owner + LANDMARK_GRID_TABLE, table, endian)?;
        }

        let resolve = |ids: &[i32], record: &dyn Fn() -> String| -> Result<Vec<u32>> {
            ids.iter()
                .map(|id| {
                    generic_offsets
                        .get(id)
                        .copied()
                        .ok_or_else(|| Error::DanglingReference {
                            record: record(),
                            id: *id,
                        })
                })
                .collect()
        };

        for (index, stunt) in graph.signature_stunts.iter().enumerate() {
            let elements = resolve(&stunt.generic_regions, &|| {
                format!("signature stunt {}", stunt.id)
            })?;
            if elements.is_empty() {
                continue;
            }

            let table = align(&mut writer, 4);
            elements.write_options(&mut writer, e, ())?;
            let owner = stunts as usize + index * SIGNATURE_STUNT_SIZE;
            patch_u32(&mut writer, owner + STUNT_ELEMENT_TABLE, table, endian)?;
        }

        for (index, killzone) in graph.killzones.iter().enumerate() {
            let owner = killzones as usize + index * KILLZONE_SIZE;
            let triggers = resolve(&killzone.generic_regions, &|| format!("killzone {index}"))?;

            if !triggers.is_empty() {
                let table = align(&mut writer, 4);
                triggers.write_options(&mut writer, e, ())?;
                patch_u32(&mut writer, owner + KILLZONE_TRIGGER_TABLE, table, endian)?;
            }

            if !killzone.region_ids.is_empty() {
                let ids = align(&mut writer, 8);
                killzone.region_ids.write_options(&mut writer, e, ())?;
                patch_u32(&mut writer, owner + KILLZONE_REGION_IDS, ids, endian)?;
            }
        }

        let region_table = align(&mut writer, 4);
        region_offsets.write_options(&mut writer, e, ())?;
        header.region_table = Section::new(region_table, region_offsets.len());

        header.size = writer.get_ref().len() as u32;
        writer.set_position(0);
        header.write_options(&mut writer, e, ())?;

        Ok(writer.into_inner())
    }

    fn is_plausible(payload: &[u8], endian: Endian) -> bool {
        payload.len() >= HEADER_SIZE && Self::decode(payload, endian, &CodecOptions::default()).is_ok()
    }
}
