//! Vehicle list resource
//!
//! | Offset (bytes) | Field                  | Description                                     |
//! |----------------|------------------------|-------------------------------------------------|
//! | 0x0000         | Count                  | 4 bytes: Number of vehicle records              |
//! | 0x0004         | Table Offset           | 4 bytes: Always 16                              |
//! | 0x0008         | Reserved               | 8 bytes                                         |
//! | 0x0010         | Vehicles               | Count × 0x108 byte [`Vehicle`] records          |

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use bnd_bundle::{Endian, ResourceType};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, instrument};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cgs_id::CgsId,
    codec::{CodecOptions, FixedString, ResourceCodec},
    error::{Error, Result},
};

/// Size of the list header
pub const HEADER_SIZE: usize = 0x10;

/// Size of a [`Vehicle`] record
pub const VEHICLE_SIZE: usize = 0x108;

/// Counts above this are treated as a wrong byte order or corruption
pub const MAX_VEHICLES: u32 = 5000;

/// Damage limits at or above this value mark a record as garbage
pub const MAX_DAMAGE_LIMIT: f32 = 1000.0;

/// Flag word of [`GameplayData`]
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleFlags(pub u32);

impl VehicleFlags {
    pub const IS_RACE_VEHICLE: u32 = 1 << 0;
    pub const CAN_CHECK_TRAFFIC: u32 = 1 << 1;
    pub const CAN_BE_CHECKED: u32 = 1 << 2;
    pub const IS_TRAILER: u32 = 1 << 3;
    pub const CAN_TOW_TRAILER: u32 = 1 << 4;
    pub const CAN_BE_PAINTED: u32 = 1 << 5;
    pub const IS_FIRST_IN_SPEED_RANGE: u32 = 1 << 7;
    pub const HAS_SWITCHABLE_BOOST: u32 = 1 << 8;
    pub const IS_WIP: u32 = 1 << 10;
    pub const IS_FROM_V1_0: u32 = 1 << 11;
    pub const IS_FROM_V1_3: u32 = 1 << 12;
    pub const IS_FROM_V1_4: u32 = 1 << 13;

    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u32, enabled: bool) {
        if enabled {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }
}

/// Kind of vehicle, stored in the high nibble of the type byte
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VehicleType {
    #[default]
    Car,
    Bike,
    Plane,
    Unknown(u8),
}

impl From<u8> for VehicleType {
    fn from(value: u8) -> Self {
        match value {
            0 => VehicleType::Car,
            1 => VehicleType::Bike,
            2 => VehicleType::Plane,
            other => VehicleType::Unknown(other),
        }
    }
}

impl From<VehicleType> for u8 {
    fn from(value: VehicleType) -> Self {
        match value {
            VehicleType::Car => 0,
            VehicleType::Bike => 1,
            VehicleType::Plane => 2,
            VehicleType::Unknown(other) => other,
        }
    }
}

/// Boost behaviour, stored in the low nibble of the type byte
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoostType {
    #[default]
    Speed,
    Aggression,
    Stunt,
    None,
    Locked,
    Unknown(u8),
}

impl From<u8> for BoostType {
    fn from(value: u8) -> Self {
        match value {
            0 => BoostType::Speed,
            1 => BoostType::Aggression,
            2 => BoostType::Stunt,
            3 => BoostType::None,
            4 => BoostType::Locked,
            other => BoostType::Unknown(other),
        }
    }
}

impl From<BoostType> for u8 {
    fn from(value: BoostType) -> Self {
        match value {
            BoostType::Speed => 0,
            BoostType::Aggression => 1,
            BoostType::Stunt => 2,
            BoostType::None => 3,
            BoostType::Locked => 4,
            BoostType::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LiveryType {
    #[default]
    Default,
    Colour,
    Pattern,
    Silver,
    Gold,
    Community,
    Unknown(u8),
}

impl From<u8> for LiveryType {
    fn from(value: u8) -> Self {
        match value {
            0 => LiveryType::Default,
            1 => LiveryType::Colour,
            2 => LiveryType::Pattern,
            3 => LiveryType::Silver,
            4 => LiveryType::Gold,
            5 => LiveryType::Community,
            other => LiveryType::Unknown(other),
        }
    }
}

impl From<LiveryType> for u8 {
    fn from(value: LiveryType) -> Self {
        match value {
            LiveryType::Default => 0,
            LiveryType::Colour => 1,
            LiveryType::Pattern => 2,
            LiveryType::Silver => 3,
            LiveryType::Gold => 4,
            LiveryType::Community => 5,
            LiveryType::Unknown(other) => other,
        }
    }
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GameplayData {
    pub damage_limit: f32,
    pub flags: VehicleFlags,
    pub boost_bar_length: u8,
    pub unlock_rank: u8,
    pub boost_capacity: u8,
    pub strength_stat: u8,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AudioData {
    pub exhaust_name: CgsId,
    pub exhaust_entity_key: u64,
    pub engine_entity_key: u64,
    pub engine_name: CgsId,
    pub rival_unlock_hash: u32,
    pub reserved: u32,
    pub won_car_voice_over_key: u64,
    pub rival_released_voice_over_key: u64,
    pub music_loop_key: u64,
    pub ai_exhaust_index: [u8; 3],
    pub reserved_tail: [u8; 5],
}

/// One vehicle record
#[binrw]
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vehicle {
    pub id: CgsId,
    pub parent_id: CgsId,

    pub wheel_name: FixedString<32>,
    pub vehicle_name: FixedString<64>,
    pub manufacturer: FixedString<32>,

    pub gameplay: GameplayData,
    pub gameplay_reserved: u32,
    pub attrib_collection_key: u64,
    pub audio: AudioData,
    pub category: u32,

    #[br(temp)]
    #[bw(calc = (u8::from(*vehicle_type) << 4) | (u8::from(*boost_type) & 0x0F))]
    packed_types: u8,

    #[br(calc = VehicleType::from(packed_types >> 4))]
    #[bw(ignore)]
    pub vehicle_type: VehicleType,

    #[br(calc = BoostType::from(packed_types & 0x0F))]
    #[bw(ignore)]
    pub boost_type: BoostType,

    #[br(map = |raw: u8| LiveryType::from(raw))]
    #[bw(map = |livery: &LiveryType| u8::from(*livery))]
    pub livery_type: LiveryType,

    pub top_speed_normal: u8,
    pub top_speed_boost: u8,
    pub top_speed_normal_gui_stat: u8,
    pub top_speed_boost_gui_stat: u8,
    pub colour_index: u8,
    pub palette_index: u8,
    pub reserved: [u8; 12],
}

impl Vehicle {
    /// Records that fail this are padding or garbage left behind by the tools
    pub fn is_plausible(&self) -> bool {
        let damage = self.gameplay.damage_limit;
        !self.id.is_none()
            && !self.vehicle_name.is_empty()
            && damage.is_finite()
            && (0.0..MAX_DAMAGE_LIMIT).contains(&damage)
            && self.category != u32::MAX
    }
}

/// Decoded vehicle list
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleList {
    /// Byte order the list was decoded with, used again when encoding
    pub endian: Endian,

    /// Words following the table offset in the header
    pub reserved: [u32; 2],

    pub vehicles: Vec<Vehicle>,
}

fn read_u32(data: &[u8], endian: Endian) -> u32 {
    match endian {
        Endian::Little => LittleEndian::read_u32(data),
        Endian::Big => BigEndian::read_u32(data),
    }
}

impl VehicleList {
    /// Pick the byte order whose declared count is believable
    fn choose_endian(payload: &[u8], endian: Endian) -> Result<(Endian, u32)> {
        let primary = read_u32(payload, endian);
        if (1..=MAX_VEHICLES).contains(&primary) {
            return Ok((endian, primary));
        }

        let other = endian.opposite();
        let secondary = read_u32(payload, other);
        if (1..=MAX_VEHICLES).contains(&secondary) {
            debug!(primary, secondary, "vehicle count only makes sense as {other}");
            return Ok((other, secondary));
        }

        if primary > MAX_VEHICLES && secondary > MAX_VEHICLES {
            return Err(Error::ImplausibleCount {
                what: "vehicle",
                count: primary,
                limit: MAX_VEHICLES,
            });
        }

        Ok((if primary == 0 { endian } else { other }, 0))
    }
}

impl ResourceCodec for VehicleList {
    const RESOURCE_TYPE: ResourceType = ResourceType::VEHICLE_LIST;

    #[instrument(skip(payload, _options), fields(size = payload.len()), err)]
    fn decode(payload: &[u8], endian: Endian, _options: &CodecOptions) -> Result<Self> {
        if payload.len() < HEADER_SIZE {
            return Err(Error::OutOfBounds {
                what: "vehicle list header",
                offset: 0,
                length: HEADER_SIZE as u64,
                payload_len: payload.len(),
            });
        }

        let (endian, declared) = Self::choose_endian(payload, endian)?;
        let table_offset = match read_u32(&payload[4..], endian) as usize {
            offset if (HEADER_SIZE..=payload.len()).contains(&offset) => offset,
            _ => HEADER_SIZE,
        };
        let reserved = [
            read_u32(&payload[8..], endian),
            read_u32(&payload[12..], endian),
        ];

        let fits = ((payload.len() - table_offset) / VEHICLE_SIZE) as u32;
        let count = declared.min(fits);
        if count < declared {
            debug!(declared, count, "vehicle count clamped to the payload size");
        }

        let mut reader = Cursor::new(payload);
        let mut vehicles = Vec::with_capacity(count as usize);
        for index in 0..count as usize {
            reader.set_position((table_offset + index * VEHICLE_SIZE) as u64);
            let vehicle = Vehicle::read_options(&mut reader, endian.into(), ())?;

            if vehicle.is_plausible() {
                vehicles.push(vehicle);
            } else {
                debug!(index, id = %vehicle.id, "dropping implausible vehicle record");
            }
        }

        Ok(VehicleList {
            endian,
            reserved,
            vehicles,
        })
    }

    /// Encodes in the byte order the list was decoded with unless the options override it
    #[instrument(skip(self, _endian, options), fields(vehicles = self.vehicles.len()), err)]
    fn encode(&self, _endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        let endian = options.endian.unwrap_or(self.endian);
        let mut writer = Cursor::new(Vec::with_capacity(
            HEADER_SIZE + self.vehicles.len() * VEHICLE_SIZE,
        ));

        (self.vehicles.len() as u32).write_options(&mut writer, endian.into(), ())?;
        (HEADER_SIZE as u32).write_options(&mut writer, endian.into(), ())?;
        self.reserved.write_options(&mut writer, endian.into(), ())?;

        for vehicle in &self.vehicles {
            vehicle.write_options(&mut writer, endian.into(), ())?;
        }

        Ok(writer.into_inner())
    }

    fn is_plausible(payload: &[u8], endian: Endian) -> bool {
        Self::decode(payload, endian, &CodecOptions::default())
            .map(|list| !list.vehicles.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::cgs_id::CgsId;
    use crate::codec::{CodecOptions, FixedString, ResourceCodec};
    use crate::error::{Error, Result};
    use crate::vehicle_list::{
        BoostType, GameplayData, LiveryType, Vehicle, VehicleFlags, VehicleList, VehicleType,
        VEHICLE_SIZE,
    };
    use bnd_bundle::Endian;

    pub(crate) fn vehicle(id: &str, name: &str) -> Vehicle {
        Vehicle {
            id: CgsId::encode(id).unwrap(),
            parent_id: CgsId::encode("PARENT").unwrap(),
            wheel_name: FixedString::new("WHE_002").unwrap(),
            vehicle_name: FixedString::new(name).unwrap(),
            manufacturer: FixedString::new("Carson").unwrap(),
            gameplay: GameplayData {
                damage_limit: 1.5,
                flags: VehicleFlags(VehicleFlags::CAN_BE_PAINTED | VehicleFlags::IS_RACE_VEHICLE),
                boost_bar_length: 4,
                unlock_rank: 2,
                boost_capacity: 6,
                strength_stat: 3,
            },
            category: 0x10,
            vehicle_type: VehicleType::Bike,
            boost_type: BoostType::Stunt,
            livery_type: LiveryType::Gold,
            top_speed_normal: 180,
            top_speed_boost: 210,
            colour_index: 7,
            palette_index: 1,
            ..Default::default()
        }
    }

    pub(crate) fn two_vehicles() -> VehicleList {
        VehicleList {
            endian: Endian::Little,
            reserved: [0, 0],
            vehicles: vec![vehicle("VEH_HOTROD", "Hot Rod"), vehicle("VEH_CARBBX", "Carbon BBX")],
        }
    }

    #[test]
    fn record_layout() -> Result<()> {
        let list = two_vehicles();
        let data = list.encode(Endian::Little, &CodecOptions::default())?;

        assert_eq!(data.len(), 0x10 + 2 * VEHICLE_SIZE);
        assert_str_eq!(
            format!("{:02X?}", &data[0..0x10]),
            format!(
                "{:02X?}",
                [0x02, 0, 0, 0, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
            )
        );

        let record = &data[0x10..0x10 + VEHICLE_SIZE];
        assert_eq!(&record[0x10..0x17], b"WHE_002");
        assert_eq!(&record[0x30..0x37], b"Hot Rod");
        assert_eq!(&record[0x70..0x76], b"Carson");
        assert_eq!(&record[0x90..0x94], &1.5f32.to_le_bytes());
        assert_eq!(&record[0xF0..0xF4], &[0x10, 0, 0, 0]);
        assert_eq!(record[0xF4], 0x12);
        assert_eq!(record[0xF5], 4);
        assert_eq!(record[0xF6], 180);
        assert_eq!(record[0xFA], 7);
        assert_eq!(record[0xFB], 1);

        Ok(())
    }

    #[test]
    fn round_trip_both_byte_orders() -> Result<()> {
        for endian in [Endian::Little, Endian::Big] {
            let mut list = two_vehicles();
            list.endian = endian;

            let data = list.encode(endian, &CodecOptions::default())?;
            let decoded = VehicleList::decode(&data, endian, &CodecOptions::default())?;
            assert_eq!(decoded, list);
            assert_eq!(decoded.encode(endian, &CodecOptions::default())?, data);
        }

        Ok(())
    }

    #[traced_test]
    #[test]
    fn retry_in_opposite_byte_order() -> Result<()> {
        let mut list = two_vehicles();
        list.endian = Endian::Big;
        let data = list.encode(Endian::Big, &CodecOptions::default())?;

        // a count of 0x02000000 read as little endian is not believable
        let decoded = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded.endian, Endian::Big);
        assert_eq!(decoded.vehicles.len(), 2);
        assert!(logs_contain("only makes sense as big endian"));

        Ok(())
    }

    #[test]
    fn implausible_counts() {
        let mut data = vec![0xFF; 0x10];
        data[4..8].copy_from_slice(&[0x10, 0, 0, 0]);
        assert!(matches!(
            VehicleList::decode(&data, Endian::Little, &CodecOptions::default()),
            Err(Error::ImplausibleCount { .. })
        ));
    }

    #[test]
    fn zero_count_is_empty() -> Result<()> {
        let data = [0u8; 0x10];
        let list = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert!(list.vehicles.is_empty());
        assert!(!VehicleList::is_plausible(&data, Endian::Little));

        Ok(())
    }

    #[test]
    fn count_is_clamped() -> Result<()> {
        let mut data = two_vehicles().encode(Endian::Little, &CodecOptions::default())?;
        data[0] = 40;
        let list = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(list.vehicles.len(), 2);

        data.truncate(data.len() - 1);
        let list = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(list.vehicles.len(), 1);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn implausible_records_are_dropped() -> Result<()> {
        let mut list = two_vehicles();
        list.vehicles.push(Vehicle {
            category: u32::MAX,
            ..vehicle("VEH_BROKEN", "Broken")
        });
        list.vehicles.push(Vehicle {
            gameplay: GameplayData {
                damage_limit: 5000.0,
                ..Default::default()
            },
            ..vehicle("VEH_HEAVY", "Heavy")
        });
        list.vehicles.push(vehicle("", "Nameless"));
        list.vehicles.push(vehicle("VEH_EMPTY", ""));

        let data = list.encode(Endian::Little, &CodecOptions::default())?;
        let decoded = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded.vehicles, two_vehicles().vehicles);
        assert!(logs_contain("dropping implausible vehicle record"));

        Ok(())
    }

    #[test]
    fn unknown_enum_values_survive() -> Result<()> {
        let mut list = two_vehicles();
        list.vehicles[0].vehicle_type = VehicleType::Unknown(0xA);
        list.vehicles[0].boost_type = BoostType::Unknown(0x9);
        list.vehicles[0].livery_type = LiveryType::Unknown(0x42);

        let data = list.encode(Endian::Little, &CodecOptions::default())?;
        assert_eq!(data[0x10 + 0xF4], 0xA9);

        let decoded = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded, list);

        Ok(())
    }

    #[test]
    fn names_must_fit() {
        assert!(FixedString::<32>::new(&"W".repeat(33)).is_err());
        assert!(FixedString::<32>::new(&"W".repeat(32)).is_ok());
    }

    #[test]
    fn raw_name_bytes_survive() -> Result<()> {
        let mut data = two_vehicles().encode(Endian::Little, &CodecOptions::default())?;
        let record = 0x10;
        // "WHE_002", terminator, then a stray byte
        data[record + 0x10 + 9] = 0x41;
        // not UTF-8
        data[record + 0x70] = 0xE9;

        let decoded = VehicleList::decode(&data, Endian::Little, &CodecOptions::default())?;
        let vehicle = &decoded.vehicles[0];
        assert_eq!(vehicle.wheel_name.text(), "WHE_002");
        assert!(!vehicle.wheel_name.is_clean());
        assert_eq!(vehicle.manufacturer.as_bytes()[0], 0xE9);
        assert!(!vehicle.manufacturer.is_clean());

        assert_eq!(decoded.encode(Endian::Little, &CodecOptions::default())?, data);

        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn raw_name_bytes_survive_json() -> Result<()> {
        let mut list = two_vehicles();
        let mut raw = [0u8; 32];
        raw[..3].copy_from_slice(&[0x43, 0xE9, 0x00]);
        raw[31] = 0x7F;
        list.vehicles[1].manufacturer = FixedString::from_bytes(raw);

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["vehicles"][0]["manufacturer"], "Carson");
        assert!(json["vehicles"][1]["manufacturer"].is_array());

        let parsed: VehicleList = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, list);

        Ok(())
    }

    #[test]
    fn flags_helper() {
        let mut flags = VehicleFlags::default();
        flags.set(VehicleFlags::IS_TRAILER, true);
        assert!(flags.contains(VehicleFlags::IS_TRAILER));
        flags.set(VehicleFlags::IS_TRAILER, false);
        assert_eq!(flags, VehicleFlags(0));
    }
}
