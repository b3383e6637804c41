//! Challenge list resource
//!
//! | Offset (bytes) | Field                  | Description                                     |
//! |----------------|------------------------|-------------------------------------------------|
//! | 0x0000         | Count                  | 4 bytes: Number of challenges                   |
//! | 0x0004         | Table Offset           | 4 bytes: Always 16                              |
//! | 0x0008         | Reserved               | 8 bytes                                         |
//! | 0x0010         | Challenges             | Count × 0x98 byte [`Challenge`] records         |

use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use bnd_bundle::{Endian, ResourceType};
use tracing::{debug, instrument};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cgs_id::CgsId,
    codec::{CodecOptions, ResourceCodec},
    error::{slice, Result},
};

/// Size of the list header
pub const HEADER_SIZE: usize = 0x10;

/// Size of a [`Challenge`] record
pub const CHALLENGE_SIZE: usize = 0x98;

/// Size of a [`ChallengeAction`]
pub const ACTION_SIZE: usize = 0x38;

/// One goal of a challenge
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChallengeAction {
    pub action_type: u8,
    pub coop_type: u8,
    pub modifier: u8,
    pub combine_action_type: u8,
    pub location_count: u8,
    pub location_types: [u8; 4],
    pub target_count: u8,
    pub reserved: [u8; 2],
    pub locations: [u32; 4],
    pub target_values: [i32; 2],
    pub target_data_types: [u8; 2],
    pub reserved_targets: [u8; 2],
    pub time_limit: f32,
    pub convoy_time: f32,
    pub property_type: i32,
    pub reserved_tail: [u8; 4],
}

#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Challenge {
    pub actions: [ChallengeAction; 2],
    pub description_string_id: CgsId,
    pub title_string_id: CgsId,
    pub id: CgsId,
    pub car_id: CgsId,
    pub car_type: u8,
    pub car_colour_index: u8,
    pub car_colour_palette: u8,
    pub player_count: u8,
    pub action_count: u8,
    pub difficulty: u8,
    pub entitlement_group: u8,
    pub reserved: u8,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
struct ChallengeListHeader {
    count: u32,
    table_offset: u32,
    reserved: [u8; 8],
}

/// Decoded challenge list
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChallengeList {
    /// Bytes following the table offset in the header
    pub reserved: [u8; 8],

    pub challenges: Vec<Challenge>,
}

impl ChallengeList {
    pub fn by_id(&self, id: CgsId) -> Option<&Challenge> {
        self.challenges.iter().find(|challenge| challenge.id == id)
    }
}

impl ResourceCodec for ChallengeList {
    const RESOURCE_TYPE: ResourceType = ResourceType::CHALLENGE_LIST;

    #[instrument(skip(payload, _options), fields(size = payload.len()), err)]
    fn decode(payload: &[u8], endian: Endian, _options: &CodecOptions) -> Result<Self> {
        let header_data = slice(payload, "challenge list header", 0, HEADER_SIZE as u64)?;
        let header =
            ChallengeListHeader::read_options(&mut Cursor::new(header_data), endian.into(), ())?;

        let table_offset = match header.table_offset as usize {
            offset if (HEADER_SIZE..=payload.len()).contains(&offset) => offset,
            _ => HEADER_SIZE,
        };

        let fits = ((payload.len() - table_offset) / CHALLENGE_SIZE) as u32;
        let count = header.count.min(fits);
        if count < header.count {
            debug!(declared = header.count, count, "challenge count clamped to the payload size");
        }

        let mut reader = Cursor::new(payload);
        reader.set_position(table_offset as u64);
        let challenges = (0..count)
            .map(|_| Challenge::read_options(&mut reader, endian.into(), ()))
            .collect::<binrw::BinResult<Vec<_>>>()?;

        Ok(ChallengeList {
            reserved: header.reserved,
            challenges,
        })
    }

    #[instrument(skip(self, options), fields(challenges = self.challenges.len()), err)]
    fn encode(&self, endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        let endian = options.endian.unwrap_or(endian);
        let mut writer = Cursor::new(Vec::with_capacity(
            HEADER_SIZE + self.challenges.len() * CHALLENGE_SIZE,
        ));

        ChallengeListHeader {
            count: self.challenges.len() as u32,
            table_offset: HEADER_SIZE as u32,
            reserved: self.reserved,
        }
        .write_options(&mut writer, endian.into(), ())?;
        self.challenges.write_options(&mut writer, endian.into(), ())?;

        Ok(writer.into_inner())
    }

    fn is_plausible(payload: &[u8], endian: Endian) -> bool {
        Self::decode(payload, endian, &CodecOptions::default())
            .map(|list| !list.challenges.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::cgs_id::CgsId;
    use crate::challenge_list::{
        Challenge, ChallengeAction, ChallengeList, ACTION_SIZE, CHALLENGE_SIZE, HEADER_SIZE,
    };
    use crate::codec::{CodecOptions, ResourceCodec};
    use crate::error::{Error, Result};
    use bnd_bundle::Endian;

    fn challenge(id: &str) -> Challenge {
        let action = ChallengeAction {
            action_type: 3,
            coop_type: 1,
            location_count: 2,
            location_types: [1, 2, 0, 0],
            target_count: 1,
            locations: [0x10, 0x20, 0, 0],
            target_values: [250, -1],
            target_data_types: [1, 0],
            time_limit: 90.0,
            convoy_time: 2.5,
            property_type: 4,
            ..Default::default()
        };

        Challenge {
            actions: [action, ChallengeAction::default()],
            description_string_id: CgsId::encode("DESC_01").unwrap(),
            title_string_id: CgsId::encode("TITLE_01").unwrap(),
            id: CgsId::encode(id).unwrap(),
            car_id: CgsId::encode("CARBBX").unwrap(),
            car_type: 1,
            player_count: 2,
            action_count: 1,
            difficulty: 3,
            ..Default::default()
        }
    }

    fn sample() -> ChallengeList {
        ChallengeList {
            reserved: [0; 8],
            challenges: vec![challenge("CH_0001"), challenge("CH_0002")],
        }
    }

    #[test]
    fn record_layout() -> Result<()> {
        let data = sample().encode(Endian::Big, &CodecOptions::default())?;
        assert_eq!(data.len(), HEADER_SIZE + 2 * CHALLENGE_SIZE);

        #[rustfmt::skip]
        let header = [
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_str_eq!(format!("{:02X?}", &data[..16]), format!("{:02X?}", header));

        let first = &data[HEADER_SIZE..];
        assert_eq!(&first[..5], &[3, 1, 0, 0, 2]);
        assert_eq!(&first[0x28..0x2C], &90.0f32.to_be_bytes());
        assert_eq!(&first[ACTION_SIZE * 2 + 16..ACTION_SIZE * 2 + 24], &CgsId::encode("CH_0001")?.0.to_be_bytes());
        assert_eq!(first[0x90], 1);
        assert_eq!(first[0x93], 2);

        Ok(())
    }

    #[test]
    fn bytes_round_trip() -> Result<()> {
        let mut data = sample().encode(Endian::Little, &CodecOptions::default())?;
        data[8..16].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[HEADER_SIZE + ACTION_SIZE - 1] = 0x7F;
        data[HEADER_SIZE + CHALLENGE_SIZE - 1] = 0xAA;

        let decoded = ChallengeList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded.reserved, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            decoded.encode(Endian::Little, &CodecOptions::default())?,
            data
        );

        Ok(())
    }

    #[test]
    fn graph_round_trip() -> Result<()> {
        let list = sample();
        let data = list.encode(Endian::Big, &CodecOptions::default())?;
        let decoded = ChallengeList::decode(&data, Endian::Big, &CodecOptions::default())?;

        assert_eq!(decoded, list);
        assert_eq!(
            decoded.by_id(CgsId::encode("CH_0002")?).map(|c| c.difficulty),
            Some(3)
        );
        assert!(decoded.by_id(CgsId::encode("CH_0003")?).is_none());

        Ok(())
    }

    #[test]
    #[traced_test]
    fn count_is_clamped() -> Result<()> {
        let mut data = sample().encode(Endian::Little, &CodecOptions::default())?;
        data[0..4].copy_from_slice(&40u32.to_le_bytes());

        let decoded = ChallengeList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded.challenges.len(), 2);
        assert!(logs_contain("challenge count clamped"));

        data.truncate(HEADER_SIZE + CHALLENGE_SIZE + 10);
        let decoded = ChallengeList::decode(&data, Endian::Little, &CodecOptions::default())?;
        assert_eq!(decoded.challenges.len(), 1);

        Ok(())
    }

    #[test]
    fn short_payloads() {
        assert!(matches!(
            ChallengeList::decode(&[0; 8], Endian::Little, &CodecOptions::default()),
            Err(Error::OutOfBounds {
                what: "challenge list header",
                ..
            })
        ));
        assert!(!ChallengeList::is_plausible(&[0; 16], Endian::Little));
    }
}
