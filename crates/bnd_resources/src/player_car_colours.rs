//! Player car colour palettes
//!
//! The payload starts with one descriptor per [`PaletteType`], each holding the payload relative
//! offsets of its paint and pearl colour arrays and their shared length. Colours are four `f32`
//! components.

use std::fmt;
use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use bnd_bundle::{Endian, ResourceType};
use tracing::instrument;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    codec::{pad_to, CodecOptions, ResourceCodec},
    error::{slice, Error, Result},
};

pub const PALETTE_COUNT: usize = 5;

/// Size of the descriptor table
pub const TABLE_SIZE: usize = PALETTE_COUNT * 12;

const COLOUR_SIZE: u64 = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PaletteType {
    Gloss,
    Metallic,
    Pearlescent,
    Special,
    Party,
}

impl PaletteType {
    /// Every palette in storage order
    pub const ALL: [PaletteType; PALETTE_COUNT] = [
        PaletteType::Gloss,
        PaletteType::Metallic,
        PaletteType::Pearlescent,
        PaletteType::Special,
        PaletteType::Party,
    ];
}

impl fmt::Display for PaletteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Colour {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Colour {
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Colour {
            red,
            green,
            blue,
            alpha,
        }
    }
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
struct PaletteDescriptor {
    paint_colours_offset: u32,
    pearl_colours_offset: u32,
    colour_count: u32,
}

/// Paint colours and the matching pearl colours, index for index
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Palette {
    pub paint_colours: Vec<Colour>,
    pub pearl_colours: Vec<Colour>,
}

#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlayerCarColours {
    /// Palettes in the order of [`PaletteType::ALL`]
    pub palettes: [Palette; PALETTE_COUNT],
}

impl PlayerCarColours {
    pub fn palette(&self, palette: PaletteType) -> &Palette {
        &self.palettes[palette as usize]
    }

    pub fn palette_mut(&mut self, palette: PaletteType) -> &mut Palette {
        &mut self.palettes[palette as usize]
    }
}

fn read_colours(
    payload: &[u8],
    what: &'static str,
    offset: u32,
    count: u32,
    endian: Endian,
) -> Result<Vec<Colour>> {
    let data = slice(payload, what, offset as u64, count as u64 * COLOUR_SIZE)?;
    let mut reader = Cursor::new(data);
    (0..count)
        .map(|_| Colour::read_options(&mut reader, endian.into(), ()).map_err(Error::from))
        .collect()
}

impl ResourceCodec for PlayerCarColours {
    const RESOURCE_TYPE: ResourceType = ResourceType::PLAYER_CAR_COLOURS;

    #[instrument(skip(payload, _options), fields(size = payload.len()), err)]
    fn decode(payload: &[u8], endian: Endian, _options: &CodecOptions) -> Result<Self> {
        let table = slice(payload, "palette table", 0, TABLE_SIZE as u64)?;
        let mut reader = Cursor::new(table);

        let mut result = PlayerCarColours::default();
        for palette in result.palettes.iter_mut() {
            let descriptor = PaletteDescriptor::read_options(&mut reader, endian.into(), ())?;
            let count = descriptor.colour_count;

            palette.paint_colours = read_colours(
                payload,
                "paint colours",
                descriptor.paint_colours_offset,
                count,
                endian,
            )?;
            palette.pearl_colours = read_colours(
                payload,
                "pearl colours",
                descriptor.pearl_colours_offset,
                count,
                endian,
            )?;
        }

        Ok(result)
    }

    #[instrument(skip(self, options), err)]
    fn encode(&self, endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        let endian = options.endian.unwrap_or(endian);

        for (palette_type, palette) in PaletteType::ALL.iter().zip(&self.palettes) {
            if palette.paint_colours.len() != palette.pearl_colours.len() {
                return Err(Error::InvalidGraph {
                    what: format!("{palette_type} palette"),
                    reason: format!(
                        "{} paint colours but {} pearl colours",
                        palette.paint_colours.len(),
                        palette.pearl_colours.len()
                    ),
                });
            }
        }

        let mut data = vec![0u8; TABLE_SIZE];
        pad_to(&mut data, 16);

        let mut descriptors = Vec::with_capacity(PALETTE_COUNT);
        let mut writer = Cursor::new(data);
        for palette in &self.palettes {
            writer.set_position(writer.get_ref().len() as u64);

            let paint_colours_offset = writer.position() as u32;
            palette.paint_colours.write_options(&mut writer, endian.into(), ())?;
            let pearl_colours_offset = writer.position() as u32;
            palette.pearl_colours.write_options(&mut writer, endian.into(), ())?;

            descriptors.push(PaletteDescriptor {
                paint_colours_offset,
                pearl_colours_offset,
                colour_count: palette.paint_colours.len() as u32,
            });
        }

        writer.set_position(0);
        descriptors.write_options(&mut writer, endian.into(), ())?;

        Ok(writer.into_inner())
    }

    fn is_plausible(payload: &[u8], endian: Endian) -> bool {
        payload.len() >= TABLE_SIZE && Self::decode(payload, endian, &CodecOptions::default()).is_ok()
    }
}
