//! Animation take dictionary
//!
//! Take dictionaries carry no header or count, the take records are found by scanning the payload.
//! A record looks like this, pointers are 4 or 8 bytes wide depending on the platform:
//!
//! | Field                  | Description                                         |
//! |------------------------|-----------------------------------------------------|
//! | Keyframes              | pointer                                             |
//! | Name                   | 32 bytes: null terminated ASCII                     |
//! | Duration               | 4 bytes: f32 seconds                                |
//! | Flags                  | 4 bytes                                             |
//! | Channels               | 12 × (2 bytes interval count, 2 bytes key count)    |
//! | Data                   | pointer                                             |
//! | Reserved               | 4 bytes                                             |
//!
//! The scan runs once per byte order and pointer width and keeps the interpretation that finds the
//! most takes.

use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite};
use bnd_bundle::{Endian, ResourceType};
use derive_more::derive::{Deref, IntoIterator};
use tracing::{debug, instrument};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    codec::{fixed_bytes, CodecOptions, ResourceCodec},
    error::{Error, Result},
};

pub const CHANNEL_COUNT: usize = 12;

/// Longest believable duration in seconds
pub const MAX_DURATION: f32 = 6000.0;

/// Largest believable interval or key count of a single channel
pub const MAX_CHANNEL_COUNT: u16 = 0x4000;

/// Key totals at or above this mark a window as garbage
pub const MAX_TOTAL_KEYS: u32 = 20000;

const NAME_SIZE: usize = 32;
const SCAN_STEP: usize = 4;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointerWidth {
    #[default]
    Bits32,
    Bits64,
}

impl PointerWidth {
    pub const fn is_wide(self) -> bool {
        matches!(self, PointerWidth::Bits64)
    }
}

/// Byte order and pointer width of a dictionary
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TakeLayout {
    pub endian: Endian,
    pub pointer_width: PointerWidth,
}

impl TakeLayout {
    /// Every layout in scan order
    pub const ALL: [TakeLayout; 4] = [
        TakeLayout::new(Endian::Little, PointerWidth::Bits32),
        TakeLayout::new(Endian::Big, PointerWidth::Bits32),
        TakeLayout::new(Endian::Little, PointerWidth::Bits64),
        TakeLayout::new(Endian::Big, PointerWidth::Bits64),
    ];

    pub const fn new(endian: Endian, pointer_width: PointerWidth) -> Self {
        TakeLayout {
            endian,
            pointer_width,
        }
    }

    /// Size of one take record
    pub const fn record_size(self) -> usize {
        match self.pointer_width {
            PointerWidth::Bits32 => 100,
            PointerWidth::Bits64 => 108,
        }
    }
}

impl fmt::Display for TakeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = match self.pointer_width {
            PointerWidth::Bits32 => 32,
            PointerWidth::Bits64 => 64,
        };
        write!(f, "{bits} bit {}", self.endian)
    }
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelCounts {
    pub intervals: u16,
    pub keys: u16,
}

#[binrw::parser(reader, endian)]
fn read_pointer(wide: bool) -> BinResult<u64> {
    if wide {
        u64::read_options(reader, endian, ())
    } else {
        u32::read_options(reader, endian, ()).map(u64::from)
    }
}

#[binrw::writer(writer, endian)]
fn write_pointer(value: &u64, wide: bool) -> BinResult<()> {
    if wide {
        value.write_options(writer, endian, ())
    } else {
        (*value as u32).write_options(writer, endian, ())
    }
}

#[binrw]
#[brw(import(wide: bool))]
#[derive(Debug, Default, Clone, PartialEq)]
struct TakeRecord {
    #[br(parse_with = read_pointer, args(wide))]
    #[bw(write_with = write_pointer, args(wide))]
    keyframes: u64,
    name: [u8; NAME_SIZE],
    duration: f32,
    flags: u32,
    channels: [ChannelCounts; CHANNEL_COUNT],
    #[br(parse_with = read_pointer, args(wide))]
    #[bw(write_with = write_pointer, args(wide))]
    data: u64,
    reserved: u32,
}

/// One animation take
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Take {
    pub name: String,
    pub duration: f32,
    pub flags: u32,
    pub channels: [ChannelCounts; CHANNEL_COUNT],
    pub keyframes_pointer: u64,
    pub data_pointer: u64,
    pub reserved: u32,

    /// Where the record was found in the payload, `None` for new takes
    pub source_offset: Option<u64>,
}

impl Take {
    pub fn total_keys(&self) -> u32 {
        self.channels.iter().map(|c| c.keys as u32).sum()
    }

    fn record(&self) -> Result<TakeRecord> {
        let name = fixed_bytes::<NAME_SIZE>(&self.name).map_err(|reason| Error::InvalidGraph {
            what: format!("take {:?}", self.name),
            reason,
        })?;

        Ok(TakeRecord {
            keyframes: self.keyframes_pointer,
            name,
            duration: self.duration,
            flags: self.flags,
            channels: self.channels,
            data: self.data_pointer,
            reserved: self.reserved,
        })
    }
}

/// Decoded take dictionary
#[derive(Debug, Default, Clone, PartialEq, Deref, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TakeDictionary {
    /// Layout the takes were found with, used again when encoding
    pub layout: TakeLayout,

    #[deref]
    #[into_iterator(owned, ref)]
    pub takes: Vec<Take>,
}

/// Reported at the start and end of every scan pass
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Zero based index of the pass
    pub pass: usize,
    pub passes: usize,
    pub layout: TakeLayout,
    /// Candidates found so far in this pass, final once `finished` is set
    pub candidates: usize,
    pub finished: bool,
}

/// Interpret a window of bytes as a take record, `None` unless every field is believable
pub fn score_window(window: &[u8], layout: TakeLayout) -> Option<Take> {
    if window.len() < layout.record_size() {
        return None;
    }

    let mut reader = Cursor::new(&window[..layout.record_size()]);
    let record =
        TakeRecord::read_options(&mut reader, layout.endian.into(), (layout.pointer_width.is_wide(),))
            .ok()?;

    let name_len = record.name.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
    let name = &record.name[..name_len];
    if name.is_empty() || !name.iter().all(|b| (0x20..=0x7E).contains(b)) {
        return None;
    }

    if !record.duration.is_finite() || !(0.0..MAX_DURATION).contains(&record.duration) {
        return None;
    }

    if record
        .channels
        .iter()
        .any(|c| c.intervals > MAX_CHANNEL_COUNT || c.keys > MAX_CHANNEL_COUNT)
    {
        return None;
    }

    let take = Take {
        name: String::from_utf8_lossy(name).into_owned(),
        duration: record.duration,
        flags: record.flags,
        channels: record.channels,
        keyframes_pointer: record.keyframes,
        data_pointer: record.data,
        reserved: record.reserved,
        source_offset: None,
    };

    (take.total_keys() < MAX_TOTAL_KEYS).then_some(take)
}

/// Scan a payload with one layout, skipping past every accepted record
pub fn scan(payload: &[u8], layout: TakeLayout) -> Vec<Take> {
    let size = layout.record_size();
    let mut takes = Vec::new();
    let mut offset = 0;

    while offset + size <= payload.len() {
        match score_window(&payload[offset..], layout) {
            Some(mut take) => {
                take.source_offset = Some(offset as u64);
                takes.push(take);
                offset += size;
            }
            None => offset += SCAN_STEP,
        }
    }

    takes
}

fn dedupe(takes: Vec<Take>) -> Vec<Take> {
    let mut seen = HashSet::new();
    takes
        .into_iter()
        .filter(|take| seen.insert(take.name.to_ascii_lowercase()))
        .collect()
}

impl TakeDictionary {
    /// Scan a payload, reporting progress before and after each pass
    ///
    /// Only layouts in the byte order of `options.endian` are tried when it is set.
    #[instrument(skip(payload, options, progress), fields(size = payload.len()))]
    pub fn decode_with_progress<F>(payload: &[u8], options: &CodecOptions, mut progress: F) -> Self
    where
        F: FnMut(ScanProgress),
    {
        let layouts: Vec<TakeLayout> = TakeLayout::ALL
            .into_iter()
            .filter(|layout| options.endian.map_or(true, |e| e == layout.endian))
            .collect();

        let mut best: Option<(TakeLayout, Vec<Take>)> = None;
        for (pass, layout) in layouts.iter().copied().enumerate() {
            let mut report = ScanProgress {
                pass,
                passes: layouts.len(),
                layout,
                candidates: 0,
                finished: false,
            };
            progress(report);

            let takes = scan(payload, layout);
            debug!(%layout, candidates = takes.len(), "take scan pass finished");

            report.candidates = takes.len();
            report.finished = true;
            progress(report);

            if best.as_ref().map_or(true, |(_, b)| takes.len() > b.len()) {
                best = Some((layout, takes));
            }
        }

        let (layout, takes) = best.unwrap_or_default();
        TakeDictionary {
            layout,
            takes: dedupe(takes),
        }
    }

    /// Write the takes over a copy of the payload they were decoded from
    ///
    /// Takes with a source offset are written back in place so everything around them survives.
    /// Records of deleted takes are zeroed so a later scan no longer finds them. New takes are
    /// appended.
    #[instrument(skip(self, base, options), fields(takes = self.takes.len()), err)]
    pub fn encode_over(&self, base: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        let layout = self.layout_for(options);
        let size = layout.record_size() as u64;
        let mut data = base.to_vec();

        // duplicates of a kept name stay, decoding drops them again
        let kept_offsets: HashSet<u64> = self.takes.iter().filter_map(|t| t.source_offset).collect();
        let kept_names: HashSet<String> =
            self.takes.iter().map(|t| t.name.to_ascii_lowercase()).collect();
        for deleted in scan(base, self.layout).into_iter().filter(|t| {
            t.source_offset.is_some_and(|offset| !kept_offsets.contains(&offset))
                && !kept_names.contains(&t.name.to_ascii_lowercase())
        }) {
            let start = deleted.source_offset.unwrap_or_default() as usize;
            let end = (start + self.layout.record_size()).min(data.len());
            debug!(name = %deleted.name, offset = start, "blanking deleted take");
            data[start..end].fill(0);
        }

        let mut writer = Cursor::new(data);

        let mut appended = Vec::new();
        for take in &self.takes {
            match take.source_offset {
                Some(offset) if offset + size <= base.len() as u64 => {
                    writer.set_position(offset);
                    take.record()?.write_options(
                        &mut writer,
                        layout.endian.into(),
                        (layout.pointer_width.is_wide(),),
                    )?;
                }
                _ => appended.push(take),
            }
        }

        let mut data = writer.into_inner();
        crate::codec::pad_to(&mut data, SCAN_STEP);
        let mut writer = Cursor::new(data);
        writer.set_position(writer.get_ref().len() as u64);
        for take in appended {
            take.record()?.write_options(
                &mut writer,
                layout.endian.into(),
                (layout.pointer_width.is_wide(),),
            )?;
        }

        Ok(writer.into_inner())
    }

    fn layout_for(&self, options: &CodecOptions) -> TakeLayout {
        TakeLayout {
            endian: options.endian.unwrap_or(self.layout.endian),
            ..self.layout
        }
    }
}

impl ResourceCodec for TakeDictionary {
    const RESOURCE_TYPE: ResourceType = ResourceType::TAKE_DICTIONARY;

    /// Never fails, a payload without takes decodes to an empty dictionary
    fn decode(payload: &[u8], _endian: Endian, options: &CodecOptions) -> Result<Self> {
        Ok(Self::decode_with_progress(payload, options, |_| {}))
    }

    /// Lays the takes out one after another in the layout they were decoded with
    #[instrument(skip(self, _endian, options), fields(takes = self.takes.len()), err)]
    fn encode(&self, _endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        let layout = self.layout_for(options);
        let mut writer = Cursor::new(Vec::with_capacity(self.takes.len() * layout.record_size()));

        for take in &self.takes {
            take.record()?.write_options(
                &mut writer,
                layout.endian.into(),
                (layout.pointer_width.is_wide(),),
            )?;
        }

        Ok(writer.into_inner())
    }

    fn is_plausible(payload: &[u8], _endian: Endian) -> bool {
        TakeLayout::ALL
            .iter()
            .any(|layout| !scan(payload, *layout).is_empty())
    }
}
