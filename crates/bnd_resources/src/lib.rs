//! # Resource Codecs
//!
//! This crate decodes the typed resources stored inside **bnd2** bundles into plain Rust values
//! and encodes edited values back into payloads. Bundles themselves are handled by
//! [`bnd_bundle`].
//!
//! ## Supported Resources
//!
//! | Type Id   | Resource               | Module                    | Notes                                 |
//! |-----------|------------------------|---------------------------|---------------------------------------|
//! | 0x10005   | Vehicle List           | [`vehicle_list`]          | Flat 0x108 byte records               |
//! | 0x1001E   | Player Car Colours     | [`player_car_colours`]    | Five palettes of paint/pearl colours  |
//! | 0x1000B   | Take Dictionary        | [`take_dictionary`]       | Recovered by scanning                 |
//! | 0x10003   | Trigger Data           | [`trigger_data`]          | Offset tables, two levels deep        |
//! | 0x1001F   | Challenge List         | [`challenge_list`]        | Flat 0x98 byte records                |
//!
//! Identifiers inside the resources are packed base-40 strings, see [`cgs_id::CgsId`].
//!
//! ## Editing
//!
//! Resources are edited by decoding them, changing the value and handing it to
//! [`assemble::assemble`], which encodes every replacement and rebuilds the bundle:
//!
//! ```no_run
//! # fn doit(data: &[u8]) -> bnd_resources::error::Result<()>
//! # {
//! use std::collections::HashMap;
//!
//! use bnd_bundle::Bundle;
//! use bnd_resources::{assemble, CodecOptions, Resource, ResourceCodec, VehicleList};
//!
//! let bundle = Bundle::parse(data, &Default::default())?;
//! let mut list = VehicleList::from_bundle(data, &bundle, &CodecOptions::default())?
//!     .expect("bundle has a vehicle list");
//! list.vehicles.truncate(1);
//!
//! let replacements = HashMap::from([(VehicleList::RESOURCE_TYPE, Resource::VehicleList(list))]);
//! let output = assemble(data, &bundle, &replacements, &Default::default())?;
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod cgs_id;
pub mod challenge_list;
pub mod codec;
pub mod error;
pub mod player_car_colours;
pub mod take_dictionary;
pub mod trigger_data;
pub mod vehicle_list;

pub use assemble::{assemble, AssembleOptions};
pub use cgs_id::CgsId;
pub use challenge_list::ChallengeList;
pub use codec::{CodecOptions, FixedString, Resource, ResourceCodec, SUPPORTED_TYPES};
pub use player_car_colours::PlayerCarColours;
pub use take_dictionary::TakeDictionary;
pub use trigger_data::TriggerData;
pub use vehicle_list::VehicleList;
