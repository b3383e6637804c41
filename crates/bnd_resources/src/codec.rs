//! Shared codec interface and the typed resource union

use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Seek, Write};

use binrw::{BinRead, BinResult, BinWrite};
use bnd_bundle::{resolve_unwrapped, Bundle, BundleResource, Endian, ResourceType, Strictness};
use bon::Builder;
use tracing::instrument;

use crate::{
    challenge_list::ChallengeList,
    error::{Error, Result},
    player_car_colours::PlayerCarColours,
    take_dictionary::TakeDictionary,
    trigger_data::TriggerData,
    vehicle_list::VehicleList,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options shared by every codec
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct CodecOptions {
    /// Byte order to use instead of the one the bundle's platform implies
    pub endian: Option<Endian>,

    #[builder(default)]
    pub strictness: Strictness,
}

impl CodecOptions {
    /// Byte order for a resource of `bundle`
    pub fn endian_for(&self, bundle: &Bundle) -> Endian {
        self.endian.unwrap_or_else(|| bundle.platform.endian())
    }
}

/// A resource type that can be decoded from and encoded to a payload
pub trait ResourceCodec: Sized {
    const RESOURCE_TYPE: ResourceType;

    /// Decode a decompressed payload
    fn decode(payload: &[u8], endian: Endian, options: &CodecOptions) -> Result<Self>;

    /// Encode into a decompressed payload in the byte order of the target bundle
    fn encode(&self, endian: Endian, options: &CodecOptions) -> Result<Vec<u8>>;

    /// Cheap check used to pick a payload out of a nested bundle
    fn is_plausible(payload: &[u8], endian: Endian) -> bool {
        Self::decode(payload, endian, &CodecOptions::default()).is_ok()
    }

    /// Resolve, unwrap and decode a resource
    fn decode_resource(
        buffer: &[u8],
        bundle: &Bundle,
        resource: &BundleResource,
        options: &CodecOptions,
    ) -> Result<Self> {
        let endian = options.endian_for(bundle);
        let payload = resolve_unwrapped(bundle, resource, buffer, |data| {
            Self::is_plausible(data, endian)
        })?
        .ok_or(Error::MissingPayload { id: resource.id() })?;

        Self::decode(&payload.bytes, endian, options)
    }

    /// Decode the first resource of this type, `None` if the bundle has none
    fn from_bundle(buffer: &[u8], bundle: &Bundle, options: &CodecOptions) -> Result<Option<Self>> {
        match bundle.by_type(Self::RESOURCE_TYPE) {
            Some(resource) => Self::decode_resource(buffer, bundle, resource, options).map(Some),
            None => Ok(None),
        }
    }
}

/// Any decoded resource
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Resource {
    VehicleList(VehicleList),
    PlayerCarColours(PlayerCarColours),
    TakeDictionary(TakeDictionary),
    TriggerData(TriggerData),
    ChallengeList(ChallengeList),
}

/// Resource types with a codec
pub const SUPPORTED_TYPES: [ResourceType; 5] = [
    ResourceType::VEHICLE_LIST,
    ResourceType::PLAYER_CAR_COLOURS,
    ResourceType::TAKE_DICTIONARY,
    ResourceType::TRIGGER_DATA,
    ResourceType::CHALLENGE_LIST,
];

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::VehicleList(_) => VehicleList::RESOURCE_TYPE,
            Resource::PlayerCarColours(_) => PlayerCarColours::RESOURCE_TYPE,
            Resource::TakeDictionary(_) => TakeDictionary::RESOURCE_TYPE,
            Resource::TriggerData(_) => TriggerData::RESOURCE_TYPE,
            Resource::ChallengeList(_) => ChallengeList::RESOURCE_TYPE,
        }
    }

    /// Decode a payload with the codec for `resource_type`
    #[instrument(skip(payload, options), fields(size = payload.len()), err)]
    pub fn decode(
        resource_type: ResourceType,
        payload: &[u8],
        endian: Endian,
        options: &CodecOptions,
    ) -> Result<Resource> {
        Ok(match resource_type {
            ResourceType::VEHICLE_LIST => {
                Resource::VehicleList(VehicleList::decode(payload, endian, options)?)
            }
            ResourceType::PLAYER_CAR_COLOURS => {
                Resource::PlayerCarColours(PlayerCarColours::decode(payload, endian, options)?)
            }
            ResourceType::TAKE_DICTIONARY => {
                Resource::TakeDictionary(TakeDictionary::decode(payload, endian, options)?)
            }
            ResourceType::TRIGGER_DATA => {
                Resource::TriggerData(TriggerData::decode(payload, endian, options)?)
            }
            ResourceType::CHALLENGE_LIST => {
                Resource::ChallengeList(ChallengeList::decode(payload, endian, options)?)
            }
            resource_type => return Err(Error::UnsupportedResourceType { resource_type }),
        })
    }

    /// Resolve, unwrap and decode any supported resource
    pub fn decode_resource(
        buffer: &[u8],
        bundle: &Bundle,
        resource: &BundleResource,
        options: &CodecOptions,
    ) -> Result<Resource> {
        Ok(match resource.resource_type() {
            ResourceType::VEHICLE_LIST => Resource::VehicleList(VehicleList::decode_resource(
                buffer, bundle, resource, options,
            )?),
            ResourceType::PLAYER_CAR_COLOURS => Resource::PlayerCarColours(
                PlayerCarColours::decode_resource(buffer, bundle, resource, options)?,
            ),
            ResourceType::TAKE_DICTIONARY => Resource::TakeDictionary(
                TakeDictionary::decode_resource(buffer, bundle, resource, options)?,
            ),
            ResourceType::TRIGGER_DATA => Resource::TriggerData(TriggerData::decode_resource(
                buffer, bundle, resource, options,
            )?),
            ResourceType::CHALLENGE_LIST => Resource::ChallengeList(
                ChallengeList::decode_resource(buffer, bundle, resource, options)?,
            ),
            resource_type => return Err(Error::UnsupportedResourceType { resource_type }),
        })
    }

    #[instrument(skip(self, options), fields(resource_type = %self.resource_type()), err)]
    pub fn encode(&self, endian: Endian, options: &CodecOptions) -> Result<Vec<u8>> {
        match self {
            Resource::VehicleList(graph) => graph.encode(endian, options),
            Resource::PlayerCarColours(graph) => graph.encode(endian, options),
            Resource::TakeDictionary(graph) => graph.encode(endian, options),
            Resource::TriggerData(graph) => graph.encode(endian, options),
            Resource::ChallengeList(graph) => graph.encode(endian, options),
        }
    }
}

/// Text stored in a fixed size, null terminated field
///
/// The raw bytes are kept, including anything after the terminator, so decoding and encoding a
/// record reproduces it exactly.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FixedString<const N: usize>([u8; N]);

impl<const N: usize> FixedString<N> {
    pub fn new(value: &str) -> core::result::Result<Self, String> {
        if value.contains('\0') {
            return Err(format!("{value:?} contains a null character"));
        }
        fixed_bytes::<N>(value).map(FixedString)
    }

    pub const fn from_bytes(raw: [u8; N]) -> Self {
        FixedString(raw)
    }

    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    fn text_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// Text up to the terminator, invalid UTF-8 is replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.text_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.text_bytes().is_empty()
    }

    /// Valid UTF-8 followed by nothing but zeros, the bytes are fully described by [`Self::text`]
    pub fn is_clean(&self) -> bool {
        let text = self.text_bytes();
        std::str::from_utf8(text).is_ok() && self.0[text.len()..].iter().all(|&b| b == 0)
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        FixedString([0; N])
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            write!(f, "{:?}", self.text())
        } else {
            f.debug_tuple("FixedString").field(&self.0.as_slice()).finish()
        }
    }
}

impl<const N: usize> PartialEq<&str> for FixedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.text_bytes() == other.as_bytes()
    }
}

impl<const N: usize> BinRead for FixedString<N> {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        <[u8; N]>::read_options(reader, endian, args).map(FixedString)
    }
}

impl<const N: usize> BinWrite for FixedString<N> {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.0.write_options(writer, endian, args)
    }
}

/// Clean values are plain strings, anything else is the list of raw bytes
#[cfg(feature = "serde")]
mod fixed_string_serde {
    use std::fmt;

    use serde::{
        de::{self, SeqAccess, Visitor},
        Deserialize, Serialize,
    };

    use super::FixedString;

    impl<const N: usize> Serialize for FixedString<N> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            if self.is_clean() {
                serializer.serialize_str(&self.text())
            } else {
                serializer.collect_seq(self.0.iter())
            }
        }
    }

    struct FixedStringVisitor<const N: usize>;

    impl<'de, const N: usize> Visitor<'de> for FixedStringVisitor<N> {
        type Value = FixedString<N>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a string of up to {N} bytes or {N} raw bytes")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            FixedString::new(value).map_err(E::custom)
        }

        fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            <[u8; N]>::try_from(value)
                .map(FixedString)
                .map_err(|_| E::invalid_length(value.len(), &self))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut raw = [0u8; N];
            for (index, byte) in raw.iter_mut().enumerate() {
                *byte = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(index, &self))?;
            }
            if seq.next_element::<u8>()?.is_some() {
                return Err(de::Error::invalid_length(N + 1, &self));
            }
            Ok(FixedString(raw))
        }
    }

    impl<'de, const N: usize> Deserialize<'de> for FixedString<N> {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(FixedStringVisitor::<N>)
        }
    }
}

/// Null pad `value` into a field of `N` bytes
pub(crate) fn fixed_bytes<const N: usize>(value: &str) -> core::result::Result<[u8; N], String> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return Err(format!("{value:?} does not fit into {N} bytes"));
    }

    let mut result = [0u8; N];
    result[..bytes.len()].copy_from_slice(bytes);
    Ok(result)
}

/// Pad `data` with zeros to a multiple of `alignment`
pub(crate) fn pad_to(data: &mut Vec<u8>, alignment: usize) {
    let padded = data.len().div_ceil(alignment) * alignment;
    data.resize(padded, 0);
}
