//! This library handles reading and rebuilding **bnd2** bundles, the resource containers used by
//! a racing game on PC, Xbox 360 and PS3.
//!
//! # Bundle Format Documentation
//!
//! A bundle packages typed resources (vehicle lists, colour palettes, trigger geometry, ...) in a
//! single file. Every integer is stored in the byte order of the platform the bundle was built for,
//! which is detected from the version field.
//!
//! ## File Structure
//!
//! A bundle consists of a header, a resource directory, optional import tables, optional debug
//! data and the resource data itself, split over three memory regions.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "bnd2"                                            |
//! | 0x0004         | Version                | 4 bytes: Fixed value 2                                     |
//! | 0x0008         | Platform               | 4 bytes: 1 PC, 2 Xbox 360, 3 PS3                           |
//! | 0x000C         | Debug Data Offset      | 4 bytes: Offset of the debug string table, 0 when absent   |
//! | 0x0010         | Resource Count         | 4 bytes: Number of directory entries                       |
//! | 0x0014         | Directory Offset       | 4 bytes: Offset of the first directory entry               |
//! | 0x0018         | Region Offsets         | 3 × 4 bytes: Start of each memory region                   |
//! | 0x0024         | Flags                  | 4 bytes: Compressed, memory optimisation, has debug data   |
//!
//! ### Resource Directory
//!
//! Each entry is 80 bytes long:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Resource Id            | 8 bytes: Unique id of the resource                      |
//! | 0x0008         | Import Hash            | 8 bytes                                                 |
//! | 0x0010         | Uncompressed Sizes     | 3 × 4 bytes: Size and alignment per region              |
//! | 0x001C         | Sizes On Disk          | 3 × 4 bytes: Size and alignment per region              |
//! | 0x0028         | Disk Offsets           | 3 × 4 bytes: Offset relative to the region start        |
//! | 0x0034         | Import Offset          | 4 bytes: Offset of the import table                     |
//! | 0x0038         | Resource Type          | 4 bytes: Type id                                        |
//! | 0x003C         | Import Count           | 2 bytes: Number of 16 byte import entries               |
//! | 0x003E         | Flags                  | 1 byte                                                  |
//! | 0x003F         | Stream Index           | 1 byte                                                  |
//! | 0x0040         | Reserved               | 16 bytes                                                |
//!
//! Sizes pack a 28 bit byte count with a power of two alignment exponent in the top 4 bits.
//!
//! ### Resource Data
//!
//! A resource's payload is the data of the first region with a non-zero size. Payloads starting
//! with `0x78` are zlib streams. Some payloads are complete bundles themselves, see
//! [`resolve::resolve_unwrapped`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.bndl`, `.bin`, `.dat`
//! - **Endianness**: Little-endian on PC, big-endian on Xbox 360 and PS3
//! - **Compression**: zlib per resource
//!

pub mod compression;
pub mod debug;
pub mod error;
pub mod read;
pub mod resolve;
pub mod types;
pub mod write;

pub use compression::CompressionMethod;
pub use read::{Bundle, BundleResource, ParseOptions, Strictness};
pub use resolve::{looks_like_bundle, resolve, resolve_unwrapped, ResolvedPayload};
pub use types::{Endian, Platform, ResourceType};
pub use write::{BundleBuilder, BundleWriter, BundleWriterOptions};
