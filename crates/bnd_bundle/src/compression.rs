//! Payload compression and decompression handling.

use std::fmt;
use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use tracing::instrument;

use crate::error::{Error, Result};

/// First byte of every zlib stream written by the game's tools
pub const ZLIB_SIGNATURE: u8 = 0x78;

/// Identifies the storage format of a payload inside a bundle
///
/// Bundles do not record the method per resource, it is detected from the stream itself
/// via [`CompressionMethod::detect`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Data is a zlib stream
    Zlib,
}

impl CompressionMethod {
    /// Detect the method from the leading byte of a stream
    pub fn detect(data: &[u8]) -> Self {
        match data.first() {
            Some(&ZLIB_SIGNATURE) => CompressionMethod::Zlib,
            _ => CompressionMethod::None,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::None => f.write_str("none"),
            CompressionMethod::Zlib => f.write_str("zlib"),
        }
    }
}

/// Result of running [`decompress`] over a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressed {
    pub bytes: Vec<u8>,
    pub method: CompressionMethod,
    pub compressed_len: usize,
    pub decompressed_len: usize,
}

/// Inflate `data` if it carries the zlib signature, otherwise hand it back unchanged
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn decompress(data: &[u8]) -> Result<Decompressed> {
    let method = CompressionMethod::detect(data);
    let bytes = match method {
        CompressionMethod::None => data.to_vec(),
        CompressionMethod::Zlib => {
            let mut bytes = Vec::with_capacity(data.len().saturating_mul(2));
            ZlibDecoder::new(data)
                .read_to_end(&mut bytes)
                .map_err(|source| Error::Decompression {
                    length: data.len(),
                    source,
                })?;
            bytes
        }
    };

    Ok(Decompressed {
        compressed_len: data.len(),
        decompressed_len: bytes.len(),
        method,
        bytes,
    })
}

/// Deflate `data` into a zlib stream using the given level (0-9)
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::{compress, decompress, CompressionMethod};
    use crate::error::{Error, ErrorCategory, Result};

    const HELLO_WORLD: [u8; 11] = [
        0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x57, 0x6F, 0x72, 0x6C, 0x64,
    ];

    #[test]
    fn detect_signature() {
        assert_eq!(CompressionMethod::detect(&[0x78, 0x9C]), CompressionMethod::Zlib);
        assert_eq!(CompressionMethod::detect(&[0x79, 0x9C]), CompressionMethod::None);
        assert_eq!(CompressionMethod::detect(&[]), CompressionMethod::None);
    }

    #[test]
    fn decompress_known_stream() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x78, 0x9C,
            0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0x08, 0xCF, 0x2F, 0xCA, 0x49, 0x01, 0x00,
            0x18, 0x0B, 0x04, 0x1D,
        ];

        let result = decompress(&input)?;
        assert_eq!(result.method, CompressionMethod::Zlib);
        assert_eq!(result.bytes, HELLO_WORLD.to_vec());
        assert_eq!(result.compressed_len, 19);
        assert_eq!(result.decompressed_len, 11);

        Ok(())
    }

    #[test]
    fn raw_data_passes_through() -> Result<()> {
        let result = decompress(&HELLO_WORLD)?;
        assert_eq!(result.method, CompressionMethod::None);
        assert_eq!(result.bytes, HELLO_WORLD.to_vec());
        assert_eq!(result.compressed_len, result.decompressed_len);

        Ok(())
    }

    #[test]
    fn malformed_stream_is_fatal() {
        let input = [0x78, 0x9C, 0xFF, 0xFF, 0xFF, 0xFF];

        let error = decompress(&input).unwrap_err();
        assert!(matches!(error, Error::Decompression { length: 6, .. }));
        assert_eq!(error.category(), ErrorCategory::Compression);
    }

    #[test]
    fn compressed_data_inflates_back() -> Result<()> {
        let data = HELLO_WORLD.repeat(32);
        let compressed = compress(&data, 9)?;

        assert_eq!(CompressionMethod::detect(&compressed), CompressionMethod::Zlib);
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed)?.bytes, data);

        Ok(())
    }
}
