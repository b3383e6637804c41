//! Re-encoding decoded resources into a bundle

use std::collections::HashMap;

use bnd_bundle::{resolve_unwrapped, Bundle, BundleWriter, BundleWriterOptions, ResourceType};
use bon::Builder;
use tracing::{debug, instrument};

use crate::{
    codec::{CodecOptions, Resource, ResourceCodec},
    error::{Error, Result},
    take_dictionary::TakeDictionary,
};

#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct AssembleOptions {
    #[builder(default)]
    pub codec: CodecOptions,

    #[builder(default)]
    pub writer: BundleWriterOptions,
}

/// Build a new bundle with the first resource of each type in `replacements` swapped for the
/// encoded graph
///
/// Every graph is encoded before anything is written, so a failing codec leaves nothing behind.
/// Take dictionaries are written over their original payload. A payload that was stored as a
/// nested bundle is replaced by the bare encoded graph.
#[instrument(skip_all, fields(replacements = replacements.len()), err)]
pub fn assemble(
    original: &[u8],
    bundle: &Bundle,
    replacements: &HashMap<ResourceType, Resource>,
    options: &AssembleOptions,
) -> Result<Vec<u8>> {
    let endian = options.codec.endian_for(bundle);

    let mut payloads = Vec::with_capacity(replacements.len());
    for (&resource_type, graph) in replacements {
        if graph.resource_type() != resource_type {
            return Err(Error::InvalidGraph {
                what: format!("{resource_type} replacement"),
                reason: format!("holds a {} graph", graph.resource_type()),
            });
        }

        let resource = bundle
            .by_type(resource_type)
            .ok_or(Error::MissingResource { resource_type })?;

        let payload = match graph {
            Resource::TakeDictionary(dictionary) => {
                let base = resolve_unwrapped(bundle, resource, original, |data| {
                    TakeDictionary::is_plausible(data, endian)
                })?
                .ok_or(Error::MissingPayload { id: resource.id() })?;
                dictionary.encode_over(&base.bytes, &options.codec)?
            }
            graph => graph.encode(endian, &options.codec)?,
        };

        debug!(id = resource.id(), %resource_type, size = payload.len(), "encoded replacement");
        payloads.push((resource.id(), payload));
    }

    let mut writer = BundleWriter::new(original, bundle, options.writer);
    for (id, payload) in payloads {
        writer.replace(id, payload)?;
    }

    Ok(writer.finish()?)
}
