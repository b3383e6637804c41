use bnd_bundle::{Bundle, ParseOptions, ResourceType};
use bnd_resources::{CodecOptions, Resource};
use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{io::Write, path::PathBuf};
use tracing::info;

use super::ResourceKind;
use crate::commands::{create_file, read_file};

#[derive(Args)]
pub struct DumpArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The resource to decode
    #[arg(short = 't', long = "type", value_enum)]
    kind: ResourceKind,

    /// Write the JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;
        let bundle = Bundle::parse(&data, &ParseOptions::default())
            .context(format!("parsing {}", self.file.display()))?;

        let resource_type = ResourceType::from(self.kind);
        let resource = bundle
            .by_type(resource_type)
            .ok_or_else(|| miette!("{} has no {resource_type}", self.file.display()))?;

        let graph = Resource::decode_resource(&data, &bundle, resource, &CodecOptions::default())
            .context(format!("decoding {:016x}", resource.id()))?;
        let json = serde_json::to_string_pretty(&graph).into_diagnostic()?;

        match &self.output {
            Some(p) => {
                info!("writing {}", p.display());
                let mut out = create_file(p, self.overwrite)?;
                writeln!(out, "{json}")
                    .into_diagnostic()
                    .context(format!("writing {}", p.display()))?;
            }
            None => println!("{json}"),
        }

        Ok(())
    }
}
