use std::{collections::HashMap, io::Write, path::PathBuf};

use bnd_bundle::{Bundle, ParseOptions, ResourceType};
use bnd_resources::{assemble, AssembleOptions, Resource};
use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::info;

use super::ResourceKind;
use crate::commands::{create_file, read_file};

#[derive(Args)]
pub struct ImportArgs {
    /// The bundle to edit
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The resource to replace
    #[arg(short = 't', long = "type", value_enum)]
    kind: ResourceKind,

    /// JSON produced by `resource dump`
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the rebuilt bundle
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ImportArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;
        let bundle = Bundle::parse(&data, &ParseOptions::default())
            .context(format!("parsing {}", self.file.display()))?;

        let json = read_file(&self.input)?;
        let graph: Resource = serde_json::from_slice(&json)
            .into_diagnostic()
            .context(format!("parsing {}", self.input.display()))?;

        let resource_type = ResourceType::from(self.kind);
        if graph.resource_type() != resource_type {
            return Err(miette!(
                "{} holds a {}, not a {resource_type}",
                self.input.display(),
                graph.resource_type()
            ));
        }

        let replacements = HashMap::from([(resource_type, graph)]);
        let output = assemble(&data, &bundle, &replacements, &AssembleOptions::default())?;

        info!("writing {} ({} bytes)", self.output.display(), output.len());
        let mut out = create_file(&self.output, self.overwrite)?;
        out.write_all(&output)
            .into_diagnostic()
            .context(format!("writing {}", self.output.display()))?;

        Ok(())
    }
}
