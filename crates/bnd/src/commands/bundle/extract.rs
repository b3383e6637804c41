use bnd_bundle::{resolve, Bundle, ParseOptions};
use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{io::Write, path::PathBuf};
use tracing::{info, warn};

use crate::commands::{create_file, read_file};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;
        let bundle = Bundle::parse(&data, &ParseOptions::default())
            .context(format!("parsing {}", self.file.display()))?;

        std::fs::create_dir_all(&self.directory)
            .into_diagnostic()
            .context(format!("creating {}", self.directory.display()))?;

        for resource in bundle.resources() {
            let Some(payload) = resolve(&bundle, resource, &data)? else {
                warn!("{:016x} has no data", resource.id());
                continue;
            };

            let p = self.directory.join(format!(
                "{:016x}.{}.bin",
                resource.id(),
                resource.resource_type()
            ));
            info!("writing {}", p.display());

            let mut out = create_file(&p, self.overwrite)?;
            out.write_all(&payload.bytes)
                .into_diagnostic()
                .context(format!("writing {}", p.display()))?;
        }

        Ok(())
    }
}
