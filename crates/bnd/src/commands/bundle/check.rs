use bnd_bundle::{looks_like_bundle, Bundle, ParseOptions};
use clap::Args;
use miette::{miette, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::commands::read_file;

#[derive(Args)]
pub struct CheckArgs {
    /// A directory to search for bundles
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl CheckArgs {
    pub fn handle(&self) -> Result<()> {
        let files = WalkDir::new(&self.directory)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .collect::<Vec<_>>();

        let mut checked = 0;
        let mut failed = 0;
        for file in files {
            let data = read_file(file.path())?;
            if !looks_like_bundle(&data) {
                debug!("skipping {}", file.path().display());
                continue;
            }

            checked += 1;
            match Bundle::parse(&data, &ParseOptions::lenient()) {
                Ok(bundle) if bundle.warnings.is_empty() => {
                    info!("{} {}", "ok".green(), file.path().display());
                }
                Ok(bundle) => {
                    for warning in &bundle.warnings {
                        warn!("{}: {} ({})", file.path().display(), warning.message, warning.code);
                    }
                }
                Err(e) => {
                    failed += 1;
                    error!("{}: {}", file.path().display(), e);
                }
            }
        }

        info!("checked {checked} bundles, {failed} failed");
        if failed > 0 {
            return Err(miette!("{failed} of {checked} bundles could not be parsed"));
        }

        Ok(())
    }
}
