use std::{fs::File, path::Path};

use miette::{Context, IntoDiagnostic, Result};

pub mod bundle;
pub mod resource;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Inspect, extract and compare bundles
    Bundle {
        #[command(subcommand)]
        command: bundle::BundleCommands,
    },
    /// Decode and replace typed resources
    Resource {
        #[command(subcommand)]
        command: resource::ResourceCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Bundle { command } => command.handle(),
            Commands::Resource { command } => command.handle(),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

pub(crate) fn create_file(path: &Path, overwrite: bool) -> Result<File> {
    if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    }
}
