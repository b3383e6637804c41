use bnd_bundle::{resolve, Bundle, ParseOptions};
use clap::Args;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::commands::read_file;

#[derive(Args)]
pub struct InfoArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Skip broken entries instead of failing
    #[arg(long, default_value_t = false)]
    lenient: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;
        let options = if self.lenient {
            ParseOptions::lenient()
        } else {
            ParseOptions::default()
        };
        let bundle = Bundle::parse(&data, &options)
            .context(format!("parsing {}", self.file.display()))?;

        let header = &bundle.header;
        println!("{}", self.file.display().bold());
        println!("  platform:    {} ({})", bundle.platform, bundle.endian);
        println!("  resources:   {}", bundle.len());
        println!("  flags:       {:#x}", header.flags.0);
        println!(
            "  regions:     {}",
            header
                .region_offsets
                .iter()
                .map(|offset| format!("{offset:#x}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        if header.debug_data_offset != 0 {
            println!("  debug data:  {:#x}", header.debug_data_offset);
        }
        println!();

        for resource in bundle.resources() {
            let region = resource.entry.primary_region().unwrap_or_default();
            let compressed = match resolve(&bundle, resource, &data) {
                Ok(Some(payload)) if payload.was_compressed => "zlib".yellow().to_string(),
                Ok(Some(_)) => "raw".dimmed().to_string(),
                Ok(None) => "empty".dimmed().to_string(),
                Err(error) => format!("{}", error.red()),
            };

            println!(
                "{:016x}  {:<18} {:>9} {:>9}  {:<6} {}",
                resource.id(),
                resource.resource_type().to_string(),
                resource.entry.uncompressed_size[region].size(),
                resource.entry.size_on_disk[region].size(),
                compressed,
                bundle.debug_name(resource.id()).unwrap_or_default().cyan(),
            );
        }

        if !bundle.warnings.is_empty() {
            println!();
            for warning in &bundle.warnings {
                println!("{} {}: {}", "⚠".yellow(), warning.code, warning.message);
            }
        }

        Ok(())
    }
}
