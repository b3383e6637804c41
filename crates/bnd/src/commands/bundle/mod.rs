pub mod check;
pub mod diff;
pub mod extract;
pub mod info;

#[derive(clap::Subcommand)]
pub enum BundleCommands {
    /// Show the header and directory of a bundle
    Info(info::InfoArgs),
    /// Extract every resource payload into a directory
    Extract(extract::ExtractArgs),
    /// Parse every bundle below a directory and report problems
    Check(check::CheckArgs),
    /// Compare two bundles
    Diff(diff::DiffArgs),
}

impl BundleCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            BundleCommands::Info(info) => info.handle(),
            BundleCommands::Extract(extract) => extract.handle(),
            BundleCommands::Check(check) => check.handle(),
            BundleCommands::Diff(diff) => diff.handle(),
        }
    }
}
