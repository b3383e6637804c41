use bnd_bundle::ResourceType;
use clap::ValueEnum;

pub mod dump;
pub mod import;

#[derive(clap::Subcommand)]
pub enum ResourceCommands {
    /// Decode a resource and print it as JSON
    Dump(dump::DumpArgs),
    /// Replace a resource with an edited JSON document
    Import(import::ImportArgs),
}

impl ResourceCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            ResourceCommands::Dump(dump) => dump.handle(),
            ResourceCommands::Import(import) => import.handle(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    VehicleList,
    PlayerCarColours,
    TakeDictionary,
    TriggerData,
    ChallengeList,
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::VehicleList => ResourceType::VEHICLE_LIST,
            ResourceKind::PlayerCarColours => ResourceType::PLAYER_CAR_COLOURS,
            ResourceKind::TakeDictionary => ResourceType::TAKE_DICTIONARY,
            ResourceKind::TriggerData => ResourceType::TRIGGER_DATA,
            ResourceKind::ChallengeList => ResourceType::CHALLENGE_LIST,
        }
    }
}

#[cfg(test)]
mod test {
    use bnd_bundle::ResourceType;
    use bnd_resources::SUPPORTED_TYPES;
    use clap::ValueEnum;

    use super::ResourceKind;

    #[test]
    fn every_kind_is_decodable() {
        for kind in ResourceKind::value_variants() {
            assert!(SUPPORTED_TYPES.contains(&ResourceType::from(*kind)));
        }
        assert_eq!(ResourceKind::value_variants().len(), SUPPORTED_TYPES.len());
    }
}
