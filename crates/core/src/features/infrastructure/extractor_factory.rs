use crate::features::domain::feature_extractor::FeatureExtractor;

use super::orb_extractor::OrbExtractor;
use super::surf_extractor::SurfExtractor;

/// Local feature backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractorKind {
    /// Binary descriptors matched by Hamming distance.
    #[default]
    Orb,
    /// Float descriptors matched by Euclidean distance.
    Surf,
}

impl std::str::FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orb" => Ok(ExtractorKind::Orb),
            "surf" => Ok(ExtractorKind::Surf),
            other => Err(format!("unknown feature extractor '{other}' (expected orb or surf)")),
        }
    }
}

/// Creates the feature extractor for `kind` and logs the selection.
pub fn create_extractor(kind: ExtractorKind) -> Box<dyn FeatureExtractor> {
    log::info!("Using {:?} feature extractor", kind);
    match kind {
        ExtractorKind::Orb => Box::new(OrbExtractor::new()),
        ExtractorKind::Surf => Box::new(SurfExtractor::new()),
    }
}
