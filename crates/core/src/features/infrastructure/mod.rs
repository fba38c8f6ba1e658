pub mod extractor_factory;
pub mod orb_extractor;
pub mod surf_extractor;
