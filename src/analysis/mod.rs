pub mod edge_profile;
pub mod flat_region;
