pub mod collect;
pub mod errors;
pub mod geo_core;
pub mod geometric;
pub mod render;

pub use errors::FootprintError;
pub use geo_core::{Frame, FramedPolygon, GeoPoint, Reprojector};
pub use geometric::footprint::{
    select_nearest, BuildingFootprint, FootprintCandidateSet, FootprintConfig, FootprintLoader,
    RawFootprintCandidate,
};
