use geo::{EuclideanDistance, Point, Polygon};

use crate::collect::overpass::{self, OverpassCollect, OverpassConfig};
use crate::errors::FootprintError;
use crate::geo_core::{Frame, FramedPolygon, GeoPoint, Reprojector};

/// One building outline as returned by the remote source, before selection.
/// The outline is in the geographic frame and carries at least 3 vertices;
/// anything smaller is discarded during parsing.
#[derive(Debug, Clone)]
pub struct RawFootprintCandidate {
    /// Source-assigned identifier (OSM way id).
    pub source_id: i64,
    /// Building-subtype tag, "yes" when the source gives no subtype.
    pub building_type: String,
    pub outline: FramedPolygon,
}

/// All candidates produced by one bounded-radius query. Empty is a valid
/// outcome: the query succeeded but no usable building was nearby.
#[derive(Debug, Clone, Default)]
pub struct FootprintCandidateSet {
    candidates: Vec<RawFootprintCandidate>,
}

impl FootprintCandidateSet {
    pub fn new(candidates: Vec<RawFootprintCandidate>) -> Self {
        FootprintCandidateSet { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawFootprintCandidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[RawFootprintCandidate] {
        &self.candidates
    }
}

/// The finalized, caller-owned result: a closed polygon in the metric
/// frame with its measurements and provenance.
#[derive(Debug, Clone)]
pub struct BuildingFootprint {
    pub outline: FramedPolygon,
    pub perimeter_m: f64,
    pub area_sqm: f64,
    pub source: String,
}

/// Configuration held by the assembler. Explicit values, no ambient globals.
#[derive(Debug, Clone)]
pub struct FootprintConfig {
    /// Search radius around the query point, in meters.
    pub radius_m: u32,
    /// Multiplicative safety margin applied to the raw perimeter to account
    /// for material waste and overlap.
    pub waste_factor: f64,
    /// EPSG code of the planar projection used for all distance and length
    /// arithmetic. EPSG:3347 (Statistics Canada Lambert) by default.
    pub metric_epsg: u32,
    pub overpass: OverpassConfig,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        FootprintConfig {
            radius_m: 50,
            waste_factor: 0.15,
            metric_epsg: 3347,
            overpass: OverpassConfig::default(),
        }
    }
}

impl FootprintConfig {
    pub fn metric_frame(&self) -> Frame {
        Frame::Metric(self.metric_epsg)
    }

    /// Recommended material length for a measured perimeter.
    pub fn recommended_length(&self, perimeter_m: f64) -> f64 {
        perimeter_m * (1.0 + self.waste_factor)
    }
}

/// Index of the polygon nearest to `point`, all geometries in the same
/// metric frame. Distance to the boundary or interior, zero when the point
/// lies inside. Strict `<` keeps the first candidate on exact ties, so the
/// choice is stable in input order.
fn nearest_index(point: &Point<f64>, polygons: &[Polygon<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, polygon) in polygons.iter().enumerate() {
        let distance = polygon.euclidean_distance(point);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Select the candidate with minimum Euclidean distance to the query point,
/// measured in the given metric frame. `None` on an empty set; this is the
/// sole place where "no building found" is decided after a successful query.
/// Linear scan; no spatial index at the expected scale of tens of features.
pub fn select_nearest<'a>(
    point: GeoPoint,
    candidates: &'a FootprintCandidateSet,
    metric: Frame,
) -> Result<Option<&'a RawFootprintCandidate>, FootprintError> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let reproj = Reprojector::new(Frame::Geographic, metric)?;
    let point_m = reproj.project_point(point)?;

    let polygons = candidates
        .iter()
        .map(|candidate| Ok(reproj.project_polygon(&candidate.outline)?.to_geo()))
        .collect::<Result<Vec<_>, FootprintError>>()?;

    Ok(nearest_index(&point_m, &polygons).map(|idx| &candidates.as_slice()[idx]))
}

/// Footprint assembler: the single externally-consumed entry point of the
/// pipeline. Fetches candidates, selects the nearest, measures it in the
/// metric frame and stamps provenance.
pub struct FootprintLoader {
    collect: OverpassCollect,
    config: FootprintConfig,
}

impl FootprintLoader {
    pub fn new(config: FootprintConfig) -> Result<Self, FootprintError> {
        let collect = OverpassCollect::new(config.overpass.clone())?;
        Ok(FootprintLoader { collect, config })
    }

    pub fn config(&self) -> &FootprintConfig {
        &self.config
    }

    /// Query the building footprint nearest to `point`.
    ///
    /// Returns `Ok(None)` when no building is found, which covers both an
    /// empty candidate set and an unavailable source; the two render the
    /// same user-facing outcome. Projection failures remain errors: the
    /// query cannot produce a trustworthy measurement without a transform.
    pub fn query_building_footprint(
        &self,
        point: GeoPoint,
    ) -> Result<Option<BuildingFootprint>, FootprintError> {
        let candidates = match self.collect.fetch_candidates(point, self.config.radius_m) {
            Ok(candidates) => candidates,
            Err(FootprintError::SourceUnavailable(reason)) => {
                log::warn!("building source unavailable, reporting no result: {reason}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        log::info!(
            "{} candidate footprint(s) within {} m",
            candidates.len(),
            self.config.radius_m
        );

        let metric = self.config.metric_frame();
        let Some(candidate) = select_nearest(point, &candidates, metric)? else {
            return Ok(None);
        };
        log::debug!(
            "selected way {} (building={})",
            candidate.source_id,
            candidate.building_type
        );

        let reproj = Reprojector::new(Frame::Geographic, metric)?;
        let outline = reproj.project_polygon(&candidate.outline)?;
        let perimeter_m = outline.perimeter();
        let area_sqm = outline.area();

        Ok(Some(BuildingFootprint {
            outline,
            perimeter_m,
            area_sqm,
            source: overpass::PROVENANCE.to_string(),
        }))
    }
}
