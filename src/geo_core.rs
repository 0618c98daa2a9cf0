use geo::{Area, Coord, EuclideanLength, LineString, Point, Polygon};
use proj::Proj;

use crate::errors::FootprintError;

/// Reference frame a geometry is expressed in.
///
/// All distance and length arithmetic must happen in a metric frame;
/// edge lengths computed in degrees are numerically meaningless
/// (1 degree of longitude is not 1 degree of latitude in meters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// WGS84 longitude/latitude in degrees (EPSG:4326).
    Geographic,
    /// A planar, meter-based projection identified by its EPSG code,
    /// e.g. EPSG:3347 (Statistics Canada Lambert).
    Metric(u32),
}

impl Frame {
    pub fn epsg(self) -> u32 {
        match self {
            Frame::Geographic => 4326,
            Frame::Metric(epsg) => epsg,
        }
    }

    /// CRS identifier in the form understood by proj, e.g. "EPSG:4326".
    pub fn crs(self) -> String {
        format!("EPSG:{}", self.epsg())
    }
}

/// A geocoded query point: (latitude, longitude) in degrees, WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Coordinate in (x = longitude, y = latitude) axis order.
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A building outline: an ordered exterior ring tagged with the frame its
/// coordinates are expressed in. The ring is stored as given by the source;
/// closure is applied when converting to a polygon for measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct FramedPolygon {
    exterior: Vec<Coord<f64>>,
    frame: Frame,
}

impl FramedPolygon {
    pub fn new(exterior: Vec<Coord<f64>>, frame: Frame) -> Self {
        FramedPolygon { exterior, frame }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn exterior(&self) -> &[Coord<f64>] {
        &self.exterior
    }

    pub fn vertex_count(&self) -> usize {
        self.exterior.len()
    }

    /// Closed `geo` polygon for distance/area/length algorithms.
    pub fn to_geo(&self) -> Polygon<f64> {
        Polygon::new(LineString::from(self.exterior.clone()), vec![])
    }

    /// Total boundary length: sum of Euclidean edge lengths including the
    /// closing edge. Meaningful in a metric frame, where the result is in
    /// meters. Degenerate rings (self-intersecting, zero-area) are not
    /// rejected; the perimeter is computed from the ring as given.
    pub fn perimeter(&self) -> f64 {
        self.to_geo().exterior().euclidean_length()
    }

    /// Planar (shoelace) area magnitude. Square meters in a metric frame.
    pub fn area(&self) -> f64 {
        self.to_geo().unsigned_area()
    }
}

/// Coordinate transformation between two reference frames.
///
/// Wraps a proj pipeline with normalized (x = easting/longitude) axis order.
pub struct Reprojector {
    transform: Proj,
    from: Frame,
    to: Frame,
}

impl Reprojector {
    pub fn new(from: Frame, to: Frame) -> Result<Self, FootprintError> {
        let transform = Proj::new_known_crs(&from.crs(), &to.crs(), None).map_err(|err| {
            FootprintError::Projection {
                from: from.crs(),
                to: to.crs(),
                detail: err.to_string(),
            }
        })?;

        Ok(Reprojector {
            transform,
            from,
            to,
        })
    }

    pub fn from_frame(&self) -> Frame {
        self.from
    }

    pub fn to_frame(&self) -> Frame {
        self.to
    }

    pub fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, FootprintError> {
        let (x, y) = self
            .transform
            .convert((coord.x, coord.y))
            .map_err(|err| FootprintError::Projection {
                from: self.from.crs(),
                to: self.to.crs(),
                detail: err.to_string(),
            })?;
        Ok(Coord { x, y })
    }

    /// Project a geographic query point into the target frame.
    pub fn project_point(&self, point: GeoPoint) -> Result<Point<f64>, FootprintError> {
        let coord = self.project_coord(point.to_coord())?;
        Ok(Point::from(coord))
    }

    /// Project a polygon into the target frame, preserving vertex order.
    /// Fails when the polygon is not expressed in this reprojector's source
    /// frame; the transform is undefined for that pair.
    pub fn project_polygon(
        &self,
        polygon: &FramedPolygon,
    ) -> Result<FramedPolygon, FootprintError> {
        if polygon.frame() != self.from {
            return Err(FootprintError::Projection {
                from: polygon.frame().crs(),
                to: self.to.crs(),
                detail: format!(
                    "polygon is in {} but the transform expects {}",
                    polygon.frame().crs(),
                    self.from.crs()
                ),
            });
        }

        let exterior = polygon
            .exterior()
            .iter()
            .map(|&coord| self.project_coord(coord))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FramedPolygon::new(exterior, self.to))
    }
}
