use std::collections::HashMap;
use std::time::Duration;

use geo::Coord;
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::errors::FootprintError;
use crate::geo_core::{Frame, FramedPolygon, GeoPoint};
use crate::geometric::footprint::{FootprintCandidateSet, RawFootprintCandidate};

/// Provenance label stamped on footprints produced from this source.
pub const PROVENANCE: &str = "OpenStreetMap";

const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const USER_AGENT: &str = concat!("eavesight/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the Overpass API.
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub endpoint: Url,
    /// Bounded wait for the remote query, also passed to the Overpass
    /// server as the query timeout.
    pub timeout: Duration,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        OverpassConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Overpass API response document.
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

/// One element of an Overpass response. Geometry and tags are optional;
/// elements without a vertex geometry cannot bound an area and are skipped.
#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    geometry: Option<Vec<OverpassVertex>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct OverpassVertex {
    lat: f64,
    lon: f64,
}

/// Footprint source adapter: queries building-tagged ways and relations
/// around a point and parses the result into a uniform candidate set.
pub struct OverpassCollect {
    client: Client,
    config: OverpassConfig,
}

impl OverpassCollect {
    pub fn new(config: OverpassConfig) -> Result<Self, FootprintError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| {
                FootprintError::SourceUnavailable(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(OverpassCollect { client, config })
    }

    /// Fetch building candidates within `radius_m` meters of `point`.
    ///
    /// A successful query with zero usable features yields an empty set,
    /// not an error. Network failures and unparseable responses surface as
    /// `SourceUnavailable` and are never retried here.
    pub fn fetch_candidates(
        &self,
        point: GeoPoint,
        radius_m: u32,
    ) -> Result<FootprintCandidateSet, FootprintError> {
        let query = self.build_query(point, radius_m);
        log::debug!("Overpass query:\n{query}");

        let response = self
            .client
            .get(self.config.endpoint.as_str())
            .query(&[("data", query.as_str())])
            .send()
            .map_err(|err| {
                FootprintError::SourceUnavailable(format!("Overpass request failed: {err}"))
            })?;

        if !response.status().is_success() {
            return Err(FootprintError::SourceUnavailable(format!(
                "Overpass returned HTTP {}",
                response.status()
            )));
        }

        let body = response.text().map_err(|err| {
            FootprintError::SourceUnavailable(format!("failed to read Overpass response: {err}"))
        })?;

        parse_candidates(&body)
    }

    fn build_query(&self, point: GeoPoint, radius_m: u32) -> String {
        format!(
            "[out:json][timeout:{timeout}];\n\
             (\n\
             \x20 way[\"building\"](around:{radius},{lat},{lon});\n\
             \x20 relation[\"building\"](around:{radius},{lat},{lon});\n\
             );\n\
             out geom;",
            timeout = self.config.timeout.as_secs(),
            radius = radius_m,
            lat = point.latitude,
            lon = point.longitude,
        )
    }
}

/// Parse an Overpass JSON document into a candidate set.
///
/// Only `way` elements carrying an explicit vertex geometry of at least
/// 3 vertices are retained; everything else is dropped silently. The
/// building-subtype tag defaults to "yes" when absent.
pub fn parse_candidates(body: &str) -> Result<FootprintCandidateSet, FootprintError> {
    let response: OverpassResponse = serde_json::from_str(body).map_err(|err| {
        FootprintError::SourceUnavailable(format!("unparseable Overpass response: {err}"))
    })?;

    let mut candidates = Vec::new();
    for element in response.elements {
        if element.kind != "way" {
            continue;
        }
        let Some(geometry) = element.geometry else {
            continue;
        };
        if geometry.len() < 3 {
            // Fewer than 3 vertices cannot bound an area.
            log::debug!("dropping degenerate way {} ({} vertices)", element.id, geometry.len());
            continue;
        }

        let exterior: Vec<Coord<f64>> = geometry
            .iter()
            .map(|vertex| Coord {
                x: vertex.lon,
                y: vertex.lat,
            })
            .collect();

        let building_type = element
            .tags
            .as_ref()
            .and_then(|tags| tags.get("building"))
            .cloned()
            .unwrap_or_else(|| "yes".to_string());

        candidates.push(RawFootprintCandidate {
            source_id: element.id,
            building_type,
            outline: FramedPolygon::new(exterior, Frame::Geographic),
        });
    }

    Ok(FootprintCandidateSet::new(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_elements() {
        let set = parse_candidates(r#"{"elements": []}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_elements_without_geometry() {
        // Tag-only response (e.g. "out tags" instead of "out geom").
        let body = r#"{
            "elements": [
                {"type": "way", "id": 1, "tags": {"building": "house"}},
                {"type": "way", "id": 2}
            ]
        }"#;
        let set = parse_candidates(body).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_drops_degenerate_and_non_way() {
        let body = r#"{
            "elements": [
                {"type": "node", "id": 10, "lat": 45.0, "lon": -75.0},
                {"type": "way", "id": 11, "geometry": [
                    {"lat": 45.0, "lon": -75.0},
                    {"lat": 45.0001, "lon": -75.0}
                ]},
                {"type": "way", "id": 12, "geometry": [
                    {"lat": 45.0, "lon": -75.0},
                    {"lat": 45.0001, "lon": -75.0},
                    {"lat": 45.0001, "lon": -75.0001},
                    {"lat": 45.0, "lon": -75.0}
                ], "tags": {"building": "garage"}}
            ]
        }"#;
        let set = parse_candidates(body).unwrap();
        assert_eq!(set.len(), 1);
        let candidate = set.iter().next().unwrap();
        assert_eq!(candidate.source_id, 12);
        assert_eq!(candidate.building_type, "garage");
        assert_eq!(candidate.outline.vertex_count(), 4);
        assert_eq!(candidate.outline.frame(), Frame::Geographic);
    }

    #[test]
    fn test_parse_building_type_defaults_to_yes() {
        let body = r#"{
            "elements": [
                {"type": "way", "id": 20, "geometry": [
                    {"lat": 45.0, "lon": -75.0},
                    {"lat": 45.0001, "lon": -75.0},
                    {"lat": 45.0, "lon": -75.0001}
                ]}
            ]
        }"#;
        let set = parse_candidates(body).unwrap();
        assert_eq!(set.iter().next().unwrap().building_type, "yes");
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_candidates("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, FootprintError::SourceUnavailable(_)));
    }

    #[test]
    fn test_fetch_surfaces_connection_failure() {
        // Discard port on localhost: connection is refused immediately.
        let config = OverpassConfig {
            endpoint: Url::parse("http://127.0.0.1:9/api/interpreter").unwrap(),
            timeout: Duration::from_secs(2),
        };
        let collect = OverpassCollect::new(config).unwrap();
        let err = collect
            .fetch_candidates(GeoPoint::new(45.42, -75.69), 50)
            .unwrap_err();
        assert!(matches!(err, FootprintError::SourceUnavailable(_)));
    }

    #[test]
    fn test_build_query_template() {
        let collect = OverpassCollect::new(OverpassConfig::default()).unwrap();
        let query = collect.build_query(GeoPoint::new(45.42, -75.69), 50);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("way[\"building\"](around:50,45.42,-75.69);"));
        assert!(query.contains("relation[\"building\"](around:50,45.42,-75.69);"));
        assert!(query.ends_with("out geom;"));
    }
}
