use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::errors::FootprintError;
use crate::geo_core::GeoPoint;

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const USER_AGENT: &str = concat!("eavesight/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the Nominatim geocoding API.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub endpoint: Url,
    /// Optional ISO 3166-1 alpha-2 country code constraint, e.g. "ca".
    pub country_codes: Option<String>,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            country_codes: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// One place from a Nominatim search response. Coordinates are returned
/// as decimal strings by the API.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Free-text address geocoder backed by Nominatim.
pub struct NominatimGeocoder {
    client: Client,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, FootprintError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| {
                FootprintError::SourceUnavailable(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(NominatimGeocoder { client, config })
    }

    /// Resolve an address to a WGS84 point. `GeocodeNotFound` when the
    /// service answers but knows no such address; `SourceUnavailable` when
    /// the service cannot be reached or answers garbage.
    pub fn geocode(&self, address: &str) -> Result<GeoPoint, FootprintError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", address.to_string()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(codes) = &self.config.country_codes {
            params.push(("countrycodes", codes.clone()));
        }

        let response = self
            .client
            .get(self.config.endpoint.as_str())
            .query(&params)
            .send()
            .map_err(|err| {
                FootprintError::SourceUnavailable(format!("geocoding request failed: {err}"))
            })?;

        if !response.status().is_success() {
            return Err(FootprintError::SourceUnavailable(format!(
                "geocoder returned HTTP {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response.json().map_err(|err| {
            FootprintError::SourceUnavailable(format!("unparseable geocoder response: {err}"))
        })?;

        let Some(place) = places.into_iter().next() else {
            return Err(FootprintError::GeocodeNotFound(address.to_string()));
        };

        if let Some(name) = &place.display_name {
            log::debug!("geocoded \"{address}\" to {name}");
        }

        let latitude: f64 = place.lat.parse().map_err(|_| {
            FootprintError::SourceUnavailable(format!(
                "non-numeric latitude in geocoder response: {}",
                place.lat
            ))
        })?;
        let longitude: f64 = place.lon.parse().map_err(|_| {
            FootprintError::SourceUnavailable(format!(
                "non-numeric longitude in geocoder response: {}",
                place.lon
            ))
        })?;

        Ok(GeoPoint::new(latitude, longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_deserialization() {
        let body = r#"[{"lat": "45.4215", "lon": "-75.6972", "display_name": "Ottawa"}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].lat, "45.4215");
        assert_eq!(places[0].display_name.as_deref(), Some("Ottawa"));
    }

    #[test]
    fn test_place_without_display_name() {
        let body = r#"[{"lat": "45.0", "lon": "-75.0"}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        assert!(places[0].display_name.is_none());
    }

    #[test]
    fn test_geocode_surfaces_connection_failure() {
        let config = GeocoderConfig {
            endpoint: Url::parse("http://127.0.0.1:9/search").unwrap(),
            country_codes: Some("ca".to_string()),
            timeout: Duration::from_secs(2),
        };
        let geocoder = NominatimGeocoder::new(config).unwrap();
        let err = geocoder.geocode("24 Sussex Drive, Ottawa").unwrap_err();
        assert!(matches!(err, FootprintError::SourceUnavailable(_)));
    }
}
