//! Routed distance and ETA from OpenRouteService.

use std::time::Duration;

use serde::Deserialize;
use waypoint_common::constants::routing::{ORS_BASE_URL, ORS_DRIVING_PATH};
use waypoint_common::{Coordinates, WaypointError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Summary of the first route returned by the directions API
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_min: u64,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: Properties,
}

#[derive(Deserialize)]
struct Properties {
    summary: Summary,
}

#[derive(Deserialize)]
struct Summary {
    /// Metres; absent for a zero-length route
    #[serde(default)]
    distance: f64,
    /// Seconds
    #[serde(default)]
    duration: f64,
}

/// Directions API client
#[derive(Clone)]
pub struct RouteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RouteClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, WaypointError> {
        Self::with_base_url(api_key, ORS_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, WaypointError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WaypointError::Routing(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Driving route from `start` to `end`
    pub async fn route(&self, start: Coordinates, end: Coordinates) -> Result<RouteSummary, WaypointError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), ORS_DRIVING_PATH);
        let (start, end) = (lon_lat(start), lon_lat(end));

        let response = self
            .http
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WaypointError::Routing(e.to_string()))?
            .error_for_status()
            .map_err(|e| WaypointError::Routing(e.to_string()))?;

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| WaypointError::Routing(e.to_string()))?;

        summarize(body)
    }
}

/// The API wants `longitude,latitude`
fn lon_lat(at: Coordinates) -> String {
    format!("{},{}", at.longitude, at.latitude)
}

fn summarize(body: DirectionsResponse) -> Result<RouteSummary, WaypointError> {
    let feature = body
        .features
        .into_iter()
        .next()
        .ok_or_else(|| WaypointError::Routing("No route found".to_string()))?;

    let summary = feature.properties.summary;

    Ok(RouteSummary {
        distance_km: summary.distance / 1000.0,
        duration_min: (summary.duration / 60.0).round().max(0.0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RouteSummary, WaypointError> {
        summarize(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_summarize_first_feature() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "geometry": { "type": "LineString", "coordinates": [[77.59, 12.97], [77.60, 12.98]] },
                "properties": { "summary": { "distance": 2345.6, "duration": 389.0 } }
            }]
        }"#;

        let route = parse(json).unwrap();
        assert!((route.distance_km - 2.3456).abs() < 1e-9);
        assert_eq!(route.duration_min, 6);
    }

    #[test]
    fn test_empty_summary_for_same_point() {
        let json = r#"{"features": [{
            "geometry": { "coordinates": [] },
            "properties": { "summary": {} }
        }]}"#;

        let route = parse(json).unwrap();
        assert_eq!(route.distance_km, 0.0);
        assert_eq!(route.duration_min, 0);
    }

    #[test]
    fn test_no_features_is_an_error() {
        let err = parse(r#"{"features": []}"#).unwrap_err();
        assert!(matches!(err, WaypointError::Routing(_)));
        assert!(parse("{}").is_err());
    }

    #[test]
    fn test_lon_lat_order() {
        let at = Coordinates { latitude: 12.5, longitude: 77.25 };
        assert_eq!(lon_lat(at), "77.25,12.5");
    }

    #[test]
    fn test_unreachable_host_reports_routing_error() {
        let client = RouteClient::with_base_url("key", "http://127.0.0.1:9").unwrap();
        let start = Coordinates { latitude: 0.0, longitude: 0.0 };
        let result = tokio_test::block_on(client.route(start, start));
        assert!(matches!(result, Err(WaypointError::Routing(_))));
    }
}
