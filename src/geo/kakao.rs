// Kakao Local (address search) and Kakao Mobility (directions) clients.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{GeoError, GeoService};
use crate::config::KakaoConfig;
use crate::data::model::GeoPoint;

#[derive(Debug, Deserialize)]
struct AddressSearchResponse {
    #[serde(default)]
    documents: Vec<AddressDocument>,
}

/// Kakao returns coordinates as strings: `x` = longitude, `y` = latitude.
#[derive(Debug, Deserialize)]
struct AddressDocument {
    x: String,
    y: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    result_code: i32,
    #[serde(default)]
    result_msg: String,
    summary: Option<RouteSummary>,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    /// Seconds.
    duration: f64,
}

pub struct KakaoClient {
    client: Client,
    api_key: Option<String>,
    geocode_url: String,
    directions_url: String,
}

impl KakaoClient {
    pub fn new(cfg: &KakaoConfig) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GeoError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            geocode_url: cfg.geocode_url.trim_end_matches('/').to_string(),
            directions_url: cfg.directions_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str) -> Result<String, GeoError> {
        let key = self.api_key.as_deref().ok_or(GeoError::MissingApiKey)?;
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("KakaoAK {key}"))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

impl GeoService for KakaoClient {
    fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        let url = format!("{}?query={}", self.geocode_url, urlencoding::encode(address));
        parse_address_search(&self.get(&url)?, address)
    }

    fn route_seconds(&self, origin: GeoPoint, destination: GeoPoint) -> Result<f64, GeoError> {
        let url = format!(
            "{}?origin={},{}&destination={},{}&priority=TIME",
            self.directions_url, origin.lon, origin.lat, destination.lon, destination.lat
        );
        parse_directions(&self.get(&url)?)
    }
}

fn parse_address_search(body: &str, address: &str) -> Result<GeoPoint, GeoError> {
    let response: AddressSearchResponse =
        serde_json::from_str(body).map_err(|e| GeoError::Decode(e.to_string()))?;
    let first = response
        .documents
        .first()
        .ok_or_else(|| GeoError::UnresolvableAddress(address.to_string()))?;

    let lon = first
        .x
        .parse::<f64>()
        .map_err(|_| GeoError::Decode(format!("longitude '{}'", first.x)))?;
    let lat = first
        .y
        .parse::<f64>()
        .map_err(|_| GeoError::Decode(format!("latitude '{}'", first.y)))?;
    Ok(GeoPoint::new(lat, lon))
}

fn parse_directions(body: &str) -> Result<f64, GeoError> {
    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| GeoError::Decode(e.to_string()))?;
    let route = response
        .routes
        .first()
        .ok_or_else(|| GeoError::NoRoute("empty route list".into()))?;
    if route.result_code != 0 {
        return Err(GeoError::NoRoute(format!(
            "{} ({})",
            route.result_msg, route.result_code
        )));
    }
    let duration = route
        .summary
        .as_ref()
        .map(|s| s.duration)
        .ok_or_else(|| GeoError::Decode("route without summary".into()))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(GeoError::Decode(format!("route duration {duration}")));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_address_candidate_is_used() {
        let body = r#"{
            "meta": {"total_count": 2},
            "documents": [
                {"address_name": "서울 중구 세종대로 110", "x": "126.978652", "y": "37.566826"},
                {"address_name": "다른 후보", "x": "127.0", "y": "37.0"}
            ]
        }"#;
        let point = parse_address_search(body, "서울시청").unwrap();
        assert_eq!(point, GeoPoint::new(37.566826, 126.978652));
    }

    #[test]
    fn no_documents_is_unresolvable() {
        let err = parse_address_search(r#"{"documents": []}"#, "없는 주소").unwrap_err();
        assert_eq!(err, GeoError::UnresolvableAddress("없는 주소".into()));
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(
            parse_address_search("<html>", "x"),
            Err(GeoError::Decode(_))
        ));
    }

    #[test]
    fn directions_duration_in_seconds() {
        let body = r#"{
            "trans_id": "abc",
            "routes": [{
                "result_code": 0,
                "result_msg": "길찾기 성공",
                "summary": {"distance": 12000, "duration": 1830}
            }]
        }"#;
        assert_eq!(parse_directions(body).unwrap(), 1830.0);
    }

    #[test]
    fn failed_route_code_is_no_route() {
        let body = r#"{"routes": [{"result_code": 104, "result_msg": "출발지와 도착지가 5 m 이내로 설정된 경우 경로를 탐색할 수 없음"}]}"#;
        assert!(matches!(parse_directions(body), Err(GeoError::NoRoute(_))));
    }

    #[test]
    fn negative_duration_is_decode_error() {
        let body = r#"{"routes": [{"result_code": 0, "summary": {"duration": -5}}]}"#;
        assert!(matches!(parse_directions(body), Err(GeoError::Decode(_))));
    }

    #[test]
    fn missing_key_fails_before_network() {
        let client = KakaoClient::new(&KakaoConfig::default()).unwrap();
        assert_eq!(client.geocode("서울"), Err(GeoError::MissingApiKey));
    }
}
