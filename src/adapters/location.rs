use crate::config::{HttpConfig, LocationConfig, LocationStrategy};
use crate::domain::model::Coordinates;
use crate::domain::ports::LocationResolver;
use crate::utils::error::{AidError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// ipinfo 風格的回應
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Nominatim 搜尋結果，座標以字串傳回
#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// 由呼叫端的公網 IP 推估座標
pub struct IpLocationResolver {
    endpoint: String,
    client: Client,
}

impl IpLocationResolver {
    pub fn new(config: &LocationConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.ip_lookup_url.clone(),
            client: http.build_client(None)?,
        })
    }

    async fn lookup(&self) -> Result<Coordinates> {
        tracing::debug!("📡 IP lookup: {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AidError::location(format!("IP lookup returned {}", status)));
        }

        let body: IpLookupResponse = response.json().await?;
        let loc = body
            .loc
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| AidError::location("IP lookup response has no loc field"))?;

        let (latitude, longitude) = parse_lat_lon(loc)?;

        Ok(Coordinates {
            latitude,
            longitude,
            city: body.city,
            region: body.region,
            country: body.country,
            display_name: None,
        })
    }
}

#[async_trait]
impl LocationResolver for IpLocationResolver {
    async fn resolve(&self) -> Result<Coordinates> {
        self.lookup().await.map_err(into_location_error)
    }
}

/// 將固定地名地理編碼成座標
pub struct GeocodedLocationResolver {
    endpoint: String,
    place_name: String,
    client: Client,
}

impl GeocodedLocationResolver {
    pub fn new(config: &LocationConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.geocode_url.clone(),
            place_name: config.place_name.clone(),
            // Nominatim 要求帶 User-Agent
            client: http.build_client(Some(&config.user_agent))?,
        })
    }

    async fn geocode(&self) -> Result<Coordinates> {
        tracing::debug!("📡 Geocoding '{}' via {}", self.place_name, self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", self.place_name.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AidError::location(format!("geocoder returned {}", status)));
        }

        let hits: Vec<GeocodeHit> = response.json().await?;
        let hit = hits.into_iter().next().ok_or_else(|| {
            AidError::location(format!("no geocoding result for '{}'", self.place_name))
        })?;

        let latitude = parse_degree(&hit.lat)?;
        let longitude = parse_degree(&hit.lon)?;
        tracing::debug!(
            "📍 '{}' resolved to {:?}",
            self.place_name,
            hit.display_name.as_deref().unwrap_or("?")
        );

        // 固定地名可能是國家或城市，不猜測其層級
        let mut coordinates = Coordinates::new(latitude, longitude);
        coordinates.display_name = hit.display_name.filter(|n| !n.trim().is_empty());
        Ok(coordinates)
    }
}

#[async_trait]
impl LocationResolver for GeocodedLocationResolver {
    async fn resolve(&self) -> Result<Coordinates> {
        self.geocode().await.map_err(into_location_error)
    }
}

/// 依配置選擇策略
pub fn resolver_from_config(
    config: &LocationConfig,
    http: &HttpConfig,
) -> Result<Box<dyn LocationResolver>> {
    Ok(match config.strategy {
        LocationStrategy::Ip => Box::new(IpLocationResolver::new(config, http)?),
        LocationStrategy::Geocode => Box::new(GeocodedLocationResolver::new(config, http)?),
    })
}

fn into_location_error(error: AidError) -> AidError {
    match error {
        AidError::LocationUnavailable { .. } => error,
        other => {
            tracing::warn!("⚠️ Location fetch error: {}", other);
            AidError::location(other.to_string())
        }
    }
}

fn parse_lat_lon(loc: &str) -> Result<(f64, f64)> {
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| AidError::location(format!("malformed loc value: {}", loc)))?;
    Ok((parse_degree(lat)?, parse_degree(lon)?))
}

fn parse_degree(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AidError::location(format!("invalid coordinate: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn location_config(server: &MockServer) -> LocationConfig {
        LocationConfig {
            ip_lookup_url: server.url("/json"),
            geocode_url: server.url("/search"),
            place_name: "Mumbai".to_string(),
            ..LocationConfig::default()
        }
    }

    #[test]
    fn test_parse_lat_lon() {
        assert_eq!(parse_lat_lon("19.0728,72.8826").unwrap(), (19.0728, 72.8826));
        assert!(parse_lat_lon("19.0728").is_err());
        assert!(parse_lat_lon("north,east").is_err());
    }

    #[tokio::test]
    async fn test_ip_lookup_success() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "ip": "203.0.113.7",
                    "city": "Mumbai",
                    "region": "Maharashtra",
                    "country": "IN",
                    "loc": "19.07,72.87"
                }));
        });

        let resolver =
            IpLocationResolver::new(&location_config(&server), &HttpConfig::default()).unwrap();
        let coordinates = resolver.resolve().await.unwrap();

        api_mock.assert();
        assert_eq!(coordinates.latitude, 19.07);
        assert_eq!(coordinates.longitude, 72.87);
        assert_eq!(coordinates.describe().as_deref(), Some("Mumbai, Maharashtra, IN"));
    }

    #[tokio::test]
    async fn test_ip_lookup_without_loc_is_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200).json_body(serde_json::json!({ "bogon": true }));
        });

        let resolver =
            IpLocationResolver::new(&location_config(&server), &HttpConfig::default()).unwrap();
        assert!(matches!(
            resolver.resolve().await,
            Err(AidError::LocationUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_network_failure_is_converted() {
        let config = LocationConfig {
            // 沒有服務監聽的埠
            ip_lookup_url: "http://127.0.0.1:9/json".to_string(),
            ..LocationConfig::default()
        };
        let resolver = IpLocationResolver::new(&config, &HttpConfig::default()).unwrap();

        assert!(matches!(
            resolver.resolve().await,
            Err(AidError::LocationUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_geocode_fixed_place_name() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "Mumbai")
                .query_param("format", "json")
                .header("user-agent", "wound_assistance_app");
            then.status(200).json_body(serde_json::json!([
                { "lat": "19.0760", "lon": "72.8777", "display_name": "Mumbai, Maharashtra, India" }
            ]));
        });

        let resolver =
            GeocodedLocationResolver::new(&location_config(&server), &HttpConfig::default())
                .unwrap();
        let coordinates = resolver.resolve().await.unwrap();

        api_mock.assert();
        assert_eq!(coordinates.latitude, 19.076);
        assert_eq!(coordinates.longitude, 72.8777);
        assert_eq!(coordinates.city, None);
        assert_eq!(
            coordinates.describe().as_deref(),
            Some("Mumbai, Maharashtra, India")
        );
    }

    #[tokio::test]
    async fn test_geocode_no_hits() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(serde_json::json!([]));
        });

        let resolver =
            GeocodedLocationResolver::new(&location_config(&server), &HttpConfig::default())
                .unwrap();
        assert!(matches!(
            resolver.resolve().await,
            Err(AidError::LocationUnavailable { .. })
        ));
    }
}
