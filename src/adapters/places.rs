use crate::config::{HttpConfig, PlacesConfig};
use crate::domain::model::{Coordinates, HospitalRecord, HospitalSearch};
use crate::domain::ports::HospitalFinder;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<Place>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    vicinity: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

/// Google Places nearby search
pub struct PlacesHospitalFinder {
    endpoint: String,
    api_key: String,
    category: String,
    map_search_base: String,
    client: Client,
}

impl PlacesHospitalFinder {
    pub fn new(config: &PlacesConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            category: config.category.clone(),
            map_search_base: config.map_search_base.clone(),
            client: http.build_client(None)?,
        })
    }

    /// `{base}?q=Hospital+{name}&hl=en`，名稱以 form-urlencoded 編碼（空白 -> '+'）
    pub fn map_link(&self, name: &str) -> String {
        build_map_link(&self.map_search_base, name)
    }

    fn to_records(&self, places: Vec<Place>) -> Vec<HospitalRecord> {
        let total = places.len();
        let records: Vec<HospitalRecord> = places
            .into_iter()
            .filter(|place| place.types.iter().any(|t| t == &self.category))
            .filter_map(|place| {
                let name = place.name.filter(|n| !n.trim().is_empty())?;
                Some(HospitalRecord {
                    map_link: self.map_link(&name),
                    address: place.vicinity.unwrap_or_default(),
                    name,
                })
            })
            .collect();

        if records.len() < total {
            tracing::debug!(
                "🏥 Dropped {} of {} places not tagged '{}'",
                total - records.len(),
                total,
                self.category
            );
        }
        records
    }
}

#[async_trait]
impl HospitalFinder for PlacesHospitalFinder {
    async fn find_hospitals(
        &self,
        coordinates: &Coordinates,
        radius_meters: u32,
    ) -> HospitalSearch {
        tracing::debug!(
            "📡 Nearby search at {} (radius {}m, type {})",
            coordinates.as_query(),
            radius_meters,
            self.category
        );

        let radius = radius_meters.to_string();
        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[
                ("location", coordinates.as_query().as_str()),
                ("radius", radius.as_str()),
                ("type", self.category.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // URL 含 API key，錯誤訊息不可帶出
                let e = e.without_url();
                tracing::warn!("⚠️ Place search request failed: {}", e);
                return HospitalSearch::Unavailable(format!("request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("⚠️ Place search returned {}", status);
            return HospitalSearch::Unavailable(format!("place search returned {}", status));
        }

        let body: NearbySearchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                let e = e.without_url();
                tracing::warn!("⚠️ Place search response could not be decoded: {}", e);
                return HospitalSearch::Unavailable(format!("undecodable response: {}", e));
            }
        };

        match body.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => {}
            Some(other) => {
                let detail = body.error_message.unwrap_or_default();
                tracing::warn!("⚠️ Place search status {}: {}", other, detail);
                return HospitalSearch::Unavailable(format!("{} {}", other, detail).trim().to_string());
            }
        }

        let search = HospitalSearch::from_records(self.to_records(body.results));
        tracing::info!("🏥 Found {} hospitals nearby", search.records().len());
        search
    }
}

pub fn build_map_link(base: &str, name: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("{}?q=Hospital+{}&hl=en", base, encoded)
}
