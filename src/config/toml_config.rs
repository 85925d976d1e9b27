use crate::utils::error::{AidError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub location: LocationConfig,
    pub places: PlacesConfig,
    pub gemini: GeminiConfig,
    pub pipeline: PipelineConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStrategy {
    /// 由公網 IP 推估
    Ip,
    /// 將固定地名地理編碼
    Geocode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub strategy: LocationStrategy,
    pub ip_lookup_url: String,
    pub geocode_url: String,
    pub place_name: String,
    pub user_agent: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            strategy: LocationStrategy::Ip,
            ip_lookup_url: "https://ipinfo.io/json".to_string(),
            geocode_url: "https://nominatim.openstreetmap.org/search".to_string(),
            place_name: "India".to_string(),
            user_agent: "wound_assistance_app".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub endpoint: String,
    pub api_key: String,
    pub radius_meters: u32,
    pub category: String,
    pub map_search_base: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/place/nearbysearch/json".to_string(),
            api_key: "${GOOGLE_MAPS_API_KEY}".to_string(),
            radius_meters: 5000,
            category: "hospital".to_string(),
            map_search_base: "https://www.google.com/maps/search/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub vision_model: String,
    pub text_model: String,
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GOOGLE_API_KEY}".to_string(),
            vision_model: "gemini-2.0-flash".to_string(),
            text_model: "gemini-2.0-flash-lite".to_string(),
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 任一階段失敗即丟棄所有結果
    AllOrNothing,
    /// 保留已完成階段並列出各階段錯誤
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub failure_policy: FailurePolicy,
    pub hospital_narrative: bool,
    pub stage_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Partial,
            hospital_narrative: false,
            stage_timeout_seconds: 60,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// 所有 adapter 共用的 client 設定，每次呼叫都有明確逾時
    pub fn build_client(&self, user_agent: Option<&str>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout());
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        builder.build().map_err(AidError::HttpError)
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AidError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: AppConfig =
            toml::from_str(&processed_content).map_err(|e| AidError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // 預設值中的 ${VAR} 也需要替換
        config.places.api_key = Self::substitute_env_vars(&config.places.api_key)?;
        config.gemini.api_key = Self::substitute_env_vars(&config.gemini.api_key)?;

        Ok(config)
    }

    /// 替換環境變數 (例如 ${GOOGLE_API_KEY})，未設定者原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AidError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        match self.location.strategy {
            LocationStrategy::Ip => {
                validation::validate_url("location.ip_lookup_url", &self.location.ip_lookup_url)?
            }
            LocationStrategy::Geocode => {
                validation::validate_url("location.geocode_url", &self.location.geocode_url)?;
                validation::validate_non_empty_string(
                    "location.place_name",
                    &self.location.place_name,
                )?;
                validation::validate_non_empty_string(
                    "location.user_agent",
                    &self.location.user_agent,
                )?;
            }
        }

        validation::validate_url("places.endpoint", &self.places.endpoint)?;
        validation::validate_url("places.map_search_base", &self.places.map_search_base)?;
        validation::validate_api_key("places.api_key", &self.places.api_key)?;
        validation::validate_positive_number(
            "places.radius_meters",
            u64::from(self.places.radius_meters),
            1,
        )?;
        validation::validate_non_empty_string("places.category", &self.places.category)?;

        validation::validate_url("gemini.endpoint", &self.gemini.endpoint)?;
        validation::validate_api_key("gemini.api_key", &self.gemini.api_key)?;
        validation::validate_non_empty_string("gemini.vision_model", &self.gemini.vision_model)?;
        validation::validate_non_empty_string("gemini.text_model", &self.gemini.text_model)?;
        validation::validate_range("gemini.temperature", self.gemini.temperature, 0.0, 2.0)?;

        validation::validate_positive_number(
            "pipeline.stage_timeout_seconds",
            self.pipeline.stage_timeout_seconds,
            1,
        )?;
        validation::validate_positive_number("http.timeout_seconds", self.http.timeout_seconds, 1)?;

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
