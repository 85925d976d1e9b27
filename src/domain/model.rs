use crate::utils::error::AidError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 一次請求期間的裝置約略位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// 地理編碼服務回傳的完整地名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city: None,
            region: None,
            country: None,
            display_name: None,
        }
    }

    /// Places API 使用的 "lat,lon" 格式
    pub fn as_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// 優先使用完整地名，否則為 "City, Region, Country"，缺少的部分略過
    pub fn describe(&self) -> Option<String> {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }

        let parts: Vec<&str> = [
            self.city.as_deref(),
            self.region.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Latitude {}, Longitude {}", self.latitude, self.longitude)
    }
}

/// 封閉的傷口分類集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WoundLabel {
    Abrasion,
    Bruise,
    Burn,
    Cut,
    Normal,
}

impl WoundLabel {
    pub const ALL: [WoundLabel; 5] = [
        WoundLabel::Abrasion,
        WoundLabel::Bruise,
        WoundLabel::Burn,
        WoundLabel::Cut,
        WoundLabel::Normal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WoundLabel::Abrasion => "Abrasion",
            WoundLabel::Bruise => "Bruise",
            WoundLabel::Burn => "Burn",
            WoundLabel::Cut => "Cut",
            WoundLabel::Normal => "Normal",
        }
    }

    /// 分類提示詞中使用的名稱
    pub fn prompt_name(&self) -> &'static str {
        match self {
            WoundLabel::Abrasion => "Abrasions",
            WoundLabel::Bruise => "Bruises",
            WoundLabel::Burn => "Burns",
            WoundLabel::Cut => "Cut",
            WoundLabel::Normal => "Normal",
        }
    }
}

impl fmt::Display for WoundLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WoundLabel {
    type Err = ();

    /// 接受單複數、大小寫不拘，並容忍模型常加的引號與句點
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| c == '\'' || c == '"' || c == '`' || c == '*')
            .trim_end_matches('.')
            .trim()
            .to_ascii_lowercase();

        match cleaned.as_str() {
            "abrasion" | "abrasions" => Ok(WoundLabel::Abrasion),
            "bruise" | "bruises" => Ok(WoundLabel::Bruise),
            "burn" | "burns" => Ok(WoundLabel::Burn),
            "cut" | "cuts" => Ok(WoundLabel::Cut),
            "normal" => Ok(WoundLabel::Normal),
            _ => Err(()),
        }
    }
}

/// 分類結果：驗證後的標籤加上模型原始回覆（去除前後空白）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: WoundLabel,
    pub raw: String,
}

impl Classification {
    pub fn parse(response: &str) -> Result<Self, AidError> {
        let raw = response.trim();
        let label = raw
            .parse::<WoundLabel>()
            .map_err(|_| AidError::ClassificationAmbiguous {
                response: raw.to_string(),
            })?;

        Ok(Self {
            label,
            raw: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub name: String,
    pub address: String,
    pub map_link: String,
}

/// HospitalFinder 的標記結果，區分「沒有醫院」與「服務不可用」
#[derive(Debug, Clone, PartialEq)]
pub enum HospitalSearch {
    Found(Vec<HospitalRecord>),
    Empty,
    Unavailable(String),
}

impl HospitalSearch {
    pub fn from_records(records: Vec<HospitalRecord>) -> Self {
        if records.is_empty() {
            HospitalSearch::Empty
        } else {
            HospitalSearch::Found(records)
        }
    }

    pub fn records(&self) -> &[HospitalRecord] {
        match self {
            HospitalSearch::Found(records) => records,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn mime_for_extension(extension: &str) -> &'static str {
        match extension {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }
}

/// 使用者送出的內容
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Text(String),
    Image(ImageInput),
}

impl Submission {
    pub fn mode(&self) -> InputMode {
        match self {
            Submission::Text(_) => InputMode::Text,
            Submission::Image(_) => InputMode::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    AwaitingInput,
    LocationResolving,
    Classifying,
    AdviceGenerating,
    HospitalLookup,
    NarrativeGenerating,
    Rendered,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Rendered | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::AwaitingInput => "awaiting input",
            PipelineState::LocationResolving => "location",
            PipelineState::Classifying => "classification",
            PipelineState::AdviceGenerating => "first-aid advice",
            PipelineState::HospitalLookup => "hospital lookup",
            PipelineState::NarrativeGenerating => "hospital narrative",
            PipelineState::Rendered => "rendered",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 單一階段失敗紀錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageError {
    pub stage: PipelineState,
    pub message: String,
}

/// 單次請求的暫存資料，依管線順序單調填入
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub submitted_at: DateTime<Utc>,
    pub submission: Submission,
    pub coordinates: Option<Coordinates>,
    pub classification: Option<Classification>,
    pub advice: Option<String>,
    pub hospitals: Option<HospitalSearch>,
    pub hospital_narrative: Option<String>,
    pub errors: Vec<StageError>,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl RequestContext {
    pub fn new(submission: Submission) -> Self {
        let submitted_at = Utc::now();
        Self {
            request_id: format!("req-{}", submitted_at.format("%Y%m%d%H%M%S%3f")),
            submitted_at,
            submission,
            coordinates: None,
            classification: None,
            advice: None,
            hospitals: None,
            hospital_narrative: None,
            errors: Vec::new(),
            state: PipelineState::AwaitingInput,
            history: vec![PipelineState::Idle, PipelineState::AwaitingInput],
        }
    }

    pub fn mode(&self) -> InputMode {
        self.submission.mode()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// 終止狀態之後不再轉移
    pub fn transition(&mut self, next: PipelineState) {
        if self.state.is_terminal() {
            tracing::warn!(
                "⚠️ {}: ignoring transition {} -> {}",
                self.request_id,
                self.state,
                next
            );
            return;
        }
        tracing::debug!("🔀 {}: {} -> {}", self.request_id, self.state, next);
        self.state = next;
        self.history.push(next);
    }

    pub fn record_error(&mut self, stage: PipelineState, message: impl Into<String>) {
        self.errors.push(StageError {
            stage,
            message: message.into(),
        });
    }

    /// 全有全無策略下丟棄所有部分結果
    pub fn discard_partial_results(&mut self) {
        self.classification = None;
        self.advice = None;
        self.hospitals = None;
        self.hospital_narrative = None;
    }
}

/// 呈現層使用的最終輸出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPayload {
    pub request_id: String,
    pub submitted_at: DateTime<Utc>,
    pub mode: InputMode,
    pub state: PipelineState,
    pub states: Vec<PipelineState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<WoundLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
    pub hospitals: Vec<HospitalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_narrative: Option<String>,
    /// Failed 狀態下唯一顯示的訊息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub errors: Vec<StageError>,
}

impl DisplayPayload {
    pub fn from_context(context: RequestContext, failure: Option<String>) -> Self {
        let (label, label_text) = match context.classification {
            Some(c) => (Some(c.label), Some(c.raw)),
            None => (None, None),
        };

        Self {
            mode: context.submission.mode(),
            request_id: context.request_id,
            submitted_at: context.submitted_at,
            state: context.state,
            states: context.history,
            coordinates: context.coordinates,
            label,
            label_text,
            advice: context.advice,
            hospitals: context
                .hospitals
                .map(|h| h.records().to_vec())
                .unwrap_or_default(),
            hospital_narrative: context.hospital_narrative,
            failure,
            errors: context.errors,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == PipelineState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wound_label_accepts_prompt_vocabulary() {
        for label in WoundLabel::ALL {
            assert_eq!(label.prompt_name().parse::<WoundLabel>(), Ok(label));
            assert_eq!(label.as_str().parse::<WoundLabel>(), Ok(label));
        }
        assert_eq!(" Burns.\n".parse::<WoundLabel>(), Ok(WoundLabel::Burn));
        assert_eq!("'cut'".parse::<WoundLabel>(), Ok(WoundLabel::Cut));
        assert_eq!("**Bruises**".parse::<WoundLabel>(), Ok(WoundLabel::Bruise));
    }

    #[test]
    fn test_wound_label_rejects_free_text() {
        assert!("Laceration".parse::<WoundLabel>().is_err());
        assert!("This looks like a burn".parse::<WoundLabel>().is_err());
        assert!("".parse::<WoundLabel>().is_err());
    }

    #[test]
    fn test_classification_parse_keeps_raw_text() {
        let classification = Classification::parse("  Burns\n").unwrap();
        assert_eq!(classification.label, WoundLabel::Burn);
        assert_eq!(classification.raw, "Burns");

        assert!(matches!(
            Classification::parse("Possibly a sprain"),
            Err(AidError::ClassificationAmbiguous { response }) if response == "Possibly a sprain"
        ));
    }

    #[test]
    fn test_coordinates_describe() {
        let mut coords = Coordinates::new(19.07, 72.87);
        assert_eq!(coords.describe(), None);
        assert_eq!(coords.as_query(), "19.07,72.87");

        coords.city = Some("Mumbai".to_string());
        coords.region = Some(String::new());
        coords.country = Some("IN".to_string());
        assert_eq!(coords.describe().as_deref(), Some("Mumbai, IN"));

        coords.display_name = Some("Mumbai, Maharashtra, India".to_string());
        assert_eq!(coords.describe().as_deref(), Some("Mumbai, Maharashtra, India"));
    }

    #[test]
    fn test_context_ignores_transitions_after_terminal_state() {
        let mut context = RequestContext::new(Submission::Text("cut finger".to_string()));
        context.transition(PipelineState::LocationResolving);
        context.transition(PipelineState::Failed);
        context.transition(PipelineState::AdviceGenerating);

        assert_eq!(context.state(), PipelineState::Failed);
        assert_eq!(
            context.history(),
            &[
                PipelineState::Idle,
                PipelineState::AwaitingInput,
                PipelineState::LocationResolving,
                PipelineState::Failed
            ]
        );
    }

    #[test]
    fn test_hospital_search_records() {
        assert!(HospitalSearch::from_records(vec![]) == HospitalSearch::Empty);
        assert!(HospitalSearch::Unavailable("down".into()).records().is_empty());
    }
}
