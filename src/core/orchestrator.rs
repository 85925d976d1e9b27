use crate::adapters::{resolver_from_config, GeminiClient, PlacesHospitalFinder};
use crate::config::{AppConfig, FailurePolicy};
use crate::core::advice::{AdviceGenerator, AdviceSubject};
use crate::domain::model::{
    Classification, DisplayPayload, HospitalSearch, InputMode, PipelineState, RequestContext,
    Submission,
};
use crate::domain::ports::{HospitalFinder, LocationResolver, TextGenerator, WoundClassifier};
use crate::utils::error::{AidError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub failure_policy: FailurePolicy,
    pub hospital_narrative: bool,
    pub stage_timeout: Duration,
    pub radius_meters: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            failure_policy: config.pipeline.failure_policy,
            hospital_narrative: config.pipeline.hospital_narrative,
            stage_timeout: config.pipeline.stage_timeout(),
            radius_meters: config.places.radius_meters,
        }
    }
}

/// 依輸入模式串接 定位 -> (分類) -> 建議 -> 醫院查詢
pub struct Orchestrator {
    locator: Arc<dyn LocationResolver>,
    classifier: Arc<dyn WoundClassifier>,
    advisor: AdviceGenerator,
    hospitals: Arc<dyn HospitalFinder>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        locator: Arc<dyn LocationResolver>,
        classifier: Arc<dyn WoundClassifier>,
        generator: Arc<dyn TextGenerator>,
        hospitals: Arc<dyn HospitalFinder>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            locator,
            classifier,
            advisor: AdviceGenerator::new(generator),
            hospitals,
            settings,
        }
    }

    /// 以配置建立所有 HTTP adapter
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let gemini = Arc::new(GeminiClient::new(&config.gemini, &config.http)?);
        let locator: Arc<dyn LocationResolver> =
            Arc::from(resolver_from_config(&config.location, &config.http)?);
        let hospitals = Arc::new(PlacesHospitalFinder::new(&config.places, &config.http)?);

        Ok(Self::new(
            locator,
            gemini.clone(),
            gemini,
            hospitals,
            OrchestratorSettings::from(config),
        ))
    }

    /// 執行一次完整管線；永遠回傳可顯示的結果，不會向上拋錯
    pub async fn run(&self, submission: Submission, cancel: &CancellationToken) -> DisplayPayload {
        let mut context = RequestContext::new(submission);
        tracing::info!(
            "🚀 {}: pipeline started ({:?} mode, {:?} policy)",
            context.request_id,
            context.mode(),
            self.settings.failure_policy
        );

        // 定位：失敗時直接終止，不執行後續階段
        context.transition(PipelineState::LocationResolving);
        let coordinates = match self
            .stage(PipelineState::LocationResolving, cancel, self.locator.resolve())
            .await
        {
            Ok(coordinates) => coordinates,
            Err(e) => return Self::failed(context, e),
        };
        tracing::info!(
            "📍 {}: location resolved to {} {}",
            context.request_id,
            coordinates,
            coordinates.describe().unwrap_or_default()
        );
        context.coordinates = Some(coordinates.clone());

        // 分類（僅圖片模式）
        if context.mode() == InputMode::Image {
            context.transition(PipelineState::Classifying);
        }
        let classified = match &context.submission {
            Submission::Image(image) => Some(
                self.stage(PipelineState::Classifying, cancel, async {
                    let response = self.classifier.classify(image).await?;
                    Classification::parse(&response)
                })
                .await,
            ),
            Submission::Text(_) => None,
        };

        let subject = match classified {
            None => match &context.submission {
                Submission::Text(text) => Some(AdviceSubject::Description(text.clone())),
                Submission::Image(_) => None,
            },
            Some(Ok(classification)) => {
                tracing::info!(
                    "🔎 {}: wound classified as {} ({:?})",
                    context.request_id,
                    classification.label,
                    classification.raw
                );
                let subject = AdviceSubject::InjuryType(classification.raw.clone());
                context.classification = Some(classification);
                Some(subject)
            }
            Some(Err(e)) => {
                if self.must_abort(&e) {
                    return Self::failed(context, e);
                }
                Self::degrade(&mut context, PipelineState::Classifying, &e);
                None
            }
        };

        // 建議：分類失敗時沒有可用的主題，略過
        if let Some(subject) = subject {
            context.transition(PipelineState::AdviceGenerating);
            match self
                .stage(
                    PipelineState::AdviceGenerating,
                    cancel,
                    self.advisor.first_aid(&subject),
                )
                .await
            {
                Ok(advice) => context.advice = Some(advice),
                Err(e) => {
                    if self.must_abort(&e) {
                        return Self::failed(context, e);
                    }
                    Self::degrade(&mut context, PipelineState::AdviceGenerating, &e);
                }
            }
        }

        // 醫院查詢沿用已解析的座標
        context.transition(PipelineState::HospitalLookup);
        let search = match self
            .stage(PipelineState::HospitalLookup, cancel, async {
                Ok(self
                    .hospitals
                    .find_hospitals(&coordinates, self.settings.radius_meters)
                    .await)
            })
            .await
        {
            Ok(search) => search,
            Err(AidError::Cancelled) => return Self::failed(context, AidError::Cancelled),
            Err(e) => HospitalSearch::Unavailable(e.to_string()),
        };
        if let HospitalSearch::Unavailable(reason) = &search {
            match self.settings.failure_policy {
                FailurePolicy::Partial => context.record_error(
                    PipelineState::HospitalLookup,
                    format!("Hospital search unavailable: {}", reason),
                ),
                FailurePolicy::AllOrNothing => {
                    tracing::warn!(
                        "⚠️ {}: hospital search unavailable, showing none: {}",
                        context.request_id,
                        reason
                    )
                }
            }
        }
        context.hospitals = Some(search);

        if self.settings.hospital_narrative {
            context.transition(PipelineState::NarrativeGenerating);
            match self
                .stage(
                    PipelineState::NarrativeGenerating,
                    cancel,
                    self.advisor.hospital_narrative(&coordinates),
                )
                .await
            {
                Ok(narrative) => context.hospital_narrative = Some(narrative),
                Err(e) => {
                    if self.must_abort(&e) {
                        return Self::failed(context, e);
                    }
                    Self::degrade(&mut context, PipelineState::NarrativeGenerating, &e);
                }
            }
        }

        context.transition(PipelineState::Rendered);
        tracing::info!(
            "✅ {}: pipeline rendered ({} stage errors)",
            context.request_id,
            context.errors.len()
        );
        DisplayPayload::from_context(context, None)
    }

    /// 每個階段都受逾時與取消控制
    async fn stage<T, F>(
        &self,
        stage: PipelineState,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.settings.stage_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AidError::Cancelled),
            outcome = tokio::time::timeout(timeout, work) => match outcome {
                Ok(result) => result,
                Err(_) => Err(AidError::StageTimeout {
                    stage: stage.to_string(),
                    seconds: timeout.as_secs(),
                }),
            },
        }
    }

    fn must_abort(&self, error: &AidError) -> bool {
        matches!(error, AidError::Cancelled)
            || self.settings.failure_policy == FailurePolicy::AllOrNothing
    }

    fn degrade(context: &mut RequestContext, stage: PipelineState, error: &AidError) {
        tracing::warn!("⚠️ {}: {} failed: {}", context.request_id, stage, error);
        context.record_error(stage, error.user_friendly_message());
    }

    fn failed(mut context: RequestContext, error: AidError) -> DisplayPayload {
        let stage = context.state();
        tracing::error!(
            "❌ {}: pipeline failed during {}: {} (Category: {:?}, Severity: {:?})",
            context.request_id,
            stage,
            error,
            error.category(),
            error.severity()
        );

        context.discard_partial_results();
        context.transition(PipelineState::Failed);
        DisplayPayload::from_context(context, Some(error.user_friendly_message()))
    }
}
