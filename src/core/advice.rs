use crate::domain::model::Coordinates;
use crate::domain::ports::TextGenerator;
use crate::utils::error::Result;
use std::sync::Arc;

pub const FIRST_AID_PROMPT: &str = "Act as a first aid specialist. Provide the user with first aid steps in 100 words (related to human body).";

/// 建議內容的來源：使用者描述或分類器標籤
#[derive(Debug, Clone, PartialEq)]
pub enum AdviceSubject {
    Description(String),
    InjuryType(String),
}

impl AdviceSubject {
    pub fn context(&self) -> String {
        match self {
            AdviceSubject::Description(text) => format!("Injury description: {}", text),
            AdviceSubject::InjuryType(label) => format!("Injury type: {}", label),
        }
    }
}

/// 兩種提示詞共用同一個 `TextGenerator::generate`
pub struct AdviceGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl AdviceGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn first_aid(&self, subject: &AdviceSubject) -> Result<String> {
        let context = subject.context();
        tracing::debug!("🩹 Requesting first-aid steps ({})", context);
        self.generator
            .generate(FIRST_AID_PROMPT, Some(&context))
            .await
    }

    pub async fn hospital_narrative(&self, coordinates: &Coordinates) -> Result<String> {
        let prompt = hospital_narrative_prompt(coordinates);
        tracing::debug!("🏥 Requesting hospital narrative for {}", coordinates);
        self.generator.generate(&prompt, None).await
    }
}

pub fn hospital_narrative_prompt(coordinates: &Coordinates) -> String {
    let place = coordinates
        .describe()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();

    format!(
        "You are a local guide. A user is at this location: {}{}.\n\
         List the 3 nearest well-known hospitals. Include name and approximate distance.\n\
         Keep the list short and clear.",
        coordinates, place
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingGenerator {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String> {
            self.calls
                .lock()
                .await
                .push((prompt.to_string(), context.map(str::to_string)));
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_first_aid_uses_subject_as_context() {
        let generator = Arc::new(RecordingGenerator::default());
        let advisor = AdviceGenerator::new(generator.clone());

        advisor
            .first_aid(&AdviceSubject::InjuryType("Burns".to_string()))
            .await
            .unwrap();
        advisor
            .first_aid(&AdviceSubject::Description("scraped knee".to_string()))
            .await
            .unwrap();

        let calls = generator.calls.lock().await;
        assert_eq!(calls[0].0, FIRST_AID_PROMPT);
        assert_eq!(calls[0].1.as_deref(), Some("Injury type: Burns"));
        assert_eq!(calls[1].1.as_deref(), Some("Injury description: scraped knee"));
    }

    #[tokio::test]
    async fn test_hospital_narrative_embeds_location() {
        let generator = Arc::new(RecordingGenerator::default());
        let advisor = AdviceGenerator::new(generator.clone());

        let mut coordinates = Coordinates::new(19.07, 72.87);
        coordinates.city = Some("Mumbai".to_string());
        advisor.hospital_narrative(&coordinates).await.unwrap();

        let calls = generator.calls.lock().await;
        assert!(calls[0]
            .0
            .contains("A user is at this location: Latitude 19.07, Longitude 72.87 (Mumbai)."));
        assert_eq!(calls[0].1, None);
    }
}
