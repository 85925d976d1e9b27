use crate::config::{AppConfig, FailurePolicy};
use crate::domain::model::{ImageInput, InputMode, Submission};
use crate::utils::error::{AidError, Result};
use crate::utils::validation::validate_file_extension;
use clap::{Parser, ValueEnum};
use std::path::Path;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Text,
    Image,
}

impl From<ModeArg> for InputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Text => InputMode::Text,
            ModeArg::Image => InputMode::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Partial,
    AllOrNothing,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Partial => FailurePolicy::Partial,
            PolicyArg::AllOrNothing => FailurePolicy::AllOrNothing,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "wound-aid")]
#[command(about = "First-aid guidance and nearby hospitals for a described or photographed injury")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "wound-aid.toml")]
    pub config: String,

    /// Input mode
    #[arg(long, value_enum)]
    pub mode: ModeArg,

    /// Injury description (text mode)
    #[arg(long)]
    pub text: Option<String>,

    /// Wound photo, jpg/jpeg/png (image mode)
    #[arg(long)]
    pub image: Option<String>,

    /// Override pipeline.failure_policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Override pipeline.hospital_narrative
    #[arg(long)]
    pub narrative: Option<bool>,

    /// Print the result payload as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,
}

impl CliArgs {
    /// 載入配置並套用命令列覆蓋設定
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = if Path::new(&self.config).exists() {
            tracing::info!("📁 Loading configuration from: {}", self.config);
            AppConfig::from_file(&self.config)?
        } else {
            tracing::info!("📁 {} not found, using defaults", self.config);
            AppConfig::from_toml_str("")?
        };

        if let Some(policy) = self.policy {
            config.pipeline.failure_policy = policy.into();
            tracing::info!("🔧 Failure policy overridden to: {:?}", policy);
        }
        if let Some(narrative) = self.narrative {
            config.pipeline.hospital_narrative = narrative;
            tracing::info!("🔧 Hospital narrative overridden to: {}", narrative);
        }

        Ok(config)
    }

    /// 依輸入模式收集使用者輸入
    pub async fn submission(&self) -> Result<Submission> {
        match InputMode::from(self.mode) {
            InputMode::Text => {
                let text = self
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| AidError::InvalidInput {
                        message: "text mode requires a non-empty --text description".to_string(),
                    })?;
                Ok(Submission::Text(text.to_string()))
            }
            InputMode::Image => {
                let path = self.image.as_deref().ok_or_else(|| AidError::InvalidInput {
                    message: "image mode requires --image <path>".to_string(),
                })?;
                load_image(path).await.map(Submission::Image)
            }
        }
    }
}

pub async fn load_image(path: &str) -> Result<ImageInput> {
    let extension = validate_file_extension("image", path, &ALLOWED_IMAGE_EXTENSIONS)?;
    let bytes = tokio::fs::read(path).await?;

    if bytes.is_empty() {
        return Err(AidError::InvalidInput {
            message: format!("image file {} is empty", path),
        });
    }

    tracing::debug!("🖼️ Loaded {} ({} bytes)", path, bytes.len());
    Ok(ImageInput::new(
        bytes,
        ImageInput::mime_for_extension(&extension),
    ))
}
