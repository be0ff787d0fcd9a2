// src/services/llm_service.rs
use crate::config::Config;
use crate::errors::{ArchitectError, OperationKind};
use crate::models::*;
use crate::services::image_processor::{EncodedImage, ImageProcessor};
use crate::services::prompts;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// The remote analysis boundary. Every failure is logged here and collapsed into
/// one coarse `ArchitectError::Failed` per operation kind; a missing credential
/// is returned as a configuration error before any request is made.
#[async_trait]
pub trait RemoteAnalysis: Send + Sync {
    async fn analyze_image(&self, image: &ImageInput) -> Result<AnalysisResult, ArchitectError>;

    /// Analyzes the target image under a fusion instruction built by the caller.
    async fn fuse_with_target(
        &self,
        image: &ImageInput,
        instruction: &str,
    ) -> Result<AnalysisResult, ArchitectError>;

    async fn regenerate_prompts(
        &self,
        analysis: &Analysis,
    ) -> Result<GeneratedPrompts, ArchitectError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn image(image: EncodedImage) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.mime_type,
                data: image.data,
            }),
            ..Default::default()
        }
    }
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn system(text: String) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

pub struct LLMService {
    api_key: String,
    api_base: String,
    analysis_model: String,
    regeneration_model: String,
    client: Client,
    image_processor: ImageProcessor,
}

impl LLMService {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            analysis_model: config.analysis_model.clone(),
            regeneration_model: config.regeneration_model.clone(),
            client: Client::new(),
            image_processor: ImageProcessor::new(),
        }
    }

    fn ensure_credentials(&self) -> Result<(), ArchitectError> {
        if self.api_key.trim().is_empty() {
            return Err(ArchitectError::Configuration("API Key is missing.".to_string()));
        }
        Ok(())
    }

    /// Sends one `generateContent` call and returns the raw JSON text of the first candidate.
    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<Part>,
        system_instruction: String,
        response_schema: Value,
    ) -> Result<String, ArchitectError> {
        let start = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: Content::system(system_instruction),
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.api_base, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ArchitectError::Remote(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ArchitectError::Remote(format!(
                "Gemini error ({}): {}",
                status, error_text
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ArchitectError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(
            "Gemini {} answered in {} ms ({} bytes)",
            model,
            start.elapsed().as_millis(),
            text.len()
        );

        Ok(text)
    }

    async fn image_call(
        &self,
        image: &ImageInput,
        instruction: &str,
    ) -> Result<AnalysisResult, ArchitectError> {
        let encoded = self.image_processor.encode(image)?;
        let text = self
            .generate_content(
                &self.analysis_model,
                vec![Part::image(encoded), Part::text(instruction)],
                prompts::system_prompt(),
                prompts::analysis_result_schema(),
            )
            .await?;

        parse_payload::<AnalysisResult>(&text)?.normalized()
    }
}

/// An empty body is a "no response" failure; anything unparsable is a parse failure.
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, ArchitectError> {
    if text.trim().is_empty() {
        return Err(ArchitectError::NoResponse);
    }
    serde_json::from_str(text)
        .map_err(|e| ArchitectError::Parse(format!("Failed to parse analysis JSON: {}", e)))
}

fn fold_failure(kind: OperationKind, label: &str, e: ArchitectError) -> ArchitectError {
    if matches!(e, ArchitectError::Configuration(_)) {
        return e;
    }
    error!("Gemini {} error: {}", label, e);
    ArchitectError::Failed(kind)
}

#[async_trait]
impl RemoteAnalysis for LLMService {
    async fn analyze_image(&self, image: &ImageInput) -> Result<AnalysisResult, ArchitectError> {
        self.ensure_credentials()?;
        self.image_call(image, prompts::ANALYZE_INSTRUCTION)
            .await
            .map_err(|e| fold_failure(OperationKind::Analyze, "analysis", e))
    }

    async fn fuse_with_target(
        &self,
        image: &ImageInput,
        instruction: &str,
    ) -> Result<AnalysisResult, ArchitectError> {
        self.ensure_credentials()?;
        self.image_call(image, instruction)
            .await
            .map_err(|e| fold_failure(OperationKind::Adapt, "adaptation", e))
    }

    async fn regenerate_prompts(
        &self,
        analysis: &Analysis,
    ) -> Result<GeneratedPrompts, ArchitectError> {
        self.ensure_credentials()?;

        let outcome = async {
            let analysis_json = serde_json::to_string(analysis)?;
            let text = self
                .generate_content(
                    &self.regeneration_model,
                    vec![Part::text(prompts::regeneration_instruction(&analysis_json))],
                    prompts::REGENERATION_SYSTEM_PROMPT.to_string(),
                    prompts::generated_prompts_schema(),
                )
                .await?;
            parse_payload::<GeneratedPrompts>(&text)?.normalized()
        }
        .await;

        outcome.map_err(|e| fold_failure(OperationKind::Regenerate, "regeneration", e))
    }
}
