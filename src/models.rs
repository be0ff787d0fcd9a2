// src/models.rs
use crate::errors::ArchitectError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An uploaded image as supplied by the picker: raw bytes plus the declared media type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub filename: Option<String>,
    pub media_type: String,
    pub data: Bytes,
}

impl ImageInput {
    pub fn new(media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: None,
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Technical decomposition of a single image, as produced by the remote model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub subject: String,
    pub facial_features: String,
    pub action: String,
    pub vfx_class: String,
    pub vfx_technique: String,
    pub vfx_interaction_verb: String,
    pub vfx_details: String,
    pub environment: String,
    pub lighting: String,
    pub color_grading: String,
    pub materiality: String,
    pub camera_lens: String,
    pub camera_type: String,
    pub camera_angle: String,
    pub style_tags: Vec<String>,
    pub detected_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisField {
    Subject,
    FacialFeatures,
    Action,
    VfxClass,
    VfxTechnique,
    VfxInteractionVerb,
    VfxDetails,
    Environment,
    Lighting,
    ColorGrading,
    Materiality,
    CameraLens,
    CameraType,
    CameraAngle,
    StyleTags,
    DetectedText,
}

/// Value of an edit coming from the UI. Tags may arrive either as a list or as
/// the comma-separated text shown in the tag input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    List(Vec<String>),
    Text(String),
}

impl Analysis {
    pub fn set_field(&mut self, field: AnalysisField, value: FieldValue) -> Result<(), ArchitectError> {
        let slot = match field {
            AnalysisField::StyleTags => {
                self.style_tags = match value {
                    FieldValue::List(tags) => tags,
                    FieldValue::Text(text) => split_tags(&text),
                };
                return Ok(());
            }
            AnalysisField::Subject => &mut self.subject,
            AnalysisField::FacialFeatures => &mut self.facial_features,
            AnalysisField::Action => &mut self.action,
            AnalysisField::VfxClass => &mut self.vfx_class,
            AnalysisField::VfxTechnique => &mut self.vfx_technique,
            AnalysisField::VfxInteractionVerb => &mut self.vfx_interaction_verb,
            AnalysisField::VfxDetails => &mut self.vfx_details,
            AnalysisField::Environment => &mut self.environment,
            AnalysisField::Lighting => &mut self.lighting,
            AnalysisField::ColorGrading => &mut self.color_grading,
            AnalysisField::Materiality => &mut self.materiality,
            AnalysisField::CameraLens => &mut self.camera_lens,
            AnalysisField::CameraType => &mut self.camera_type,
            AnalysisField::CameraAngle => &mut self.camera_angle,
            AnalysisField::DetectedText => &mut self.detected_text,
        };

        match value {
            FieldValue::Text(text) => {
                *slot = text;
                Ok(())
            }
            FieldValue::List(_) => Err(ArchitectError::Validation(format!(
                "{:?} expects text, not a list",
                field
            ))),
        }
    }
}

fn split_tags(text: &str) -> Vec<String> {
    text.split(',').map(|s| s.trim().to_string()).collect()
}

/// Structured payload handed to the image model alongside the natural prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptStruct {
    pub prompt_text: String,
    pub negative_prompt: String,
    pub recommended_model: String,
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfx_metadata: Option<String>,
    /// Keys the model adds beyond the schema (e.g. `vfx_type`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPrompts {
    pub nano_banana_pro_prompt: String,
    pub nano_banana_pro_struct: PromptStruct,
    /// Pretty-printed view of `nano_banana_pro_struct`. Derived only, never read from input.
    #[serde(default, skip_deserializing)]
    pub nano_banana_pro_json: String,
    pub negative_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptField {
    NanoBananaProPrompt,
    NanoBananaProJson,
    NegativePrompt,
}

impl GeneratedPrompts {
    /// Recomputes the text view from the struct.
    pub fn normalized(mut self) -> Result<Self, ArchitectError> {
        self.refresh_json()?;
        Ok(self)
    }

    fn refresh_json(&mut self) -> Result<(), ArchitectError> {
        self.nano_banana_pro_json = serde_json::to_string_pretty(&self.nano_banana_pro_struct)?;
        Ok(())
    }

    /// Editing the JSON view re-parses it and swaps the struct in one step, or rejects the edit.
    pub fn set_field(&mut self, field: PromptField, value: String) -> Result<(), ArchitectError> {
        match field {
            PromptField::NanoBananaProPrompt => self.nano_banana_pro_prompt = value,
            PromptField::NegativePrompt => self.negative_prompt = value,
            PromptField::NanoBananaProJson => {
                let parsed: PromptStruct = serde_json::from_str(&value).map_err(|e| {
                    ArchitectError::Validation(format!("JSON payload is not a valid prompt struct: {}", e))
                })?;
                self.nano_banana_pro_struct = parsed;
                self.refresh_json()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: Analysis,
    pub generated_prompts: GeneratedPrompts,
}

impl AnalysisResult {
    pub fn normalized(self) -> Result<Self, ArchitectError> {
        Ok(Self {
            analysis: self.analysis,
            generated_prompts: self.generated_prompts.normalized()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[default]
    SubjectOnly,
    FullStructure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativityLevel {
    Fidelity,
    #[default]
    Balanced,
    Creative,
}

impl CreativityLevel {
    pub fn help_text(&self) -> &'static str {
        match self {
            CreativityLevel::Fidelity => {
                "Prioritizes the exact look of the uploaded subject. VFX may be subtle."
            }
            CreativityLevel::Balanced => {
                "Standard mode. Balances the subject's identity with the reference style."
            }
            CreativityLevel::Creative => {
                "Prioritizes the reference style aesthetics. The subject may change form significantly to fit the vibe."
            }
        }
    }
}
