// src/config.rs
use crate::errors::ArchitectError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_REGENERATION_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    /// Image-bearing calls (analysis and fusion).
    pub analysis_model: String,
    /// Text-only prompt regeneration.
    pub regeneration_model: String,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ArchitectError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ArchitectError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or_else(|| ArchitectError::Configuration("API Key is missing.".to_string()))?;

        Ok(Self {
            api_key,
            api_base: non_empty("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            analysis_model: non_empty("PROMPT_ARCHITECT_ANALYSIS_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            regeneration_model: non_empty("PROMPT_ARCHITECT_REGENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_REGENERATION_MODEL.to_string()),
            bind_address: non_empty("PROMPT_ARCHITECT_BIND")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        })
    }
}
