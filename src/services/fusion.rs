// src/services/fusion.rs
use crate::errors::ArchitectError;
use crate::models::*;
use crate::services::llm_service::RemoteAnalysis;
use log::info;
use std::sync::Arc;

/// Literal opening every fused prompt must have; the image model keys
/// image-conditioned generation off it.
pub const PREFIX_RULE: &str = r#"The final generated prompt MUST start with the exact phrase: "uploaded image of [Subject Description], ...". This is required to trigger image-to-image generation."#;

/// How a style source analysis and a target image are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FusionPolicy {
    pub mode: TargetMode,
    pub level: CreativityLevel,
}

impl FusionPolicy {
    pub fn new(mode: TargetMode, level: CreativityLevel) -> Self {
        Self { mode, level }
    }

    pub fn mode_label(&self) -> &'static str {
        match self.mode {
            TargetMode::SubjectOnly => "SUBJECT ONLY (Ignore Target Background)",
            TargetMode::FullStructure => "FULL STRUCTURE (Keep Target Composition)",
        }
    }

    pub fn mode_clause(&self) -> &'static str {
        match self.mode {
            TargetMode::SubjectOnly => {
                "- **MODE: SUBJECT ONLY**: You MUST discard the background/environment of the Target Image. REPLACE it entirely with the 'environment', 'lighting', and 'vfx_class' from the Source Analysis."
            }
            TargetMode::FullStructure => {
                "- **MODE: FULL STRUCTURE**: You MUST Keep the composition, background, and environment of the Target Image. APPLY the 'vfx_class', 'color_grading', and 'style_tags' from the Source Analysis as an overlay or style transfer."
            }
        }
    }

    pub fn creativity_clause(&self) -> &'static str {
        match self.level {
            CreativityLevel::Fidelity => {
                "**PRIORITY: FIDELITY.** The generated prompt MUST describe the Subject of the uploaded image EXACTLY as they appear. Do not alter their clothing, pose, or features to fit the style. The VFX/Style should wrap AROUND the subject, but not change the subject itself."
            }
            CreativityLevel::Balanced => {
                "**PRIORITY: BALANCED.** The prompt should describe the Subject accurately, but you may slightly adapt the lighting, clothing texture, or pose to better integrate with the VFX Style of the source."
            }
            CreativityLevel::Creative => {
                "**PRIORITY: AESTHETIC & CREATIVITY.** The uploaded image is just a reference for the person's identity. You have FULL PERMISSION to significantly alter the subject's clothing, materiality, and form to perfectly match the Artistic Style and VFX of the source. If the source style is 'Cyberpunk', make the subject Cyberpunk. If it's 'Liquid Metal', make the subject Liquid Metal."
            }
        }
    }

    /// Builds the full fusion instruction. Deterministic in (policy, base).
    pub fn instruction(&self, base: &Analysis) -> Result<String, ArchitectError> {
        let source = serde_json::to_string(base)?;

        Ok(format!(
            r#"I have a "Source Analysis" from a previous image. I want you to Analyze the image attached to this message (the "Target Image").

YOUR TASK:
Create a NEW Prompt Analysis that FUSES the two inputs based on the selected mode: **{mode_label}**.

FUSION LOGIC:
1. **Prefix Rule (CRITICAL)**: {prefix}

2. **Subject & Action**:
   - Extract from the **Target Image** (Face, Body, Pose, Clothes).

3. **Environment & VFX (Depends on Mode)**:
   {mode_clause}

4. **Creativity Level (CRITICAL)**:
   {creativity_clause}

**ZERO LOSS POLICY**: Ensure ALL details from the relevant sections are preserved.

SOURCE ANALYSIS (VFX/Style Source):
{source}

Generate the Output strictly matching the defined JSON schema."#,
            mode_label = self.mode_label(),
            prefix = PREFIX_RULE,
            mode_clause = self.mode_clause(),
            creativity_clause = self.creativity_clause(),
            source = source,
        ))
    }
}

pub struct FusionResolver {
    remote: Arc<dyn RemoteAnalysis>,
}

impl FusionResolver {
    pub fn new(remote: Arc<dyn RemoteAnalysis>) -> Self {
        Self { remote }
    }

    pub async fn fuse(
        &self,
        base: &Analysis,
        target: &ImageInput,
        mode: TargetMode,
        level: CreativityLevel,
    ) -> Result<AnalysisResult, ArchitectError> {
        let policy = FusionPolicy::new(mode, level);
        let instruction = policy.instruction(base)?;
        info!("Fusing target image with mode {:?}, creativity {:?}", mode, level);
        self.remote.fuse_with_target(target, &instruction).await
    }
}
