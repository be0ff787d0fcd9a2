// src/session.rs
//! The single mutable session aggregate and its synchronous transitions.
//!
//! Transitions that supersede an image slot hand back the previews they
//! dropped; the caller releases them. Nothing here talks to the network.

use crate::models::*;
use crate::services::preview_store::PreviewRef;
use serde::Serialize;

/// An image together with its preview. Keeping them in one struct makes the
/// preview lifetime follow the image exactly.
#[derive(Debug, Clone)]
pub struct ImageSlot {
    pub image: ImageInput,
    pub preview: PreviewRef,
}

#[derive(Debug, Default)]
pub struct Session {
    pub reference: Option<ImageSlot>,
    pub target: Option<ImageSlot>,
    pub target_mode: TargetMode,
    pub creativity_level: CreativityLevel,
    pub reference_busy: bool,
    pub target_busy: bool,
    pub regenerating: bool,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

/// Inputs captured for a fusion call, taken under the lock and used after it is released.
#[derive(Debug, Clone)]
pub struct FusionRequest {
    pub base: Analysis,
    pub target: ImageInput,
    pub mode: TargetMode,
    pub level: CreativityLevel,
}

impl Session {
    /// New reference image: drops target and result, marks the reference slot busy.
    pub fn begin_reference(&mut self, slot: ImageSlot) -> Vec<PreviewRef> {
        let mut superseded = Vec::new();
        if let Some(old) = self.reference.replace(slot) {
            superseded.push(old.preview);
        }
        if let Some(old) = self.target.take() {
            superseded.push(old.preview);
        }
        self.result = None;
        self.error = None;
        self.reference_busy = true;
        superseded
    }

    pub fn finish_reference(&mut self, outcome: Result<AnalysisResult, String>) {
        self.reference_busy = false;
        self.apply(outcome);
    }

    /// Returns the fusion inputs, or None when there is no base result to fuse with.
    pub fn begin_target(&mut self, slot: ImageSlot) -> Option<(FusionRequest, Option<PreviewRef>)> {
        let base = self.result.as_ref()?.analysis.clone();
        let request = FusionRequest {
            base,
            target: slot.image.clone(),
            mode: self.target_mode,
            level: self.creativity_level,
        };
        let superseded = self.target.replace(slot).map(|old| old.preview);
        self.target_busy = true;
        self.error = None;
        Some((request, superseded))
    }

    /// Re-fusion after a mode or level change; only when a target is already set.
    pub fn begin_refusion(&mut self) -> Option<FusionRequest> {
        let target = self.target.as_ref()?.image.clone();
        let base = self.result.as_ref()?.analysis.clone();
        self.target_busy = true;
        self.error = None;
        Some(FusionRequest {
            base,
            target,
            mode: self.target_mode,
            level: self.creativity_level,
        })
    }

    /// On failure the previous result stays in place.
    pub fn finish_target(&mut self, outcome: Result<AnalysisResult, String>) {
        self.target_busy = false;
        self.apply(outcome);
    }

    fn apply(&mut self, outcome: Result<AnalysisResult, String>) {
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Back to the empty initial state; returns every preview that was held.
    pub fn reset(&mut self) -> Vec<PreviewRef> {
        let previews = self
            .reference
            .take()
            .into_iter()
            .chain(self.target.take())
            .map(|slot| slot.preview)
            .collect();
        *self = Session::default();
        previews
    }

    pub fn take_target(&mut self) -> Option<PreviewRef> {
        self.target.take().map(|slot| slot.preview)
    }

    pub fn is_fused(&self) -> bool {
        self.target.is_some()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            reference_preview: self.reference.as_ref().map(|s| s.preview.url()),
            target_preview: self.target.as_ref().map(|s| s.preview.url()),
            target_mode: self.target_mode,
            creativity_level: self.creativity_level,
            creativity_help: self.creativity_level.help_text(),
            reference_busy: self.reference_busy,
            target_busy: self.target_busy,
            regenerating: self.regenerating,
            fused: self.is_fused(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Read model exposed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub reference_preview: Option<String>,
    pub target_preview: Option<String>,
    pub target_mode: TargetMode,
    pub creativity_level: CreativityLevel,
    pub creativity_help: &'static str,
    pub reference_busy: bool,
    pub target_busy: bool,
    pub regenerating: bool,
    pub fused: bool,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn slot(byte: u8) -> ImageSlot {
        ImageSlot {
            image: ImageInput::new("image/png", vec![byte]),
            preview: PreviewRef { id: Uuid::new_v4() },
        }
    }

    #[test]
    fn target_needs_a_base_result() {
        let mut session = Session::default();
        assert!(session.begin_target(slot(1)).is_none());
        assert!(session.target.is_none());
        assert!(!session.target_busy);
    }

    #[test]
    fn begin_reference_hands_back_both_previews() {
        let mut session = Session::default();
        let first = slot(1);
        let target = slot(2);
        session.reference = Some(first.clone());
        session.target = Some(target.clone());
        session.result = Some(AnalysisResult::default());

        let superseded = session.begin_reference(slot(3));
        assert_eq!(superseded, vec![first.preview, target.preview]);
        assert!(session.result.is_none());
        assert!(session.reference_busy);
        assert!(!session.is_fused());
    }

    #[test]
    fn failed_target_keeps_previous_result() {
        let mut session = Session::default();
        let mut result = AnalysisResult::default();
        result.analysis.subject = "base".to_string();
        session.result = Some(result.clone());

        let (request, superseded) = session.begin_target(slot(4)).unwrap();
        assert_eq!(request.base.subject, "base");
        assert!(superseded.is_none());
        assert!(session.target_busy);
        assert!(!session.reference_busy);

        session.finish_target(Err("nope".to_string()));
        assert_eq!(session.result, Some(result));
        assert_eq!(session.error.as_deref(), Some("nope"));
        assert!(!session.target_busy);
    }

    #[test]
    fn reset_returns_every_held_preview() {
        let mut session = Session::default();
        session.reference = Some(slot(1));
        session.target = Some(slot(2));
        session.target_mode = TargetMode::FullStructure;

        assert_eq!(session.reset().len(), 2);
        assert_eq!(session.target_mode, TargetMode::SubjectOnly);
        assert_eq!(session.creativity_level, CreativityLevel::Balanced);
        assert!(session.reset().is_empty());
    }
}
