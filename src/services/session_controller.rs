// src/services/session_controller.rs
use crate::errors::ArchitectError;
use crate::models::*;
use crate::services::fusion::FusionResolver;
use crate::services::llm_service::RemoteAnalysis;
use crate::services::preview_store::{PreviewRef, PreviewStore};
use crate::session::{FusionRequest, ImageSlot, Session, SessionView};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializes user actions against the session.
///
/// The lock is taken for the synchronous part of an operation only and is
/// never held across a remote call. Overlapping operations therefore settle in
/// completion order: whichever remote call resolves last writes the result.
/// There is no cancellation; a call that resolves after a clear still applies.
pub struct SessionController {
    session: Mutex<Session>,
    remote: Arc<dyn RemoteAnalysis>,
    fusion: FusionResolver,
    previews: Arc<PreviewStore>,
}

impl SessionController {
    pub fn new(remote: Arc<dyn RemoteAnalysis>, previews: Arc<PreviewStore>) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            fusion: FusionResolver::new(remote.clone()),
            remote,
            previews,
        }
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub async fn snapshot(&self) -> SessionView {
        self.session.lock().await.view()
    }

    fn release_all(&self, previews: impl IntoIterator<Item = PreviewRef>) {
        for preview in previews {
            self.previews.release(&preview);
        }
    }

    pub async fn select_reference(&self, image: ImageInput) {
        {
            let mut session = self.session.lock().await;
            let preview = self.previews.create(&image);
            let superseded = session.begin_reference(ImageSlot {
                image: image.clone(),
                preview,
            });
            self.release_all(superseded);
        }

        info!(
            "Analyzing reference image {} ({} bytes)",
            image.filename.as_deref().unwrap_or("<unnamed>"),
            image.data.len()
        );
        let outcome = self
            .remote
            .analyze_image(&image)
            .await
            .map_err(|e| e.to_string());

        self.session.lock().await.finish_reference(outcome);
    }

    /// No-op without a base result.
    pub async fn select_target(&self, image: ImageInput) {
        let request = {
            let mut session = self.session.lock().await;
            if session.result.is_none() {
                return;
            }
            let preview = self.previews.create(&image);
            let slot = ImageSlot {
                image,
                preview: preview.clone(),
            };
            match session.begin_target(slot) {
                Some((request, superseded)) => {
                    self.release_all(superseded);
                    request
                }
                None => {
                    self.previews.release(&preview);
                    return;
                }
            }
        };

        self.run_fusion(request).await;
    }

    pub async fn set_target_mode(&self, mode: TargetMode) {
        let request = {
            let mut session = self.session.lock().await;
            session.target_mode = mode;
            session.begin_refusion()
        };
        if let Some(request) = request {
            self.run_fusion(request).await;
        }
    }

    pub async fn set_creativity_level(&self, level: CreativityLevel) {
        let request = {
            let mut session = self.session.lock().await;
            session.creativity_level = level;
            session.begin_refusion()
        };
        if let Some(request) = request {
            self.run_fusion(request).await;
        }
    }

    async fn run_fusion(&self, request: FusionRequest) {
        let outcome = self
            .fusion
            .fuse(&request.base, &request.target, request.mode, request.level)
            .await
            .map_err(|e| e.to_string());

        self.session.lock().await.finish_target(outcome);
    }

    pub async fn clear_reference(&self) {
        let mut session = self.session.lock().await;
        let previews = session.reset();
        self.release_all(previews);
    }

    /// Drops the target and, if a reference is still set, re-analyzes it to
    /// restore the unfused result.
    pub async fn clear_target(&self) {
        let reference = {
            let mut session = self.session.lock().await;
            self.release_all(session.take_target());
            session.reference.as_ref().map(|slot| slot.image.clone())
        };

        if let Some(image) = reference {
            self.select_reference(image).await;
        }
    }

    /// Local edit only. Silently ignored when there is no result.
    pub async fn edit_analysis_field(
        &self,
        field: AnalysisField,
        value: FieldValue,
    ) -> Result<(), ArchitectError> {
        let mut session = self.session.lock().await;
        match session.result.as_mut() {
            Some(result) => result.analysis.set_field(field, value),
            None => Ok(()),
        }
    }

    /// Local edit only. Silently ignored when there is no result.
    pub async fn edit_prompt_field(
        &self,
        field: PromptField,
        value: String,
    ) -> Result<(), ArchitectError> {
        let mut session = self.session.lock().await;
        match session.result.as_mut() {
            Some(result) => result.generated_prompts.set_field(field, value),
            None => Ok(()),
        }
    }

    /// Replaces only the prompts. Failures are logged and never reach `Session.error`.
    pub async fn regenerate_prompts(&self) {
        let analysis = {
            let mut session = self.session.lock().await;
            let Some(result) = session.result.as_ref() else {
                return;
            };
            let analysis = result.analysis.clone();
            session.regenerating = true;
            analysis
        };

        let outcome = self.remote.regenerate_prompts(&analysis).await;

        let mut session = self.session.lock().await;
        session.regenerating = false;
        match outcome {
            Ok(prompts) => match session.result.as_mut() {
                Some(result) => result.generated_prompts = prompts,
                None => warn!("Regenerated prompts arrived after the result was cleared"),
            },
            Err(e) => error!("Failed to regenerate: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OperationKind;
    use crate::services::fusion::FusionPolicy;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Analyze(ImageInput),
        Fuse(ImageInput, String),
        Regenerate(Analysis),
    }

    #[derive(Default)]
    struct MockRemote {
        calls: StdMutex<Vec<Call>>,
        results: StdMutex<VecDeque<Result<AnalysisResult, ArchitectError>>>,
        prompts: StdMutex<VecDeque<Result<GeneratedPrompts, ArchitectError>>>,
    }

    impl MockRemote {
        fn push_result(&self, result: Result<AnalysisResult, ArchitectError>) {
            self.results.lock().unwrap().push_back(result);
        }

        fn push_prompts(&self, prompts: Result<GeneratedPrompts, ArchitectError>) {
            self.prompts.lock().unwrap().push_back(prompts);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn next_result(&self, kind: OperationKind) -> Result<AnalysisResult, ArchitectError> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ArchitectError::Failed(kind)))
        }
    }

    #[async_trait]
    impl RemoteAnalysis for MockRemote {
        async fn analyze_image(&self, image: &ImageInput) -> Result<AnalysisResult, ArchitectError> {
            self.calls.lock().unwrap().push(Call::Analyze(image.clone()));
            self.next_result(OperationKind::Analyze)
        }

        async fn fuse_with_target(
            &self,
            image: &ImageInput,
            instruction: &str,
        ) -> Result<AnalysisResult, ArchitectError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Fuse(image.clone(), instruction.to_string()));
            self.next_result(OperationKind::Adapt)
        }

        async fn regenerate_prompts(
            &self,
            analysis: &Analysis,
        ) -> Result<GeneratedPrompts, ArchitectError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Regenerate(analysis.clone()));
            self.prompts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ArchitectError::Failed(OperationKind::Regenerate)))
        }
    }

    fn result_with_subject(subject: &str) -> AnalysisResult {
        AnalysisResult {
            analysis: Analysis {
                subject: subject.to_string(),
                environment: "rainy rooftop".to_string(),
                ..Default::default()
            },
            generated_prompts: GeneratedPrompts {
                nano_banana_pro_prompt: format!("{} on a rooftop", subject),
                ..Default::default()
            }
            .normalized()
            .unwrap(),
        }
    }

    fn img_a() -> ImageInput {
        ImageInput::new("image/jpeg", vec![0xA, 0xA]).with_filename("a.jpg")
    }

    fn img_b() -> ImageInput {
        ImageInput::new("image/png", vec![0xB, 0xB]).with_filename("b.png")
    }

    fn setup() -> (Arc<MockRemote>, SessionController) {
        let remote = Arc::new(MockRemote::default());
        let controller = SessionController::new(remote.clone(), Arc::new(PreviewStore::new()));
        (remote, controller)
    }

    /// Scenario A followed by B: reference analyzed, then fused with target.
    async fn fused_session() -> (Arc<MockRemote>, SessionController) {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("a woman in a red coat")));
        controller.select_reference(img_a()).await;
        controller.set_target_mode(TargetMode::SubjectOnly).await;
        controller.set_creativity_level(CreativityLevel::Fidelity).await;
        remote.push_result(Ok(result_with_subject("uploaded image of a man in a suit")));
        controller.select_target(img_b()).await;
        (remote, controller)
    }

    #[tokio::test]
    async fn scenario_a_reference_analysis_populates_result() {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("a woman in a red coat")));

        controller.select_reference(img_a()).await;

        let view = controller.snapshot().await;
        let result = view.result.unwrap();
        assert_eq!(result.analysis.subject, "a woman in a red coat");
        assert!(!view.reference_busy);
        assert!(!view.target_busy);
        assert!(view.error.is_none());
        assert!(view.reference_preview.is_some());
        assert_eq!(remote.calls(), vec![Call::Analyze(img_a())]);
    }

    #[tokio::test]
    async fn scenario_b_target_fusion_replaces_result() {
        let (remote, controller) = fused_session().await;

        let calls = remote.calls();
        assert_eq!(calls.len(), 2);
        let Call::Fuse(image, instruction) = &calls[1] else {
            panic!("expected a fusion call, got {:?}", calls[1]);
        };
        assert_eq!(image, &img_b());
        let policy = FusionPolicy::new(TargetMode::SubjectOnly, CreativityLevel::Fidelity);
        assert!(instruction.contains(policy.mode_clause()));
        assert!(instruction.contains(policy.creativity_clause()));
        assert!(instruction.contains("a woman in a red coat"));

        let view = controller.snapshot().await;
        assert_eq!(
            view.result.unwrap().analysis.subject,
            "uploaded image of a man in a suit"
        );
        assert!(view.fused);
        assert!(view.target_preview.is_some());
        assert!(!view.target_busy);
    }

    #[tokio::test]
    async fn scenario_c_level_change_refuses_existing_target() {
        let (remote, controller) = fused_session().await;
        remote.push_result(Ok(result_with_subject("uploaded image of a chrome man")));

        controller.set_creativity_level(CreativityLevel::Creative).await;

        let calls = remote.calls();
        assert_eq!(calls.len(), 3);
        let Call::Fuse(image, instruction) = &calls[2] else {
            panic!("expected a fusion call, got {:?}", calls[2]);
        };
        assert_eq!(image, &img_b());
        let policy = FusionPolicy::new(TargetMode::SubjectOnly, CreativityLevel::Creative);
        assert!(instruction.contains(policy.mode_clause()));
        assert!(instruction.contains(policy.creativity_clause()));

        let view = controller.snapshot().await;
        assert_eq!(view.target_mode, TargetMode::SubjectOnly);
        assert_eq!(view.creativity_level, CreativityLevel::Creative);
        assert_eq!(
            view.result.unwrap().analysis.subject,
            "uploaded image of a chrome man"
        );
    }

    #[tokio::test]
    async fn scenario_d_clear_target_restores_unfused_analysis() {
        let (remote, controller) = fused_session().await;
        let target_url = controller.snapshot().await.target_preview.unwrap();
        remote.push_result(Ok(result_with_subject("a woman in a red coat")));

        controller.clear_target().await;

        let calls = remote.calls();
        assert_eq!(calls.last(), Some(&Call::Analyze(img_a())));

        let view = controller.snapshot().await;
        assert!(view.target_preview.is_none());
        assert!(!view.fused);
        assert_eq!(view.result.unwrap().analysis.subject, "a woman in a red coat");

        let target_id: Uuid = target_url.rsplit('/').next().unwrap().parse().unwrap();
        assert!(controller.previews().get(&target_id).is_none());
        // one live preview for the re-selected reference
        assert_eq!(controller.previews().live_count(), 1);
    }

    #[tokio::test]
    async fn scenario_e_empty_response_sets_error_and_keeps_result_empty() {
        let (remote, controller) = setup();
        remote.push_result(Err(ArchitectError::Failed(OperationKind::Analyze)));

        controller.select_reference(img_a()).await;

        let view = controller.snapshot().await;
        assert!(view.result.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to analyze image. Please try again.")
        );
        assert!(!view.reference_busy);
    }

    #[tokio::test]
    async fn scenario_f_failed_regeneration_is_log_only() {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("a woman in a red coat")));
        controller.select_reference(img_a()).await;
        let before = controller.snapshot().await.result.unwrap().generated_prompts;

        remote.push_prompts(Err(ArchitectError::Failed(OperationKind::Regenerate)));
        controller.regenerate_prompts().await;

        let view = controller.snapshot().await;
        assert_eq!(view.result.unwrap().generated_prompts, before);
        assert!(view.error.is_none());
        assert!(!view.regenerating);
    }

    #[tokio::test]
    async fn regeneration_replaces_only_prompts() {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("a fox")));
        controller.select_reference(img_a()).await;
        controller
            .edit_analysis_field(AnalysisField::Lighting, FieldValue::Text("moonlight".to_string()))
            .await
            .unwrap();

        let fresh = GeneratedPrompts {
            nano_banana_pro_prompt: "a fox under moonlight".to_string(),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        remote.push_prompts(Ok(fresh.clone()));
        controller.regenerate_prompts().await;

        let calls = remote.calls();
        let Some(Call::Regenerate(sent)) = calls.last() else {
            panic!("expected a regeneration call");
        };
        assert_eq!(sent.lighting, "moonlight");

        let result = controller.snapshot().await.result.unwrap();
        assert_eq!(result.generated_prompts, fresh);
        assert_eq!(result.analysis.subject, "a fox");
        assert_eq!(result.analysis.lighting, "moonlight");
    }

    #[tokio::test]
    async fn select_target_without_result_is_a_no_op() {
        let (remote, controller) = setup();
        let before = controller.snapshot().await;

        controller.select_target(img_b()).await;

        assert_eq!(controller.snapshot().await, before);
        assert!(remote.calls().is_empty());
        assert_eq!(controller.previews().created_count(), 0);
    }

    #[tokio::test]
    async fn set_target_mode_without_target_only_updates_field() {
        let (remote, controller) = setup();

        controller.set_target_mode(TargetMode::FullStructure).await;
        let once = controller.snapshot().await;
        controller.set_target_mode(TargetMode::FullStructure).await;
        let twice = controller.snapshot().await;

        assert_eq!(once, twice);
        assert_eq!(twice.target_mode, TargetMode::FullStructure);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn reselecting_reference_releases_prior_preview_once() {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("first")));
        controller.select_reference(img_a()).await;
        let first_url = controller.snapshot().await.reference_preview.unwrap();

        remote.push_result(Ok(result_with_subject("second")));
        controller.select_reference(img_b()).await;

        let previews = controller.previews();
        assert_eq!(previews.live_count(), 1);
        assert_eq!(previews.created_count(), 2);
        assert_eq!(previews.released_count(), 1);
        let view = controller.snapshot().await;
        assert_ne!(view.reference_preview.unwrap(), first_url);
        assert_eq!(view.result.unwrap().analysis.subject, "second");
    }

    #[tokio::test]
    async fn new_reference_drops_target_and_its_preview() {
        let (remote, controller) = fused_session().await;
        remote.push_result(Ok(result_with_subject("fresh")));

        controller.select_reference(img_a()).await;

        let view = controller.snapshot().await;
        assert!(view.target_preview.is_none());
        assert!(!view.fused);
        assert_eq!(controller.previews().live_count(), 1);
        assert_eq!(controller.previews().released_count(), 2);
    }

    #[tokio::test]
    async fn failed_fusion_keeps_prior_result() {
        let (remote, controller) = setup();
        remote.push_result(Ok(result_with_subject("base")));
        controller.select_reference(img_a()).await;

        remote.push_result(Err(ArchitectError::Failed(OperationKind::Adapt)));
        controller.select_target(img_b()).await;

        let view = controller.snapshot().await;
        assert_eq!(view.result.unwrap().analysis.subject, "base");
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to adapt prompt with new image.")
        );
        assert!(!view.target_busy);
    }

    #[tokio::test]
    async fn clear_reference_resets_everything() {
        let (_remote, controller) = fused_session().await;
        controller.set_target_mode(TargetMode::FullStructure).await;

        controller.clear_reference().await;

        let view = controller.snapshot().await;
        assert!(view.result.is_none());
        assert!(view.reference_preview.is_none());
        assert!(view.target_preview.is_none());
        assert_eq!(view.target_mode, TargetMode::SubjectOnly);
        assert_eq!(view.creativity_level, CreativityLevel::Balanced);
        assert_eq!(controller.previews().live_count(), 0);
        assert_eq!(
            controller.previews().released_count(),
            controller.previews().created_count()
        );
    }

    #[tokio::test]
    async fn edits_are_local_and_ignored_without_result() {
        let (remote, controller) = setup();
        controller
            .edit_prompt_field(PromptField::NegativePrompt, "noise".to_string())
            .await
            .unwrap();
        assert!(controller.snapshot().await.result.is_none());

        remote.push_result(Ok(result_with_subject("a fox")));
        controller.select_reference(img_a()).await;
        let calls_before = remote.calls().len();

        controller
            .edit_prompt_field(PromptField::NegativePrompt, "noise".to_string())
            .await
            .unwrap();
        controller
            .edit_analysis_field(
                AnalysisField::StyleTags,
                FieldValue::Text("noir, grain".to_string()),
            )
            .await
            .unwrap();

        let result = controller.snapshot().await.result.unwrap();
        assert_eq!(result.generated_prompts.negative_prompt, "noise");
        assert_eq!(result.analysis.style_tags, vec!["noir", "grain"]);
        assert_eq!(remote.calls().len(), calls_before);
    }
}
