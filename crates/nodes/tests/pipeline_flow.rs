//! End-to-end behaviour of the orchestrator, controller, and retry sweep
//! against in-test capability fakes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nodes::{
    ControllerConfig, GenerateOptions, GenerationOrchestrator, GenerationStatus, NodeError,
    OrchestratorConfig, PipelineController, PlatformRegistry, PublishStatus, RetrySweep,
    RunOptions,
};
use pipeline::{
    Clock, ContentDna, ContentGenerator, ContentType, CrosspostError, Deliverer, DeliveryError,
    DnaExtractor, FailureState, FitAdvisor, FitTier, GenerationError, GenerationRequest,
    ManualClock, PlatformArtifact, PlatformId, PublishReceipt, SelectionRequest, Timestamp,
    ValidationState,
};
use pretty_assertions::assert_eq;
use store::{FailureRecoveryManager, FingerprintStore, RecoveryConfig, StoreConfig};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

type Script = dyn Fn(&PlatformId) -> Result<String, GenerationError> + Send + Sync;

struct ScriptedGenerator {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    script: Box<Script>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    fn new(script: impl Fn(&PlatformId) -> Result<String, GenerationError> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            script: Box::new(script),
            delay: None,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        platform: &PlatformId,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        assert_eq!(&request.platform, platform);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.script)(platform)
    }
}

/// Answers that pass every rule of the platforms used in these tests.
fn valid_response(platform: &PlatformId) -> Result<String, GenerationError> {
    let title = match platform.as_str() {
        "hackernews" => "Show HN: A fingerprint cache for generated posts",
        _ => "Building a fingerprint cache for generated posts",
    };
    let body = format!(
        "## Why\n\nGenerating the same post twice wastes calls.\n\n```rust\nfn main() {{}}\n```\n{}",
        "More detail. ".repeat(30)
    );
    Ok(serde_json::json!({
        "title": title,
        "body": body,
        "tags": ["rust", "caching"],
        "description": "A small cache",
    })
    .to_string())
}

struct ScriptedExtractor {
    calls: AtomicUsize,
    result: Result<ContentDna, GenerationError>,
}

impl ScriptedExtractor {
    fn returning(result: Result<ContentDna, GenerationError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result,
        }
    }
}

#[async_trait]
impl DnaExtractor for ScriptedExtractor {
    async fn extract(&self, _source: &str) -> Result<ContentDna, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn dna(content_type: &str) -> ContentDna {
    ContentDna {
        content_type: ContentType::new(content_type).unwrap(),
        value_proposition: "Cache generated posts by content fingerprint".to_string(),
        problem_solved: "Repeated generation calls".to_string(),
        target_audience: "developers".to_string(),
        ..ContentDna::minimal_from_source("source")
    }
}

struct ToggleDeliverer {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ToggleDeliverer {
    fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Deliverer for ToggleDeliverer {
    async fn publish(&self, artifact: &PlatformArtifact) -> Result<PublishReceipt, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(DeliveryError::new(artifact.platform.clone(), "503 Service Unavailable"))
        } else {
            Ok(PublishReceipt {
                url: Some(format!("https://example.com/{}", artifact.platform)),
            })
        }
    }
}

struct FixedAdvisor(String);

#[async_trait]
impl FitAdvisor for FixedAdvisor {
    async fn advise(&self, _request: &SelectionRequest) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    dir: tempfile::TempDir,
    clock: Arc<ManualClock>,
    generator: Arc<ScriptedGenerator>,
    extractor: Arc<ScriptedExtractor>,
    deliverer: Arc<ToggleDeliverer>,
    registry: Arc<PlatformRegistry>,
    recovery: Arc<FailureRecoveryManager>,
    orchestrator: Arc<GenerationOrchestrator>,
}

impl Harness {
    fn new(generator: ScriptedGenerator, extractor: ScriptedExtractor) -> Self {
        Self::with_timeout(generator, extractor, Duration::from_secs(5))
    }

    fn with_timeout(
        generator: ScriptedGenerator,
        extractor: ScriptedExtractor,
        generation_timeout: Duration,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Timestamp::now()));
        let generator = Arc::new(generator);
        let extractor = Arc::new(extractor);
        let deliverer = Arc::new(ToggleDeliverer::failing());

        let mut registry = PlatformRegistry::builtin();
        for id in ["devto", "hackernews"] {
            registry
                .set_deliverer(&PlatformId::new(id).unwrap(), deliverer.clone())
                .unwrap();
        }
        let registry = Arc::new(registry);

        let store = Arc::new(
            FingerprintStore::open(StoreConfig::new(dir.path().join("cache")), clock.clone())
                .unwrap(),
        );
        let recovery = Arc::new(
            FailureRecoveryManager::open(
                RecoveryConfig::new(dir.path().join("failed_posts")),
                clock.clone(),
            )
            .unwrap(),
        );
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            registry.clone(),
            store,
            generator.clone(),
            extractor.clone(),
            OrchestratorConfig { generation_timeout },
        ));

        Self {
            dir,
            clock,
            generator,
            extractor,
            deliverer,
            registry,
            recovery,
            orchestrator,
        }
    }

    fn controller(&self) -> PipelineController {
        self.controller_with(ControllerConfig::default())
    }

    fn controller_with(&self, config: ControllerConfig) -> PipelineController {
        PipelineController::new(
            self.orchestrator.clone(),
            self.recovery.clone(),
            self.clock.clone(),
            config,
        )
    }

    fn sweep(&self) -> RetrySweep {
        RetrySweep::new(
            self.registry.clone(),
            self.recovery.clone(),
            Duration::from_secs(5),
        )
    }
}

fn default_harness() -> Harness {
    Harness::new(
        ScriptedGenerator::new(valid_response),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    )
}

fn platform(id: &str) -> PlatformId {
    PlatformId::new(id).unwrap()
}

fn only(ids: &[&str]) -> RunOptions {
    RunOptions {
        platforms: ids.iter().map(|id| platform(id)).collect(),
        ..RunOptions::default()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_generation_within_ttl_is_a_cache_hit() {
    let h = default_harness();
    let dna = dna("tool_launch");

    let first = h
        .orchestrator
        .generate_for_platform(&dna, &platform("devto"), GenerateOptions::default())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .generate_for_platform(&dna, &platform("devto"), GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(h.generator.calls(), 1);
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(matches!(first.artifact.validation, ValidationState::Fresh(_)));
    assert!(matches!(second.artifact.validation, ValidationState::Stale(_)));
    assert_eq!(first.artifact.title, second.artifact.title);
}

#[tokio::test]
async fn bypassing_the_cache_calls_the_generator_again() {
    let h = default_harness();
    let dna = dna("tool_launch");
    let bypass = GenerateOptions { bypass_cache: true };

    for _ in 0..2 {
        h.orchestrator
            .generate_for_platform(&dna, &platform("devto"), bypass)
            .await
            .unwrap();
    }
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn expired_artifact_is_regenerated() {
    let h = default_harness();
    let dna = dna("tool_launch");
    let devto = platform("devto");

    h.orchestrator
        .generate_for_platform(&dna, &devto, GenerateOptions::default())
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(6 * 60 * 60));
    let again = h
        .orchestrator
        .generate_for_platform(&dna, &devto, GenerateOptions::default())
        .await
        .unwrap();

    assert!(!again.cache_hit);
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn overlong_title_yields_exactly_one_length_error() {
    let h = Harness::new(
        ScriptedGenerator::new(|_| {
            let title = format!("Show HN: {}", "a".repeat(56));
            Ok(serde_json::json!({"title": title, "body": "b".repeat(300)}).to_string())
        }),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );

    let generated = h
        .orchestrator
        .generate_for_platform(&dna("tool_launch"), &platform("hackernews"), GenerateOptions::default())
        .await
        .unwrap();

    let result = generated.artifact.validation.result().unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.errors, vec!["Title too long: 65/60 characters".to_string()]);
}

#[tokio::test]
async fn invalid_artifacts_are_cached_too() {
    let h = Harness::new(
        ScriptedGenerator::new(|_| Ok(r#"{"title": "no prefix here at all", "body": ""}"#.to_string())),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );
    let dna = dna("tool_launch");
    let hn = platform("hackernews");

    let first = h
        .orchestrator
        .generate_for_platform(&dna, &hn, GenerateOptions::default())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .generate_for_platform(&dna, &hn, GenerateOptions::default())
        .await
        .unwrap();

    assert!(!first.artifact.validation.result().unwrap().is_valid());
    assert!(second.cache_hit);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn malformed_response_fails_only_that_call_and_is_not_cached() {
    let h = Harness::new(
        ScriptedGenerator::new(|_| Ok("Sorry, I can't help with that.".to_string())),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );
    let dna = dna("tool_launch");

    for _ in 0..2 {
        let err = h
            .orchestrator
            .generate_for_platform(&dna, &platform("devto"), GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Generation(GenerationError::InvalidResponse { .. })
        ));
    }
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn slow_generator_times_out_without_caching() {
    let mut generator = ScriptedGenerator::new(valid_response);
    generator.delay = Some(Duration::from_secs(10));
    let h = Harness::with_timeout(
        generator,
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
        Duration::from_millis(50),
    );

    let err = h
        .orchestrator
        .generate_for_platform(&dna("tool_launch"), &platform("devto"), GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Generation(GenerationError::Timeout { .. })));
}

#[tokio::test]
async fn unknown_platform_is_a_pipeline_error() {
    let h = default_harness();
    let err = h
        .orchestrator
        .generate_for_platform(&dna("tool_launch"), &platform("myspace"), GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn dna_is_extracted_once_per_source() {
    let h = default_harness();

    let first = h.orchestrator.dna_for_content("My tool launch post").await.unwrap();
    let second = h.orchestrator.dna_for_content("My tool launch post\r\n").await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unusable_dna_falls_back_without_caching() {
    let h = Harness::new(
        ScriptedGenerator::new(valid_response),
        ScriptedExtractor::returning(Err(GenerationError::invalid("not json"))),
    );

    let outcome = h.orchestrator.dna_for_content("A post about caches").await.unwrap();
    assert!(outcome.degraded);
    assert_eq!(outcome.dna.value_proposition, "A post about caches");

    h.orchestrator.dna_for_content("A post about caches").await.unwrap();
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transient_dna_failure_stops_the_run() {
    let h = Harness::new(
        ScriptedGenerator::new(valid_response),
        ScriptedExtractor::returning(Err(GenerationError::transient("rate limited"))),
    );

    let err = h
        .controller()
        .generate("A post", &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CrosspostError::DnaExtractionFailed { .. }));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn rejected_credentials_during_extraction_are_not_degraded() {
    let h = Harness::new(
        ScriptedGenerator::new(valid_response),
        ScriptedExtractor::returning(Err(GenerationError::Unauthorized {
            message: "API error (401): invalid api key".to_string(),
        })),
    );

    let err = h.orchestrator.dna_for_content("A post").await.unwrap_err();
    assert!(matches!(
        err,
        CrosspostError::DnaExtractionFailed {
            source: GenerationError::Unauthorized { .. }
        }
    ));
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generation_never_exceeds_the_concurrency_limit() {
    let mut generator = ScriptedGenerator::new(valid_response);
    generator.delay = Some(Duration::from_millis(30));
    let h = Harness::new(generator, ScriptedExtractor::returning(Ok(dna("tool_launch"))));
    let controller = h.controller_with(ControllerConfig {
        max_concurrency: 2,
        ..ControllerConfig::default()
    });

    let report = controller
        .generate(
            "A post",
            &only(&["devto", "hackernews", "medium", "reddit", "hashnode", "lobsters"]),
        )
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(h.generator.calls(), 6);
    assert_eq!(h.generator.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_credentials_during_generation_stop_the_run() {
    let h = Harness::new(
        ScriptedGenerator::new(|platform| match platform.as_str() {
            "medium" => Err(GenerationError::Unauthorized {
                message: "API error (403): forbidden".to_string(),
            }),
            _ => valid_response(platform),
        }),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );

    let err = h
        .controller()
        .generate("A post", &only(&["devto", "medium"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CrosspostError::GenerationRejected { ref platform, .. } if platform == "medium"
    ));
}

#[tokio::test]
async fn deterministic_selection_skips_avoided_platforms() {
    let h = Harness::new(
        ScriptedGenerator::new(valid_response),
        ScriptedExtractor::returning(Ok(dna("tutorial"))),
    );

    let report = h
        .controller()
        .generate("How to build a cache", &RunOptions::default())
        .await
        .unwrap();

    let skipped: Vec<&str> = report.skipped().map(|r| r.platform.as_str()).collect();
    assert_eq!(skipped, vec!["hackernews", "linkedin", "producthunt"]);
    assert!(report.skipped().all(|r| !r.reason.is_empty()));
    assert_eq!(report.outcomes.len(), 9);
    assert_eq!(h.generator.calls(), 9);
}

#[tokio::test]
async fn unparseable_advice_defaults_every_platform_to_moderate() {
    let h = default_harness();
    let controller = h
        .controller()
        .with_advisor(Arc::new(FixedAdvisor("I think you should post everywhere!".into())));

    let report = controller.generate("A post", &RunOptions::default()).await.unwrap();

    assert_eq!(report.recommendations.len(), h.registry.len());
    assert!(report.recommendations.iter().all(|r| r.fit == FitTier::Moderate));
    assert_eq!(report.outcomes.len(), h.registry.len());
}

#[tokio::test]
async fn all_skipped_is_a_hard_stop() {
    let h = default_harness();
    let ids: Vec<String> = h.registry.ids().map(|id| id.to_string()).collect();
    let answer = serde_json::Value::Array(
        ids.iter()
            .map(|id| serde_json::json!({"platform": id, "fit": "skip", "reason": "not a fit"}))
            .collect(),
    );
    let controller = h
        .controller()
        .with_advisor(Arc::new(FixedAdvisor(answer.to_string())));

    let err = controller.generate("A post", &RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, CrosspostError::NoPlatformsSelected));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn one_platform_failing_does_not_abort_the_others() {
    let h = Harness::new(
        ScriptedGenerator::new(|platform| match platform.as_str() {
            "devto" => Err(GenerationError::transient("upstream 502")),
            _ => valid_response(platform),
        }),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );

    let report = h
        .controller()
        .generate("A post", &only(&["devto", "hackernews"]))
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].platform, platform("devto"));
    assert!(matches!(
        report.outcomes[0].status,
        GenerationStatus::Failed { retryable: true, .. }
    ));
    assert!(matches!(report.outcomes[1].status, GenerationStatus::Generated { .. }));
}

#[tokio::test]
async fn requesting_an_unknown_platform_is_rejected() {
    let h = default_harness();
    let err = h
        .controller()
        .generate("A post", &only(&["myspace"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CrosspostError::UnknownPlatform { .. }));
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delivery_failure_is_recorded_and_ready_after_backoff() {
    let h = default_harness();
    let run = h.controller().run("A post", &only(&["devto"])).await.unwrap();

    let [outcome] = run.publish.outcomes.as_slice() else {
        panic!("expected one publish outcome");
    };
    let PublishStatus::Failed { failure_id: Some(id), .. } = &outcome.status else {
        panic!("expected a recorded failure, got {:?}", outcome.status);
    };

    let now = h.clock.now();
    assert!(h.recovery.list_retry_ready(now).is_empty());
    let ready = h.recovery.list_retry_ready(now.plus(Duration::from_secs(61)));
    assert_eq!(ready.len(), 1);
    assert_eq!(&ready[0].id, id);
    assert_eq!(ready[0].error, "503 Service Unavailable");
}

#[tokio::test]
async fn invalid_artifacts_are_not_delivered() {
    let h = Harness::new(
        ScriptedGenerator::new(|_| Ok(r#"{"title": "Missing prefix title here", "body": "short"}"#.to_string())),
        ScriptedExtractor::returning(Ok(dna("tool_launch"))),
    );
    let run = h.controller().run("A post", &only(&["hackernews"])).await.unwrap();

    assert!(matches!(
        run.publish.outcomes[0].status,
        PublishStatus::SkippedInvalid { .. }
    ));
    assert_eq!(h.deliverer.calls.load(Ordering::SeqCst), 0);
    assert!(h.recovery.list_all().is_empty());
}

#[tokio::test]
async fn cached_artifacts_are_revalidated_before_delivery() {
    let h = default_harness();
    h.deliverer.fail.store(false, Ordering::SeqCst);
    let controller = h.controller();

    controller.generate("A post", &only(&["devto"])).await.unwrap();
    let second = controller.generate("A post", &only(&["devto"])).await.unwrap();
    let artifact = second.artifacts().next().unwrap();
    assert!(matches!(artifact.validation, ValidationState::Stale(_)));

    let publish = controller.publish(&second).await;
    assert_eq!(
        publish.outcomes[0].status,
        PublishStatus::Published {
            url: Some("https://example.com/devto".to_string())
        }
    );
}

#[tokio::test]
async fn platforms_without_deliverers_are_reported() {
    let h = default_harness();
    let run = h.controller().run("A post", &only(&["medium"])).await.unwrap();
    assert_eq!(run.publish.outcomes[0].status, PublishStatus::NoDeliverer);
}

// ---------------------------------------------------------------------------
// Retry sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_removes_records_once_delivery_succeeds() {
    let h = default_harness();
    h.controller().run("A post", &only(&["devto"])).await.unwrap();

    h.clock.advance(Duration::from_secs(60));
    h.deliverer.fail.store(false, Ordering::SeqCst);
    let report = h.sweep().run(h.clock.now()).await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded.len(), 1);
    assert!(h.recovery.list_all().is_empty());
}

#[tokio::test]
async fn repeated_failures_exhaust_the_record() {
    let h = default_harness();
    h.controller().run("A post", &only(&["devto"])).await.unwrap();
    let id = h.recovery.list_all()[0].id.clone();
    let sweep = h.sweep();

    h.clock.advance(Duration::from_secs(60));
    let first = sweep.run(h.clock.now()).await;
    assert_eq!(first.rescheduled, vec![id.clone()]);

    h.clock.advance(Duration::from_secs(5 * 60));
    let second = sweep.run(h.clock.now()).await;
    assert_eq!(second.exhausted, vec![id.clone()]);

    h.clock.advance(Duration::from_secs(60 * 60));
    let third = sweep.run(h.clock.now()).await;
    assert_eq!(third.attempted, 0);

    let post = h.recovery.get(&id).unwrap();
    assert_eq!(post.attempt_count, 3);
    assert_eq!(h.recovery.state_of(&id, h.clock.now()), Some(FailureState::Exhausted));
}

#[tokio::test]
async fn records_not_yet_due_are_left_alone() {
    let h = default_harness();
    h.controller().run("A post", &only(&["devto"])).await.unwrap();
    let calls_after_run = h.deliverer.calls.load(Ordering::SeqCst);

    let report = h.sweep().run(h.clock.now()).await;
    assert_eq!(report.attempted, 0);
    assert_eq!(h.deliverer.calls.load(Ordering::SeqCst), calls_after_run);
}

#[tokio::test]
async fn storage_errors_do_not_stop_the_sweep_or_resend_posts() {
    let h = default_harness();
    h.controller()
        .run("A post", &only(&["devto", "hackernews"]))
        .await
        .unwrap();
    assert_eq!(h.recovery.list_all().len(), 2);
    let calls_after_run = h.deliverer.calls.load(Ordering::SeqCst);

    // Every later write or delete under the record directory now fails.
    let records = h.dir.path().join("failed_posts");
    std::fs::remove_dir_all(&records).unwrap();
    std::fs::write(&records, b"not a directory").unwrap();
    h.clock.advance(Duration::from_secs(60));

    let failing = h.sweep().run(h.clock.now()).await;
    assert_eq!(failing.attempted, 2);
    assert_eq!(failing.store_errors.len(), 2);
    assert_eq!(h.deliverer.calls.load(Ordering::SeqCst), calls_after_run + 2);

    h.deliverer.fail.store(false, Ordering::SeqCst);
    let delivered = h.sweep().run(h.clock.now()).await;
    assert_eq!(delivered.succeeded.len(), 2);
    assert_eq!(delivered.store_errors.len(), 2);
    assert!(h.recovery.list_all().is_empty());

    let again = h.sweep().run(h.clock.now()).await;
    assert_eq!(again.attempted, 0);
    assert_eq!(h.deliverer.calls.load(Ordering::SeqCst), calls_after_run + 4);
}
