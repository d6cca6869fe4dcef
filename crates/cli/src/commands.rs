//! Composition root and command handlers.
//!
//! Every handler prints its result as pretty JSON on stdout. Commands that
//! only touch local state (`failures`, `abandon`, `retry-extend`, `retry`,
//! `cache`, `timing`, `platforms`) never construct the language-model client,
//! so they work without an API key.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use llm::LlmClient;
use nodes::{
    builtin_subreddits, GenerateOptions, GenerationOrchestrator, PipelineController,
    PlatformRegistry, RetrySweep, RunOptions,
};
use pipeline::{check_schedule, select_subreddits, should_warn, suggest, Clock, FailureId, SystemClock};
use serde::Serialize;
use serde_json::json;
use store::{FailureRecoveryManager, FingerprintStore, ResultsArchive};
use tracing::{info, warn};

use crate::cli::{CacheCommands, Commands};
use crate::config::CrosspostConfig;

/// Long-lived collaborators shared by every command.
pub struct App {
    config: CrosspostConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<PlatformRegistry>,
    store: Arc<FingerprintStore>,
    recovery: Arc<FailureRecoveryManager>,
}

impl App {
    pub fn open(config: CrosspostConfig) -> anyhow::Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: CrosspostConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let store = FingerprintStore::open(config.store_config(), Arc::clone(&clock))
            .context("failed to open the fingerprint cache")?;
        let recovery = FailureRecoveryManager::open(config.recovery_config()?, Arc::clone(&clock))
            .context("failed to open the failed-delivery store")?;
        Ok(Self {
            config,
            clock,
            registry: Arc::new(PlatformRegistry::builtin()),
            store: Arc::new(store),
            recovery: Arc::new(recovery),
        })
    }

    fn orchestrator(&self, client: &Arc<LlmClient>) -> Arc<GenerationOrchestrator> {
        Arc::new(GenerationOrchestrator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            client.clone(),
            client.clone(),
            self.config.orchestrator_config(),
        ))
    }

    fn controller(
        &self,
        orchestrator: Arc<GenerationOrchestrator>,
        client: &Arc<LlmClient>,
        advisor: bool,
    ) -> PipelineController {
        let controller = PipelineController::new(
            orchestrator,
            Arc::clone(&self.recovery),
            Arc::clone(&self.clock),
            self.config.controller_config(),
        )
        .with_archive(ResultsArchive::new(self.config.archive.dir.clone()));
        if advisor {
            controller.with_advisor(client.clone())
        } else {
            controller
        }
    }

    fn llm_client(&self) -> anyhow::Result<Arc<LlmClient>> {
        let config = self.config.llm_config()?;
        Ok(Arc::new(LlmClient::new(config)?))
    }
}

pub async fn dispatch(command: Commands, app: &App) -> anyhow::Result<()> {
    match command {
        Commands::Recommend { source, advisor } => recommend(app, &source, advisor).await,
        Commands::Generate {
            source,
            platforms,
            no_cache,
            advisor,
        } => generate(app, &source, &platforms, no_cache, advisor).await,
        Commands::Subreddits { source, max } => subreddits(app, &source, max).await,
        Commands::Timing { platforms } => timing(app, &platforms),
        Commands::Platforms => print_json(&app.registry.profiles()),
        Commands::Retry => retry(app).await,
        Commands::Failures => failures(app),
        Commands::Abandon { id } => abandon(app, &id),
        Commands::RetryExtend { id, additional } => retry_extend(app, &id, additional),
        Commands::Cache { action } => cache(app, &action),
    }
}

async fn read_source(path: &Path) -> anyhow::Result<String> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if source.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(source)
}

async fn recommend(app: &App, path: &Path, advisor: bool) -> anyhow::Result<()> {
    let source = read_source(path).await?;
    let client = app.llm_client()?;
    let orchestrator = app.orchestrator(&client);
    let controller = app.controller(Arc::clone(&orchestrator), &client, advisor);

    let dna = orchestrator.dna_for_content(&source).await?;
    let recommendations = controller.recommend(&dna.dna).await;
    print_json(&json!({
        "fingerprint": dna.fingerprint,
        "dna_cache_hit": dna.cache_hit,
        "dna_degraded": dna.degraded,
        "dna": dna.dna,
        "recommendations": recommendations,
    }))
}

async fn generate(
    app: &App,
    path: &Path,
    platforms: &[String],
    no_cache: bool,
    advisor: bool,
) -> anyhow::Result<()> {
    let options = RunOptions {
        platforms: app.registry.resolve(platforms)?,
        generate: GenerateOptions {
            bypass_cache: no_cache,
        },
    };
    let source = read_source(path).await?;
    let client = app.llm_client()?;
    let orchestrator = app.orchestrator(&client);
    let controller = app.controller(orchestrator, &client, advisor);

    let report = controller.generate(&source, &options).await?;
    let failed = report.failures().count();
    if failed > 0 {
        warn!(failed, total = report.outcomes.len(), "Some platforms failed to generate");
    }
    print_json(&report)?;
    if failed == report.outcomes.len() {
        bail!("every selected platform failed to generate");
    }
    Ok(())
}

async fn subreddits(app: &App, path: &Path, max: u64) -> anyhow::Result<()> {
    let source = read_source(path).await?;
    let client = app.llm_client()?;
    let dna = app.orchestrator(&client).dna_for_content(&source).await?;

    let max = usize::try_from(max).unwrap_or(usize::MAX);
    let picks = select_subreddits(&dna.dna, &builtin_subreddits(), max);
    print_json(&json!({
        "content_type": dna.dna.content_type,
        "dna_degraded": dna.degraded,
        "subreddits": picks,
    }))
}

fn timing(app: &App, platforms: &[String]) -> anyhow::Result<()> {
    let ids = if platforms.is_empty() {
        app.registry.ids().cloned().collect()
    } else {
        app.registry.resolve(platforms)?
    };
    let now = app.clock.now();
    let rows: Vec<_> = ids
        .iter()
        .map(|id| {
            let profile = app.registry.timing(id);
            let notices = check_schedule(id, &profile, now);
            if should_warn(&notices) {
                warn!(platform = %id, "Posting now is likely to underperform");
            }
            json!({
                "suggestion": suggest(id, &profile, now),
                "notices": notices,
            })
        })
        .collect();
    print_json(&rows)
}

async fn retry(app: &App) -> anyhow::Result<()> {
    let sweep = RetrySweep::new(
        Arc::clone(&app.registry),
        Arc::clone(&app.recovery),
        app.config.controller_config().delivery_timeout,
    );
    let report = sweep.run(app.clock.now()).await;
    print_json(&report)?;
    if !report.store_errors.is_empty() {
        bail!(
            "{} failed deliveries could not be updated on disk",
            report.store_errors.len()
        );
    }
    Ok(())
}

fn failures(app: &App) -> anyhow::Result<()> {
    let now = app.clock.now();
    let rows: Vec<_> = app
        .recovery
        .list_all()
        .into_iter()
        .map(|post| {
            json!({
                "id": post.id,
                "platform": post.platform,
                "state": post.state_at(now),
                "attempt_count": post.attempt_count,
                "max_retries": post.max_retries,
                "next_retry": post.next_retry,
                "error": post.error,
            })
        })
        .collect();
    print_json(&rows)
}

fn parse_failure_id(raw: &str) -> anyhow::Result<FailureId> {
    FailureId::new(raw.trim()).context("failure id must not be empty")
}

fn abandon(app: &App, raw: &str) -> anyhow::Result<()> {
    let id = parse_failure_id(raw)?;
    if !app.recovery.remove(&id)? {
        bail!("no failed delivery with id {id}");
    }
    info!(failure_id = %id, "Failed delivery abandoned");
    print_json(&json!({ "removed": id }))
}

fn retry_extend(app: &App, raw: &str, additional: u32) -> anyhow::Result<()> {
    let id = parse_failure_id(raw)?;
    let Some(post) = app.recovery.extend_retries(&id, additional)? else {
        bail!("no failed delivery with id {id}");
    };
    print_json(&json!({
        "id": post.id,
        "attempt_count": post.attempt_count,
        "max_retries": post.max_retries,
        "state": post.state_at(app.clock.now()),
    }))
}

fn cache(app: &App, action: &CacheCommands) -> anyhow::Result<()> {
    match action {
        CacheCommands::Stats => print_json(&app.store.stats()?),
        CacheCommands::Sweep => {
            let removed = app.store.invalidate_expired()?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{ManualClock, PlatformArtifact, PlatformId, Timestamp};
    use pretty_assertions::assert_eq;

    fn app(dir: &Path) -> App {
        app_with_clock(dir, Arc::new(ManualClock::new(Timestamp::now())))
    }

    fn app_with_clock(dir: &Path, clock: Arc<ManualClock>) -> App {
        let mut config = CrosspostConfig::default();
        config.cache.dir = dir.join("cache");
        config.recovery.dir = dir.join("failed_posts");
        config.archive.dir = dir.join("results");
        App::open_with_clock(config, clock).unwrap()
    }

    fn record_failure(app: &App) -> FailureId {
        let devto = PlatformId::new("devto").unwrap();
        let artifact = PlatformArtifact::new(devto.clone(), "Title", "Body");
        app.recovery
            .record_failure(&devto, artifact, "503 Service Unavailable")
            .unwrap()
    }

    #[tokio::test]
    async fn abandon_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let id = record_failure(&app);

        dispatch(Commands::Abandon { id: id.to_string() }, &app)
            .await
            .unwrap();
        assert!(app.recovery.get(&id).is_none());

        let again = dispatch(Commands::Abandon { id: id.to_string() }, &app).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn retry_extend_raises_the_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let id = record_failure(&app);

        dispatch(
            Commands::RetryExtend {
                id: id.to_string(),
                additional: 2,
            },
            &app,
        )
        .await
        .unwrap();
        assert_eq!(app.recovery.get(&id).unwrap().max_retries, 5);

        let missing = dispatch(
            Commands::RetryExtend {
                id: "devto_19700101_000000_deadbeef".to_string(),
                additional: 1,
            },
            &app,
        )
        .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn local_commands_need_no_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        record_failure(&app);

        dispatch(Commands::Failures, &app).await.unwrap();
        dispatch(Commands::Platforms, &app).await.unwrap();
        dispatch(Commands::Timing { platforms: Vec::new() }, &app)
            .await
            .unwrap();
        dispatch(
            Commands::Cache {
                action: CacheCommands::Stats,
            },
            &app,
        )
        .await
        .unwrap();
        dispatch(
            Commands::Cache {
                action: CacheCommands::Sweep,
            },
            &app,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn retry_without_deliverers_keeps_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Timestamp::now()));
        let app = app_with_clock(dir.path(), Arc::clone(&clock));
        let id = record_failure(&app);

        clock.advance(std::time::Duration::from_secs(3600));
        dispatch(Commands::Retry, &app).await.unwrap();
        let post = app.recovery.get(&id).unwrap();
        assert_eq!(post.attempt_count, 1);
    }

    #[tokio::test]
    async fn timing_rejects_unknown_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let err = dispatch(
            Commands::Timing {
                platforms: vec!["myspace".to_string()],
            },
            &app,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Unknown platform"));
    }

    #[tokio::test]
    async fn unknown_platform_is_rejected_before_reading_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let err = dispatch(
            Commands::Generate {
                source: dir.path().join("missing.md"),
                platforms: vec!["myspace".to_string()],
                no_cache: false,
                advisor: false,
            },
            &app,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Unknown platform"));
    }
}
