//! Layered runtime configuration.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `~/.config/crosspost/config.toml` (user-global)
//! 3. `.crosspost/config.toml` (project-local)
//! 4. `CROSSPOST_*` environment variables, `__` separating sections
//!    (`CROSSPOST_GENERATION__MAX_CONCURRENCY=8` → `generation.max_concurrency`)
//!
//! [`CrosspostConfig::validate`] runs before anything is constructed; library
//! crates only ever see their own typed config structs.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use nodes::{ControllerConfig, OrchestratorConfig};
use pipeline::{BackoffSchedule, CrosspostError};
use serde::{Deserialize, Serialize};
use store::{RecoveryConfig, StoreConfig};

const ENV_PREFIX: &str = "CROSSPOST_";
const LOCAL_CONFIG: &str = ".crosspost/config.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub dir: PathBuf,
    pub dna_ttl_hours: u64,
    pub artifact_ttl_hours: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".crosspost/cache"),
            dna_ttl_hours: 24,
            artifact_ttl_hours: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySection {
    pub dir: PathBuf,
    pub max_retries: u32,
    pub backoff_minutes: Vec<u64>,
}

impl Default for RecoverySection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".crosspost/failed_posts"),
            max_retries: pipeline::DEFAULT_MAX_RETRIES,
            backoff_minutes: vec![1, 5, 30],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    /// Also bounds the external fit advisor.
    pub advisor_timeout_secs: u64,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_concurrency: 4,
            advisor_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    pub timeout_secs: u64,
    pub publish_invalid: bool,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            publish_invalid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    pub dir: PathBuf,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".crosspost/results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never lives in a config file.
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: llm::config::DEFAULT_BASE_URL.to_string(),
            model: llm::config::DEFAULT_MODEL.to_string(),
            api_key_env: llm::config::DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub format: LogFormat,
    /// OTLP gRPC endpoint; spans are exported only when set.
    pub otlp_endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosspostConfig {
    pub cache: CacheSection,
    pub recovery: RecoverySection,
    pub generation: GenerationSection,
    pub delivery: DeliverySection,
    pub archive: ArchiveSection,
    pub llm: LlmSection,
    pub telemetry: TelemetrySection,
}

impl CrosspostConfig {
    /// Loads and validates configuration from every source.
    pub fn load() -> Result<Self, CrosspostError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|err| CrosspostError::ConfigurationError {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// The provider chain, exposed so tests can layer on top of it.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global) = Self::global_config_path() {
            if global.exists() {
                figment = figment.merge(Toml::file(global));
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            figment = figment.merge(Toml::file(local));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("crosspost").join("config.toml"))
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), CrosspostError> {
        let fail = |message: &str| {
            Err(CrosspostError::ConfigurationError {
                message: message.to_string(),
            })
        };

        if self.generation.max_concurrency == 0 {
            return fail("generation.max_concurrency must be at least 1");
        }
        if self.generation.timeout_secs == 0 || self.generation.advisor_timeout_secs == 0 {
            return fail("generation timeouts must be greater than zero");
        }
        if self.delivery.timeout_secs == 0 {
            return fail("delivery.timeout_secs must be greater than zero");
        }
        if self.recovery.max_retries == 0 {
            return fail("recovery.max_retries must be at least 1");
        }
        if self.recovery.backoff_minutes.is_empty() {
            return fail("recovery.backoff_minutes needs at least one delay");
        }
        if self.cache.dna_ttl_hours == 0 || self.cache.artifact_ttl_hours == 0 {
            return fail("cache TTLs must be greater than zero");
        }
        if self.llm.api_key_env.trim().is_empty() {
            return fail("llm.api_key_env must name an environment variable");
        }
        if !(self.llm.base_url.starts_with("https://") || self.llm.base_url.starts_with("http://")) {
            return fail("llm.base_url must be an http(s) URL");
        }
        Ok(())
    }

    // -- typed views for the library crates ---------------------------------

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dir: self.cache.dir.clone(),
            dna_ttl: hours(self.cache.dna_ttl_hours),
            artifact_ttl: hours(self.cache.artifact_ttl_hours),
        }
    }

    pub fn recovery_config(&self) -> Result<RecoveryConfig, CrosspostError> {
        Ok(RecoveryConfig {
            dir: self.recovery.dir.clone(),
            max_retries: self.recovery.max_retries,
            backoff: BackoffSchedule::from_minutes(&self.recovery.backoff_minutes)?,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            generation_timeout: Duration::from_secs(self.generation.timeout_secs),
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_concurrency: self.generation.max_concurrency,
            advisor_timeout: Duration::from_secs(self.generation.advisor_timeout_secs),
            delivery_timeout: Duration::from_secs(self.delivery.timeout_secs),
            publish_invalid: self.delivery.publish_invalid,
        }
    }

    /// Client config with the API key read from `llm.api_key_env`.
    pub fn llm_config(&self) -> Result<llm::LlmConfig, llm::LlmError> {
        Ok(llm::LlmConfig::from_env(&self.llm.api_key_env)?
            .with_base_url(self.llm.base_url.clone())
            .with_model(self.llm.model.clone())
            .with_request_timeout(Duration::from_secs(self.generation.timeout_secs)))
    }
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 60 * 60)
}
