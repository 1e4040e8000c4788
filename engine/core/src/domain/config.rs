// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration Types
//
// Defines the configuration schema for a Sentinel engine instance:
// - Normalizer watermark and dedup windows
// - Session cooldown and queue sizing
// - Safety gate thresholds and rate limits
// - Context store retention and embedding provider
// - Reasoning provider selection (LLM-backed vs rule-based)
// - Action dispatch mode and telemetry
//
// API keys support "env:VAR_NAME" indirection so manifests can be committed
// without secrets.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub actions: ActionsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Resolve a secret value, supporting "env:VAR_NAME" indirection.
pub fn resolve_secret(value: &Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.starts_with("env:") => {
            let var_name = v.trim_start_matches("env:");
            match std::env::var(var_name) {
                Ok(resolved) => Ok(Some(resolved)),
                Err(_) => Err(ConfigError::MissingEnvVar(var_name.to_string())),
            }
        }
        Some(v) => Ok(Some(v.clone())),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Events whose timestamp lags the processing clock by more than this
    /// are rejected as stale.
    #[serde(with = "humantime_serde", default = "default_watermark_grace")]
    pub watermark_grace: Duration,

    /// Window within which duplicate event ids are dropped.
    #[serde(with = "humantime_serde", default = "default_dedup_window")]
    pub dedup_window: Duration,

    /// Coarse timestamp bucket folded into the content hash.
    #[serde(with = "humantime_serde", default = "default_dedup_bucket")]
    pub dedup_bucket: Duration,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            watermark_grace: default_watermark_grace(),
            dedup_window: default_dedup_window(),
            dedup_bucket: default_dedup_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Suppression window entered whenever a session reaches ACT.
    #[serde(with = "humantime_serde", default = "default_cooldown")]
    pub cooldown: Duration,

    /// Bounded per-session queue depth; a full queue blocks the producer.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Upper bound on a single action dispatch, after which it is a Failure.
    #[serde(with = "humantime_serde", default = "default_action_timeout")]
    pub action_timeout: Duration,

    /// Additional dispatch attempts after the first failure.
    #[serde(default = "default_action_retries")]
    pub action_retries: u32,

    /// How far back the RETRIEVE stage looks.
    #[serde(with = "humantime_serde", default = "default_context_window")]
    pub context_window: Duration,

    /// Maximum context entries handed to the reasoning strategy.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown: default_cooldown(),
            queue_depth: default_queue_depth(),
            action_timeout: default_action_timeout(),
            action_retries: default_action_retries(),
            context_window: default_context_window(),
            context_limit: default_context_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Decisions below this confidence never execute.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum actions per session within the trailing rate window.
    #[serde(default = "default_max_actions")]
    pub max_actions_per_window: u32,

    #[serde(with = "humantime_serde", default = "default_rate_window")]
    pub rate_window: Duration,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_actions_per_window: default_max_actions(),
            rate_window: default_rate_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Entries older than this are logically expired.
    #[serde(with = "humantime_serde", default = "default_retention")]
    pub retention: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            retention: default_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(rename = "type", default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Supports "env:VAR_NAME".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: default_embedding_endpoint(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Http,
    /// Deterministic feature hashing; no credentials required.
    #[default]
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(rename = "type", default)]
    pub provider: ReasoningProvider,

    /// OpenAI-compatible chat completions base URL.
    #[serde(default = "default_reasoning_endpoint")]
    pub endpoint: String,

    /// Supports "env:VAR_NAME".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: ReasoningProvider::default(),
            endpoint: default_reasoning_endpoint(),
            api_key: None,
            model: default_reasoning_model(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningProvider {
    /// LLM-backed strategy with rule-based fallback on error.
    Llm,
    /// Deterministic rule-based strategy only.
    #[default]
    Rules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(rename = "type", default)]
    pub mode: ActionMode,

    /// Required for webhook mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            mode: ActionMode::default(),
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    Webhook,
    /// Logging interceptor; never performs real I/O.
    #[default]
    Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Broadcast channel capacity before slow subscribers lag.
    #[serde(default = "default_telemetry_capacity")]
    pub capacity: usize,

    /// Optional TCP listen address for the JSON-lines forwarder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_listen: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: default_telemetry_capacity(),
            tcp_listen: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(rename = "type", default)]
    pub provider: RoutingProvider,

    #[serde(default = "default_routing_endpoint")]
    pub endpoint: String,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: RoutingProvider::default(),
            endpoint: default_routing_endpoint(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSONL trail location. `None` keeps the trail in memory, which is only
    /// acceptable outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingProvider {
    Osrm,
    /// Interpolated straight line; deterministic, no network.
    #[default]
    GreatCircle,
}

fn default_watermark_grace() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_dedup_bucket() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_cooldown() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_queue_depth() -> usize {
    64
}

fn default_action_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_action_retries() -> u32 {
    2
}

fn default_context_window() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_context_limit() -> usize {
    5
}

fn default_min_confidence() -> f64 {
    0.70
}

fn default_max_actions() -> u32 {
    2
}

fn default_rate_window() -> Duration {
    Duration::from_secs(3600)
}

fn default_retention() -> Duration {
    Duration::from_secs(7 * 24 * 3600)
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_reasoning_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_reasoning_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_telemetry_capacity() -> usize {
    1000
}

fn default_routing_endpoint() -> String {
    "https://router.project-osrm.org".to_string()
}
