//! # docqa-bot Configuration
//!
//! File: bot/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module handles configuration loading, merging, and validation for the
//! bot service. Settings come from:
//! 1. Command-line arguments, each backed by an environment variable (highest priority)
//! 2. A TOML file, `.docqa-bot.toml` in the working directory or `--config <path>`
//! 3. Default values (lowest priority)
//!
//! Secrets (app password, provider API key) are only ever read from the
//! command line or the environment, never from the file.
//!
//! ## Examples
//!
//! Configuration file format:
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 3978
//! document = "data/company.json"
//! adapter = "legacy"
//!
//! [completion]
//! model = "gpt-4"
//! max_tokens = 150
//! n = 1
//! temperature = 0.5
//! timeout_seconds = 30
//! ```
//!
//! Loading:
//!
//! ```rust
//! let config = config::load_and_merge_config(args)?;
//! println!("Listening on {}:{}", config.host, config.port);
//! ```
//!
use crate::core::error::{BotError, Result};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};
use tracing::{debug, info, warn};

/// The expected name for the bot's configuration file.
pub const CONFIG_FILE_NAME: &str = ".docqa-bot.toml";

const DEFAULT_PORT: u16 = 3978;
const DEFAULT_DOCUMENT: &str = "document.json";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_MAX_TOKENS: u32 = 150;
const DEFAULT_CANDIDATES: u32 = 1;
const DEFAULT_TEMPERATURE: f32 = 0.5;
/// Port variables in lookup order; some hosts export the lowercase name.
const PORT_ENV_VARS: [&str; 2] = ["port", "PORT"];

/// # Bot Arguments (`BotArgs`)
///
/// Command-line arguments for the bot. Every credential falls back to the
/// environment variable the Bot Framework and OpenAI tooling conventionally use,
/// so a deployment configured purely through the environment needs no flags.
///
/// Settings that the config file can also provide are `Option`s: `None` means
/// "not supplied", and the built-in default is applied only after the merge.
#[derive(Parser, Debug, Clone, Default)]
pub struct BotArgs {
    /// Path to a TOML configuration file. Defaults to `.docqa-bot.toml` in the
    /// working directory when that file exists.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// JSON document the bot answers questions about [default: document.json].
    #[arg(long, short)]
    pub document: Option<PathBuf>,

    /// Address to bind the HTTP listener to [default: 0.0.0.0].
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to bind the HTTP listener to. Falls back to the `port` and then
    /// the `PORT` environment variable [default: 3978].
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Transport adapter flavour [default: cloud].
    #[arg(long, value_enum, env = "BOT_ADAPTER")]
    pub adapter: Option<AdapterKind>,

    /// Bot application id. Leave unset to accept unauthenticated traffic from a local emulator.
    #[arg(long, env = "MicrosoftAppId")]
    pub app_id: Option<String>,

    /// Bot application password (client secret).
    #[arg(long, env = "MicrosoftAppPassword", hide_env_values = true)]
    pub app_password: Option<String>,

    /// Bot application type: MultiTenant, SingleTenant or UserAssignedMSI.
    #[arg(long, env = "MicrosoftAppType")]
    pub app_type: Option<String>,

    /// Tenant id, required for SingleTenant applications.
    #[arg(long, env = "MicrosoftAppTenantId")]
    pub app_tenant_id: Option<String>,

    /// API key for the completion provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

/// Which transport adapter processes inbound activities.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Credential factory flow: app id, password, app type and tenant.
    Cloud,
    /// Direct app id / password flow.
    Legacy,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::Cloud => write!(f, "cloud"),
            AdapterKind::Legacy => write!(f, "legacy"),
        }
    }
}

/// Bot application type, as carried by `MicrosoftAppType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppType {
    #[default]
    MultiTenant,
    SingleTenant,
    UserAssignedMsi,
}

impl FromStr for AppType {
    type Err = BotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "multitenant" => Ok(AppType::MultiTenant),
            "singletenant" => Ok(AppType::SingleTenant),
            "userassignedmsi" => Ok(AppType::UserAssignedMsi),
            other => Err(BotError::Config(format!("unknown app type '{}'", other))),
        }
    }
}

/// Credentials for the bot transport.
#[derive(Clone, Default)]
pub struct AppCredentials {
    pub app_id: Option<String>,
    pub app_password: Option<String>,
    pub app_type: AppType,
    pub tenant_id: Option<String>,
}

impl AppCredentials {
    /// True when an app id is configured. Without one the bot runs in
    /// emulator mode: no inbound auth check, no connector token.
    pub fn is_configured(&self) -> bool {
        self.app_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_password", &redact(&self.app_password))
            .field("app_type", &self.app_type)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Fixed parameters for every completion request.
#[derive(Clone)]
pub struct CompletionSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub n: u32,
    pub temperature: f32,
    /// Per-request timeout. `None` leaves the HTTP client default in place.
    pub timeout_seconds: Option<u64>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            n: DEFAULT_CANDIDATES,
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: None,
        }
    }
}

impl fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("n", &self.n)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

/// # Effective Bot Configuration (`BotConfig`)
///
/// The consolidated settings after merging arguments, environment and the
/// configuration file. Built once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub host: IpAddr,
    pub port: u16,
    pub document: PathBuf,
    pub adapter: AdapterKind,
    pub credentials: AppCredentials,
    pub completion: CompletionSettings,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            document: PathBuf::from(DEFAULT_DOCUMENT),
            adapter: AdapterKind::Cloud,
            credentials: AppCredentials::default(),
            completion: CompletionSettings::default(),
        }
    }
}

/// Deserialization target for the TOML file. Everything is optional so a file
/// only needs the settings it overrides.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    document: Option<String>,
    adapter: Option<AdapterKind>,
    #[serde(default)]
    completion: FileCompletionConfig,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct FileCompletionConfig {
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    n: Option<u32>,
    temperature: Option<f32>,
    timeout_seconds: Option<u64>,
}

/// # Load and Merge Configuration (`load_and_merge_config`)
///
/// Starts from defaults, applies the configuration file (when one is found),
/// then applies every setting supplied through arguments or the environment.
/// Credentials are taken from the arguments only.
///
/// ## Errors
///
/// Returns an error if an explicitly requested config file is missing, if the
/// file cannot be parsed, or if the resulting configuration is invalid (for
/// example a `SingleTenant` app without a tenant id).
pub fn load_and_merge_config(args: BotArgs) -> Result<BotConfig> {
    merge_config(args, |name| env::var(name).ok())
}

/// `load_and_merge_config` with the environment lookup supplied by the caller.
fn merge_config(args: BotArgs, env_lookup: impl Fn(&str) -> Option<String>) -> Result<BotConfig> {
    let mut config = BotConfig::default();

    let config_path = match &args.config {
        Some(path) => {
            if !path.is_file() {
                return Err(BotError::Config(format!(
                    "config file not found: {}",
                    path.display()
                ))
                .into());
            }
            Some(path.clone())
        }
        None => {
            let candidate = env::current_dir()
                .context("Failed to get current working directory")?
                .join(CONFIG_FILE_NAME);
            candidate.is_file().then_some(candidate)
        }
    };

    if let Some(path) = config_path {
        apply_file_config(&mut config, &path)?;
    } else {
        debug!("No {} found, using arguments and defaults.", CONFIG_FILE_NAME);
    }

    // Anything supplied on the command line or through the environment
    // overrides the file.
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = resolve_port(args.port, &env_lookup)? {
        config.port = port;
    }
    if let Some(document) = args.document {
        config.document = document;
    }
    if let Some(adapter) = args.adapter {
        config.adapter = adapter;
    }

    config.credentials = AppCredentials {
        app_id: non_empty(args.app_id),
        app_password: non_empty(args.app_password),
        app_type: match args.app_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => AppType::default(),
        },
        tenant_id: non_empty(args.app_tenant_id),
    };
    config.completion.api_key = non_empty(args.openai_api_key);

    validate_config(&config)?;
    Ok(config)
}

/// `--port`, then the `port` environment variable, then `PORT`. Blank values
/// count as unset.
fn resolve_port(
    flag: Option<u16>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<u16>> {
    if flag.is_some() {
        return Ok(flag);
    }
    for name in PORT_ENV_VARS {
        if let Some(raw) = env_lookup(name).filter(|v| !v.trim().is_empty()) {
            let port = raw.trim().parse::<u16>().map_err(|e| {
                BotError::Config(format!("invalid {} '{}': {}", name, raw, e))
            })?;
            return Ok(Some(port));
        }
    }
    Ok(None)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reads `path` and overlays its values onto `config`. A relative `document`
/// in the file is resolved against the file's own directory.
fn apply_file_config(config: &mut BotConfig, path: &Path) -> Result<()> {
    info!("Loading configuration from {}", path.display());

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file_config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if let Some(host) = file_config.host {
        config.host = host.parse().unwrap_or_else(|e| {
            warn!(
                "Invalid host '{}' in config file ({}), using default {}",
                host, e, config.host
            );
            config.host
        });
    }
    if let Some(port) = file_config.port {
        config.port = port;
    }
    if let Some(document) = file_config.document {
        let mut document = PathBuf::from(document);
        if document.is_relative() {
            if let Some(parent) = path.parent() {
                document = parent.join(document);
            }
        }
        config.document = document;
    }
    if let Some(adapter) = file_config.adapter {
        config.adapter = adapter;
    }

    let completion = file_config.completion;
    if let Some(base_url) = completion.base_url {
        config.completion.base_url = base_url;
    }
    if let Some(model) = completion.model {
        config.completion.model = model;
    }
    if let Some(max_tokens) = completion.max_tokens {
        config.completion.max_tokens = max_tokens;
    }
    if let Some(n) = completion.n {
        config.completion.n = n;
    }
    if let Some(temperature) = completion.temperature {
        config.completion.temperature = temperature;
    }
    if completion.timeout_seconds.is_some() {
        config.completion.timeout_seconds = completion.timeout_seconds;
    }

    Ok(())
}

fn validate_config(config: &BotConfig) -> Result<()> {
    let creds = &config.credentials;

    if creds.is_configured() && creds.app_password.is_none() {
        warn!("MicrosoftAppId is set without MicrosoftAppPassword; replies cannot be authenticated.");
    }
    if !creds.is_configured() {
        warn!("No MicrosoftAppId configured: inbound requests are not authenticated (emulator mode).");
    }
    if config.completion.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; every question will be answered with the apology message.");
    }
    if creds.app_type == AppType::SingleTenant && creds.tenant_id.is_none() {
        return Err(BotError::Config(
            "SingleTenant app type requires MicrosoftAppTenantId".to_string(),
        )
        .into());
    }
    if config.completion.n == 0 {
        return Err(BotError::Config("completion.n must be at least 1".to_string()).into());
    }
    if config.completion.base_url.trim().is_empty() {
        return Err(BotError::Config("completion.base_url must not be empty".to_string()).into());
    }
    Ok(())
}
