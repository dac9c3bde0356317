//! Workflow configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first, then process
//! environment variables are read. See `.env.example` for every key.

use crate::adapters::bitmovin::DEFAULT_BASE_URL;
use crate::domain::layout::{AudioTier, VideoTier};
use crate::domain::resources::{CloudRegion, PrewarmedEncoderDiskSize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const DEFAULT_VIDEO_TIERS: &str = "1500000:1024,1000000:768,750000:640";
const DEFAULT_AUDIO_BITRATE: u64 = 128_000;
const DEFAULT_SEGMENT_LENGTH: f64 = 4.0;
const DEFAULT_ENCODER_VERSION: &str = "2.77.2";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env var required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenv::Error),
}

/// Credentials and container of one Azure storage account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AzureStorage {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
}

/// Where encodings run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Infrastructure {
    /// Bitmovin-managed encoders in the configured cloud region.
    Managed,
    /// Cloud Connect: encoders run on the customer's own cloud account.
    CloudConnect { infrastructure_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrewarmedPoolConfig {
    pub encoder_version: String,
    pub disk_size: PrewarmedEncoderDiskSize,
    pub target_pool_size: u32,
}

/// Connection settings for the remote API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Absent only when running against the in-memory service.
    pub api_key: Option<String>,
    pub base_url: String,
}

impl ApiConfig {
    pub fn require_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing("BITMOVIN_API_KEY"))
    }
}

/// Everything one workflow run needs. Passed explicitly, never global.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowConfig {
    pub api: ApiConfig,
    pub input: AzureStorage,
    /// Path of the source file inside the input container.
    pub input_file: String,
    pub output: AzureStorage,
    pub cloud_region: CloudRegion,
    pub infrastructure: Infrastructure,
    pub prewarmed_pool: Option<PrewarmedPoolConfig>,
    /// Highest quality first.
    pub video_tiers: Vec<VideoTier>,
    pub audio: AudioTier,
    pub audio_language: String,
    /// Segment duration in seconds.
    pub segment_length: f64,
}

impl WorkflowConfig {
    /// Load configuration from `.env` (if present) and environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a specific env file. Keys in the file take
    /// precedence over the process environment.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenv::from_path_iter(path)? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned().or_else(|| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let api = ApiConfig {
            api_key: get("BITMOVIN_API_KEY").or_else(|| get("YOUR_API_KEY")),
            base_url: get("BITMOVIN_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        let input = AzureStorage {
            account_name: require("ACCOUNT_NAME")?,
            account_key: require("ACCOUNT_KEY")?,
            container: require("CONTAINER_INPUTS")?,
        };
        let output = AzureStorage {
            account_name: get("OUTPUT_ACCOUNT_NAME").unwrap_or_else(|| input.account_name.clone()),
            account_key: get("OUTPUT_ACCOUNT_KEY").unwrap_or_else(|| input.account_key.clone()),
            container: require("CONTAINER_OUTPUTS")?,
        };
        let input_file = require("INPUT_FILE")?;

        let cloud_region = get("CLOUD_REGION")
            .map(CloudRegion::new)
            .unwrap_or_default();

        let infrastructure = match get("INFRASTRUCTURE_ID") {
            Some(infrastructure_id) => Infrastructure::CloudConnect { infrastructure_id },
            None => Infrastructure::Managed,
        };

        let prewarmed_pool = if parse_bool("PREWARMED_POOL", get("PREWARMED_POOL"))? {
            Some(PrewarmedPoolConfig {
                encoder_version: get("PREWARMED_ENCODER_VERSION")
                    .unwrap_or_else(|| DEFAULT_ENCODER_VERSION.to_string()),
                disk_size: PrewarmedEncoderDiskSize::Gb500,
                target_pool_size: parse_number("PREWARMED_POOL_SIZE", get("PREWARMED_POOL_SIZE"))?
                    .unwrap_or(1),
            })
        } else {
            None
        };

        let video_tiers = parse_video_tiers(
            &get("VIDEO_TIERS").unwrap_or_else(|| DEFAULT_VIDEO_TIERS.to_string()),
        )?;
        let audio = AudioTier {
            bitrate: parse_number("AUDIO_BITRATE", get("AUDIO_BITRATE"))?
                .unwrap_or(DEFAULT_AUDIO_BITRATE),
        };
        if audio.bitrate == 0 {
            return Err(ConfigError::Invalid {
                key: "AUDIO_BITRATE",
                reason: "must be positive".to_string(),
            });
        }
        let segment_length: f64 = parse_number("SEGMENT_LENGTH", get("SEGMENT_LENGTH"))?
            .unwrap_or(DEFAULT_SEGMENT_LENGTH);
        if !segment_length.is_finite() || segment_length <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "SEGMENT_LENGTH",
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        Ok(Self {
            api,
            input,
            input_file,
            output,
            cloud_region,
            infrastructure,
            prewarmed_pool,
            video_tiers,
            audio,
            audio_language: get("AUDIO_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            segment_length,
        })
    }
}

/// Parse `bitrate:width` pairs separated by commas, keeping the given order.
pub fn parse_video_tiers(raw: &str) -> Result<Vec<VideoTier>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "VIDEO_TIERS",
        reason,
    };

    let mut tiers = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (bitrate, width) = entry
            .split_once(':')
            .ok_or_else(|| invalid(format!("expected bitrate:width, got {entry:?}")))?;
        let bitrate: u64 = bitrate
            .trim()
            .parse()
            .map_err(|_| invalid(format!("bad bitrate in {entry:?}")))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| invalid(format!("bad width in {entry:?}")))?;
        if bitrate == 0 || width == 0 {
            return Err(invalid(format!("zero bitrate or width in {entry:?}")));
        }
        tiers.push(VideoTier::new(bitrate, width));
    }

    if tiers.is_empty() {
        return Err(invalid("at least one tier is required".to_string()));
    }

    let mut seen = HashSet::new();
    for tier in &tiers {
        if !seen.insert(*tier) {
            warn!(
                bitrate = tier.bitrate,
                width = tier.width,
                "duplicate video tier, renditions and output paths will collide"
            );
        }
    }

    Ok(tiers)
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                reason: format!("{v:?} is not a number"),
            })
        })
        .transpose()
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None => Ok(false),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}
