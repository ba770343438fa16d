use serde::{Deserialize, Serialize};

/// Top-level tutor client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub api: ApiConfig,
    pub reveal: RevealTiming,
    pub pulse: PulseConfig,
    pub log_level: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            reveal: RevealTiming::default(),
            pulse: PulseConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TutorConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::TutorError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "/api".to_string(),
            auth_token: None,
        }
    }
}

/// Pacing of the collaborative reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealTiming {
    /// Delay before the first contribution shows
    pub first_delay_ms: u64,
    /// Lower bound (inclusive) of later delays
    pub min_delay_ms: u64,
    /// Upper bound (exclusive) of later delays
    pub max_delay_ms: u64,
    /// Messages older than this at mount are shown without animation
    pub immediate_after_ms: u64,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            first_delay_ms: 800,
            min_delay_ms: 1000,
            max_delay_ms: 4000,
            immediate_after_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub cooldown_ms: u64,
    pub tick_ms: u64,
    pub history_limit: u32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            tick_ms: 1000,
            history_limit: 20,
        }
    }
}
