//! Environment-driven settings
//!
//! Values come from the process environment, with a `.env` file loaded
//! first when present. Nothing is validated up front: a missing key is
//! reported by the accessor that needs it.

use outbound_core::{Vertical, DEFAULT_RPM};
use thiserror::Error;

/// Settings errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Supabase connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub timeout_secs: u64,
}

/// Clay webhook parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClayConfig {
    pub webhook_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Wrap the body as `{"records": [...]}`; otherwise post the bare array
    pub envelope: bool,
}

impl ClayConfig {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            api_key: None,
            timeout_secs: 30,
            envelope: true,
        }
    }

    /// Post records as a bare JSON array
    pub fn bare(mut self) -> Self {
        self.envelope = false;
        self
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub supabase_service_role: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub clay_api_key: Option<String>,
    pub clay_webhook_url: Option<String>,
    pub clay_webhook_url_bigtech: Option<String>,
    pub clay_webhook_url_vc: Option<String>,
    pub clay_webhook_url_ut: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub requests_timeout_seconds: u64,
    pub llm_rpm: u32,
}

impl Settings {
    /// Load from `.env` and the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let requests_timeout_seconds = match get("REQUESTS_TIMEOUT_SECONDS") {
            Some(value) => parse_number(&value, "REQUESTS_TIMEOUT_SECONDS")?,
            None => 30,
        };
        let llm_rpm = match get("LLM_RPM") {
            Some(value) => parse_number(&value, "LLM_RPM")?,
            None => DEFAULT_RPM,
        };

        Ok(Self {
            supabase_url: get("SUPABASE_URL"),
            supabase_service_role: get("SUPABASE_SERVICE_ROLE"),
            supabase_anon_key: get("SUPABASE_ANON_KEY"),
            clay_api_key: get("CLAY_API_KEY"),
            clay_webhook_url: get("CLAY_WEBHOOK_URL"),
            clay_webhook_url_bigtech: get("CLAY_WEBHOOK_URL_BIGTECH"),
            clay_webhook_url_vc: get("CLAY_WEBHOOK_URL_VC"),
            clay_webhook_url_ut: get("CLAY_WEBHOOK_URL_UT"),
            firecrawl_api_key: get("FIRECRAWL_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            requests_timeout_seconds,
            llm_rpm,
        })
    }

    /// Supabase URL and key; the service role key is preferred for writes
    pub fn supabase(&self) -> Result<SupabaseConfig, SettingsError> {
        let url = self
            .supabase_url
            .clone()
            .ok_or_else(|| SettingsError::Missing("SUPABASE_URL".to_string()))?;
        let key = self
            .supabase_service_role
            .clone()
            .or_else(|| self.supabase_anon_key.clone())
            .ok_or_else(|| SettingsError::Missing("SUPABASE_SERVICE_ROLE or SUPABASE_ANON_KEY".to_string()))?;

        Ok(SupabaseConfig {
            url,
            key,
            timeout_secs: self.requests_timeout_seconds,
        })
    }

    /// Clay webhook for a vertical, falling back to `CLAY_WEBHOOK_URL`
    pub fn clay_for(&self, vertical: Vertical) -> Result<ClayConfig, SettingsError> {
        let specific = match vertical {
            Vertical::BigTech => &self.clay_webhook_url_bigtech,
            Vertical::UtAlumni => &self.clay_webhook_url_ut,
            Vertical::VcPartnerships => &self.clay_webhook_url_vc,
        };

        let webhook_url = specific
            .as_ref()
            .or(self.clay_webhook_url.as_ref())
            .ok_or_else(|| {
                SettingsError::Missing(format!(
                    "CLAY_WEBHOOK_URL_{} or CLAY_WEBHOOK_URL",
                    vertical.key().to_uppercase()
                ))
            })?;

        Ok(ClayConfig {
            webhook_url: webhook_url.clone(),
            api_key: self.clay_api_key.clone(),
            timeout_secs: self.requests_timeout_seconds,
            envelope: true,
        })
    }

    pub fn firecrawl_api_key(&self) -> Result<&str, SettingsError> {
        self.firecrawl_api_key
            .as_deref()
            .ok_or_else(|| SettingsError::Missing("FIRECRAWL_API_KEY".to_string()))
    }

    pub fn google_api_key(&self) -> Result<&str, SettingsError> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| SettingsError::Missing("GOOGLE_API_KEY".to_string()))
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
