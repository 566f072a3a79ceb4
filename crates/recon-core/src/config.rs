//! Reconciler configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path, or the override in the data dir
//!    (~/.local/share/recon/config/recon.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Provider settings can then be overridden from the environment:
//! `RECON_PROVIDER`, `RECON_AGENT_HOST`, `RECON_SESSION_ID`, `RECON_TIMEOUT_SECS`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/recon.toml");

/// Which remote provider to consult before the local matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Agent,
    Mock,
    None,
}

impl ProviderKind {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "agent" | "http" => Ok(Self::Agent),
            "mock" => Ok(Self::Mock),
            "none" | "local" | "" => Ok(Self::None),
            other => Err(Error::Config(format!("Unknown provider kind: {}", other))),
        }
    }
}

/// Remote provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Agent base URL
    pub host: Option<String>,
    /// Bound on the whole remote call
    pub timeout: Duration,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// Fixed session id; generated per backend when unset
    pub session_id: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::None,
            host: None,
            timeout: Duration::from_secs(120),
            api_key_env: "RECON_AGENT_API_KEY".to_string(),
            session_id: None,
        }
    }
}

/// Field names read by the intrinsic heuristic signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingConfig {
    pub amount_field: String,
    pub date_field: String,
    pub description_field: String,
    pub reference_field: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            amount_field: "Amount".to_string(),
            date_field: "Date".to_string(),
            description_field: "Description".to_string(),
            reference_field: "ReferenceId".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconConfig {
    pub provider: ProviderConfig,
    pub matching: MatchingConfig,
}

impl ReconConfig {
    /// Load config (explicit path, then data-dir override, then embedded default)
    /// and apply environment overrides
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) if path.exists() => read_config(path)?,
            Some(path) => {
                return Err(Error::NotFound(format!(
                    "Config file {} does not exist",
                    path.display()
                )))
            }
            None => match default_config_path() {
                Some(path) if path.exists() => read_config(&path)?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = Self::parse(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = ReconConfig::default();

        if let Some(provider) = raw.provider {
            if let Some(kind) = provider.kind {
                config.provider.kind = ProviderKind::parse(&kind)?;
            }
            if let Some(host) = provider.host.filter(|h| !h.trim().is_empty()) {
                config.provider.host = Some(host);
            }
            if let Some(timeout) = provider.timeout_secs {
                config.provider.timeout = Duration::from_secs(timeout);
            }
            if let Some(env) = provider.api_key_env {
                config.provider.api_key_env = env;
            }
            config.provider.session_id = provider.session_id;
        }

        if let Some(matching) = raw.matching {
            if let Some(field) = matching.amount_field {
                config.matching.amount_field = field;
            }
            if let Some(field) = matching.date_field {
                config.matching.date_field = field;
            }
            if let Some(field) = matching.description_field {
                config.matching.description_field = field;
            }
            if let Some(field) = matching.reference_field {
                config.matching.reference_field = field;
            }
        }

        Ok(config)
    }

    /// Apply provider overrides from a variable lookup (the process
    /// environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("RECON_PROVIDER") {
            self.provider.kind = ProviderKind::parse(&kind)?;
        }
        if let Some(host) = lookup("RECON_AGENT_HOST").filter(|h| !h.trim().is_empty()) {
            self.provider.host = Some(host);
            // A host alone is enough to opt into the agent
            if self.provider.kind == ProviderKind::None && lookup("RECON_PROVIDER").is_none() {
                self.provider.kind = ProviderKind::Agent;
            }
        }
        if let Some(session) = lookup("RECON_SESSION_ID") {
            self.provider.session_id = Some(session);
        }
        if let Some(secs) = lookup("RECON_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid RECON_TIMEOUT_SECS: {}", secs)))?;
            self.provider.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::Config(format!("Failed to read config: {}", e)))
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("recon").join("config").join("recon.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    provider: Option<RawProvider>,
    matching: Option<RawMatching>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    kind: Option<String>,
    host: Option<String>,
    timeout_secs: Option<u64>,
    api_key_env: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    amount_field: Option<String>,
    date_field: Option<String>,
    description_field: Option<String>,
    reference_field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = ReconConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::None);
        assert_eq!(config.provider.timeout, Duration::from_secs(120));
        assert_eq!(config.matching, MatchingConfig::default());
    }

    #[test]
    fn test_parse_custom_fields() {
        let config = ReconConfig::parse(
            r#"
            [provider]
            kind = "agent"
            host = "http://agent.local:8080"
            timeout_secs = 5

            [matching]
            amount_field = "Total"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Agent);
        assert_eq!(config.provider.host.as_deref(), Some("http://agent.local:8080"));
        assert_eq!(config.provider.timeout, Duration::from_secs(5));
        assert_eq!(config.matching.amount_field, "Total");
        assert_eq!(config.matching.date_field, "Date");
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = ReconConfig::parse("[provider]\nkind = \"carrier-pigeon\"").unwrap_err();
        assert!(err.to_string().contains("Unknown provider kind"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RECON_AGENT_HOST", "http://127.0.0.1:9000"),
            ("RECON_TIMEOUT_SECS", "7"),
            ("RECON_SESSION_ID", "session-1"),
        ]
        .into_iter()
        .collect();

        let mut config = ReconConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.provider.kind, ProviderKind::Agent);
        assert_eq!(config.provider.host.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.provider.timeout, Duration::from_secs(7));
        assert_eq!(config.provider.session_id.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_env_invalid_timeout() {
        let mut config = ReconConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "RECON_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = ReconConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.toml");
        fs::write(&path, "[matching]\ndate_field = \"Posted\"\n").unwrap();

        let config = ReconConfig::load(Some(&path)).unwrap();
        assert_eq!(config.matching.date_field, "Posted");
    }
}
