//! Environment-driven orchestrator configuration.
//!
//! All settings come from the process environment, validated once at
//! startup. Missing required values are reported as a complete list so
//! an operator can fix the deployment in one go.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default image when `TERMINAL_IMAGE` is unset and no GCP project is
/// configured.
const DEFAULT_IMAGE_PROJECT: &str = "PROJECT_ID";
const DEFAULT_GCP_REGION: &str = "us-central1";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Validated orchestrator configuration, constructed once at startup
/// and passed by reference into the API client and runtime adapter.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base URL of the trading journal control plane.
    pub journal_url: String,
    /// Shared secret authenticating this orchestrator to the control
    /// plane.
    pub orchestrator_secret: String,
    /// Docker engine endpoint of the terminal VM.
    pub docker_host: String,
    /// Directory holding `cert.pem`, `key.pem`, and `ca.pem` for a TLS
    /// Docker connection.
    pub docker_cert_path: Option<PathBuf>,
    /// Whether to require TLS when a cert path is configured.
    pub docker_tls_verify: bool,
    /// Secret injected into each terminal for webhook callbacks. This
    /// is a separate trust relationship from `orchestrator_secret` and
    /// must never be reused for it.
    pub terminal_webhook_secret: String,
    /// Container image for terminal units.
    pub terminal_image: String,
    pub gcp_project_id: Option<String>,
    pub gcp_region: String,
    /// Interval at which the external scheduler is expected to invoke
    /// the orchestrator. Informational; a single invocation always
    /// performs exactly one pass.
    pub poll_interval: Duration,
}

impl OrchestratorConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary lookup function.
    ///
    /// `from_env` is a thin wrapper over this; tests pass a closure
    /// over a map instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &str, missing: &mut Vec<String>| -> String {
            match lookup(name).filter(|v| !v.is_empty()) {
                Some(value) => value,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let mut missing = Vec::new();
        let journal_url = required("TRADING_JOURNAL_URL", &mut missing);
        let orchestrator_secret = required("ORCHESTRATOR_SECRET", &mut missing);
        let docker_host = required("VM_DOCKER_HOST", &mut missing);
        let terminal_webhook_secret = required("TERMINAL_WEBHOOK_SECRET", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let gcp_project_id = lookup("GCP_PROJECT_ID").filter(|v| !v.is_empty());
        let terminal_image = lookup("TERMINAL_IMAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                let project = gcp_project_id.as_deref().unwrap_or(DEFAULT_IMAGE_PROJECT);
                format!("gcr.io/{project}/mt5-terminal:latest")
            });

        let docker_tls_verify = match lookup("VM_DOCKER_TLS_VERIFY") {
            None => true,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "VM_DOCKER_TLS_VERIFY",
                        value,
                    });
                }
            },
        };

        let poll_interval = match lookup("POLL_INTERVAL") {
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            Some(value) => match value.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: "POLL_INTERVAL",
                        value,
                    });
                }
            },
        };

        Ok(Self {
            journal_url,
            orchestrator_secret,
            docker_host,
            docker_cert_path: lookup("VM_DOCKER_CERT_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            docker_tls_verify,
            terminal_webhook_secret,
            terminal_image,
            gcp_project_id,
            gcp_region: lookup("GCP_REGION")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_GCP_REGION.to_string()),
            poll_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TRADING_JOURNAL_URL", "https://journal.example.com"),
            ("ORCHESTRATOR_SECRET", "orch-secret"),
            ("VM_DOCKER_HOST", "tcp://10.0.0.5:2376"),
            ("TERMINAL_WEBHOOK_SECRET", "hook-secret"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<OrchestratorConfig, ConfigError> {
        OrchestratorConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.journal_url, "https://journal.example.com");
        assert!(config.docker_tls_verify);
        assert!(config.docker_cert_path.is_none());
        assert_eq!(config.gcp_region, "us-central1");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.terminal_image, "gcr.io/PROJECT_ID/mt5-terminal:latest");
    }

    #[test]
    fn reports_every_missing_required_value() {
        let mut env = base_env();
        env.remove("ORCHESTRATOR_SECRET");
        env.remove("TERMINAL_WEBHOOK_SECRET");

        let err = load(&env).unwrap_err();
        match err {
            ConfigError::MissingRequired(names) => {
                assert_eq!(names, vec!["ORCHESTRATOR_SECRET", "TERMINAL_WEBHOOK_SECRET"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_required_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("VM_DOCKER_HOST", "");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(names) if names == ["VM_DOCKER_HOST"]));
    }

    #[test]
    fn image_default_uses_gcp_project() {
        let mut env = base_env();
        env.insert("GCP_PROJECT_ID", "farm-prod");

        let config = load(&env).unwrap();
        assert_eq!(config.terminal_image, "gcr.io/farm-prod/mt5-terminal:latest");
    }

    #[test]
    fn explicit_image_wins_over_project_default() {
        let mut env = base_env();
        env.insert("GCP_PROJECT_ID", "farm-prod");
        env.insert("TERMINAL_IMAGE", "registry.local/mt5:v2");

        let config = load(&env).unwrap();
        assert_eq!(config.terminal_image, "registry.local/mt5:v2");
    }

    #[test]
    fn tls_verify_parses_case_insensitively() {
        let mut env = base_env();
        env.insert("VM_DOCKER_TLS_VERIFY", "False");
        assert!(!load(&env).unwrap().docker_tls_verify);

        env.insert("VM_DOCKER_TLS_VERIFY", "TRUE");
        assert!(load(&env).unwrap().docker_tls_verify);
    }

    #[test]
    fn invalid_tls_verify_is_an_error() {
        let mut env = base_env();
        env.insert("VM_DOCKER_TLS_VERIFY", "yes");

        let err = load(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "VM_DOCKER_TLS_VERIFY",
                ..
            }
        ));
    }

    #[test]
    fn invalid_poll_interval_is_an_error() {
        let mut env = base_env();
        env.insert("POLL_INTERVAL", "soon");

        let err = load(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "POLL_INTERVAL",
                ..
            }
        ));
    }
}
