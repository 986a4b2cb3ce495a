use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_MISTRAL_OCR_MODEL: &str = "mistral-ocr-latest";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "deepseek-r1-distill-llama-70b";

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 120;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Settings for one upstream API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
}

/// Process-wide settings, read once at start-up and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub max_body_bytes: usize,
    pub upstream_timeout: Duration,
    pub ocr: ProviderConfig,
    pub llm: ProviderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or("CODE_ASSIST_PORT", get("CODE_ASSIST_PORT"), DEFAULT_PORT)?;
        let ip: IpAddr = parse_or("CODE_ASSIST_HOST", get("CODE_ASSIST_HOST"), DEFAULT_HOST)?;
        let listen_addr = SocketAddr::new(ip, port);

        let max_body_bytes = parse_or(
            "CODE_ASSIST_MAX_BODY_BYTES",
            get("CODE_ASSIST_MAX_BODY_BYTES"),
            DEFAULT_MAX_BODY_BYTES,
        )?;
        let timeout_secs = parse_or(
            "CODE_ASSIST_UPSTREAM_TIMEOUT_SECS",
            get("CODE_ASSIST_UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;

        let ocr = ProviderConfig {
            api_key: required("MISTRAL_API_KEY", get("MISTRAL_API_KEY"))?,
            base_url: base_url(
                "MISTRAL_BASE_URL",
                get("MISTRAL_BASE_URL"),
                DEFAULT_MISTRAL_BASE_URL,
            )?,
            model: get("MISTRAL_OCR_MODEL").unwrap_or_else(|| DEFAULT_MISTRAL_OCR_MODEL.to_string()),
        };

        let llm = ProviderConfig {
            api_key: required("GROQ_API_KEY", get("GROQ_API_KEY"))?,
            base_url: base_url("GROQ_BASE_URL", get("GROQ_BASE_URL"), DEFAULT_GROQ_BASE_URL)?,
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
        };

        Ok(Self {
            listen_addr,
            max_body_bytes,
            upstream_timeout: Duration::from_secs(timeout_secs),
            ocr,
            llm,
        })
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<SecretString, ConfigError> {
    value.map(SecretString::from).ok_or(ConfigError::Missing(name))
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

/// Validates the URL and drops any trailing slash so endpoint paths can be
/// appended with `format!`.
fn base_url(name: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        name,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "only http and https URLs are allowed".to_string(),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

// ── .env loading ─────────────────────────────────────────────────────────────

/// Reads `.env` from the working directory or one of its parents into the
/// process environment. Variables that are already set keep their value.
/// Returns the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("ignoring unreadable .env file: {e}");
            None
        }
    }
}

pub fn load_dotenv_from(path: &Path) -> Result<(), dotenvy::Error> {
    dotenvy::from_path(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const KEYS: &[(&str, &str)] = &[("MISTRAL_API_KEY", "m-key"), ("GROQ_API_KEY", "g-key")];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = Config::from_lookup(lookup(KEYS)).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.upstream_timeout, Duration::from_secs(120));
        assert_eq!(config.ocr.api_key.expose_secret(), "m-key");
        assert_eq!(config.ocr.base_url, DEFAULT_MISTRAL_BASE_URL);
        assert_eq!(config.ocr.model, DEFAULT_MISTRAL_OCR_MODEL);
        assert_eq!(config.llm.api_key.expose_secret(), "g-key");
        assert_eq!(config.llm.base_url, DEFAULT_GROQ_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_GROQ_MODEL);
    }

    #[test]
    fn missing_api_key_is_reported_by_name() {
        let err = Config::from_lookup(lookup(&[("MISTRAL_API_KEY", "m-key")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GROQ_API_KEY")));

        let err = Config::from_lookup(lookup(&[("MISTRAL_API_KEY", "  "), ("GROQ_API_KEY", "g")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MISTRAL_API_KEY")));
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = KEYS.to_vec();
        vars.extend_from_slice(&[
            ("CODE_ASSIST_HOST", "127.0.0.1"),
            ("CODE_ASSIST_PORT", "8080"),
            ("CODE_ASSIST_MAX_BODY_BYTES", "1024"),
            ("CODE_ASSIST_UPSTREAM_TIMEOUT_SECS", "5"),
            ("GROQ_BASE_URL", "http://localhost:9000/v1/"),
            ("GROQ_MODEL", "llama-3.3-70b-versatile"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.llm.base_url, "http://localhost:9000/v1");
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn ipv6_host_is_accepted() {
        let mut vars = KEYS.to_vec();
        vars.extend_from_slice(&[("CODE_ASSIST_HOST", "::"), ("CODE_ASSIST_PORT", "8080")]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.listen_addr, "[::]:8080".parse().unwrap());
        assert!(config.listen_addr.is_ipv6());
    }

    #[test]
    fn dotenv_file_fills_unset_vars_without_overriding_real_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "CODE_ASSIST_DOTENV_FILE_ONLY=from-file\nCODE_ASSIST_DOTENV_SHADOWED=from-file\n",
        )
        .unwrap();
        std::env::set_var("CODE_ASSIST_DOTENV_SHADOWED", "from-env");

        load_dotenv_from(&path).unwrap();

        assert_eq!(std::env::var("CODE_ASSIST_DOTENV_FILE_ONLY").unwrap(), "from-file");
        assert_eq!(std::env::var("CODE_ASSIST_DOTENV_SHADOWED").unwrap(), "from-env");
    }

    #[test]
    fn missing_dotenv_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dotenv_from(&dir.path().join(".env")).unwrap_err();
        assert!(err.not_found());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = KEYS.to_vec();
        vars.push(("CODE_ASSIST_PORT", "http"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CODE_ASSIST_PORT", .. }));

        let mut vars = KEYS.to_vec();
        vars.push(("CODE_ASSIST_HOST", "localhost"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CODE_ASSIST_HOST", .. }));

        let mut vars = KEYS.to_vec();
        vars.push(("MISTRAL_BASE_URL", "ftp://example.com"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MISTRAL_BASE_URL", .. }));
    }
}
