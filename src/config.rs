//! Startup configuration for the relay.
//!
//! Configuration is resolved exactly once at process start and then shared
//! immutably. Each recognized setting follows the same precedence:
//! a set process environment variable wins over a credential-file entry,
//! which wins over the built-in default. There is no runtime reload and no
//! global mutable state.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable (and credential-file key) for the API credential.
pub const API_KEY_VAR: &str = "QBCHAT_API_KEY";

/// Environment variable (and credential-file key) for the upstream base URL.
pub const BASE_URL_VAR: &str = "QBCHAT_BASE_URL";

/// Environment variable (and credential-file key) for the model name.
pub const MODEL_VAR: &str = "QBCHAT_MODEL";

/// Default upstream API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/";

/// Default model for chat and suggestion calls.
const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Default cap on generated tokens per chat turn.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default bound on a single upstream call, streaming or not.
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Brand-voice system instruction sent with every chat turn.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the QB Tech Solutions assistant. \
QB Tech Solutions builds custom software, cloud integrations, and IT support \
plans for small and mid-sized businesses. Answer as a friendly, concise member \
of the QB team. Stay on topics related to QB Tech Solutions and its services; \
politely steer other conversations back. Use short paragraphs and plain text.";

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Credential for the upstream API. `None` means the operator has not
    /// configured one; the chat endpoint reports this as a server error.
    pub api_key: Option<String>,

    /// Base URL of the upstream API, trailing slash included.
    pub base_url: String,

    /// Model used for chat turns and suggestion generation.
    pub model: String,

    /// System instruction sent with every chat turn.
    pub system_prompt: String,

    /// Maximum tokens generated per chat turn.
    pub max_tokens: u32,

    /// Bound on any single upstream call.
    pub upstream_timeout: Duration,

    /// Address the relay listens on.
    pub bind_addr: String,

    /// Directory served for static assets.
    pub static_dir: PathBuf,

    /// Maximum suggestions returned per request.
    pub suggest_max: usize,
}

impl RelayConfig {
    /// Creates a configuration with built-in defaults and no credential.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            bind_addr: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("static"),
            suggest_max: 5,
        }
    }

    /// Loads configuration from the process environment and an optional
    /// credential file.
    pub fn load(credentials: Option<&Path>) -> Result<Self> {
        let file_values = match credentials {
            Some(path) => parse_credential_file(path)?,
            None => HashMap::new(),
        };

        let mut config = Self::new();
        config.api_key = resolve(API_KEY_VAR, &file_values);
        if let Some(base_url) = resolve(BASE_URL_VAR, &file_values) {
            config.base_url = ensure_trailing_slash(base_url);
        }
        if let Some(model) = resolve(MODEL_VAR, &file_values) {
            config.model = model;
        }
        Ok(config)
    }

    /// Sets the credential.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the upstream base URL. A missing trailing slash is added so
    /// endpoint paths join cleanly.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = ensure_trailing_slash(base_url.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the max tokens per chat turn.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the upstream call timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Sets the listen address.
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    /// Sets the static asset directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Upstream endpoint paths are joined by concatenation; the base URL must
/// end with a slash for that to work.
fn ensure_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Resolves one setting: environment beats file, file beats nothing.
fn resolve(key: &str, file_values: &HashMap<String, String>) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| file_values.get(key).cloned())
}

/// Parses a credential file of `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped; values may be wrapped in
/// single or double quotes. Lines without `=` are a configuration error so
/// typos fail loudly at startup rather than silently dropping a credential.
fn parse_credential_file(path: &Path) -> Result<HashMap<String, String>> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::io(format!("failed to read credential file {}", path.display()), err)
    })?;

    let mut values = HashMap::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::configuration(format!(
                "credential file {}:{} is not KEY=VALUE",
                path.display(),
                lineno + 1
            )));
        };
        values.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    Ok(values)
}

/// Strips one layer of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = RelayConfig::new();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.suggest_max, 5);
        assert!(config.system_prompt.contains("QB Tech Solutions"));
    }

    #[test]
    fn builder_pattern() {
        let config = RelayConfig::new()
            .with_api_key("sk-test")
            .with_base_url("https://proxy.internal/v1/")
            .with_model("qb-large")
            .with_system_prompt("Be terse.")
            .with_max_tokens(64)
            .with_upstream_timeout(Duration::from_secs(5))
            .with_bind_addr("127.0.0.1:8080")
            .with_static_dir("/srv/widget");

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "https://proxy.internal/v1/");
        assert_eq!(config.model, "qb-large");
        assert_eq!(config.system_prompt, "Be terse.");
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.static_dir, PathBuf::from("/srv/widget"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = RelayConfig::new().with_base_url("https://proxy.internal/v1");
        assert_eq!(config.base_url, "https://proxy.internal/v1/");
        let config = RelayConfig::new().with_base_url("https://proxy.internal/v1/");
        assert_eq!(config.base_url, "https://proxy.internal/v1/");
    }

    #[test]
    fn env_value_wins_over_file_value() {
        let mut file_values = HashMap::new();
        file_values.insert("QBCHAT_TEST_ONLY".to_string(), "from-file".to_string());

        // SAFETY: test-local variable name, not read anywhere else.
        unsafe { env::set_var("QBCHAT_TEST_ONLY", "from-env") };
        assert_eq!(
            resolve("QBCHAT_TEST_ONLY", &file_values).as_deref(),
            Some("from-env")
        );
        unsafe { env::remove_var("QBCHAT_TEST_ONLY") };
        assert_eq!(
            resolve("QBCHAT_TEST_ONLY", &file_values).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn credential_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# QB widget credentials").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "QBCHAT_API_KEY=\"sk-from-file\"").unwrap();
        writeln!(file, "QBCHAT_MODEL = qb-small").unwrap();

        let values = parse_credential_file(file.path()).unwrap();
        assert_eq!(values.get("QBCHAT_API_KEY").map(String::as_str), Some("sk-from-file"));
        assert_eq!(values.get("QBCHAT_MODEL").map(String::as_str), Some("qb-small"));
    }

    #[test]
    fn malformed_credential_line_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "QBCHAT_API_KEY sk-no-equals").unwrap();

        let err = parse_credential_file(file.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_credential_file_is_an_io_error() {
        let err = parse_credential_file(Path::new("/nonexistent/qbchat.env")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn unquote_strips_matching_quotes_only() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\""), "\"");
    }
}
