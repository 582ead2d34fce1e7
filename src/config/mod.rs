//! Configuration management.
//!
//! A [`Config`] is built once at start-up and passed by reference to the
//! provider registry; adapters copy the credentials they need when they are
//! constructed.
//!
//! # Configuration File Format
//!
//! ```toml
//! [credentials]
//! email = "you@example.org"
//! repec_token = "your-repec-token"
//! dimensions_password = "secret"
//! # dimensions_username defaults to email
//! semantic_scholar_api_key = "optional"
//!
//! [browser]
//! webdriver_url = "http://localhost:9515"
//! chrome_exe_path = "/usr/bin/chromium"
//! headless = true
//!
//! [http]
//! timeout_seconds = 30
//! ```
//!
//! Every key can be overridden from the environment with the `RESOLVER_`
//! prefix and `__` as the section separator, e.g.
//! `RESOLVER_CREDENTIALS__REPEC_TOKEN`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sources::ProviderError;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "research-resolver.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Credentials for the providers that need them
    #[serde(default)]
    pub credentials: Credentials,

    /// Browser settings for SSRN
    #[serde(default)]
    pub browser: BrowserConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Provider credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Contact email (Unpaywall; Dimensions username fallback)
    #[serde(default = "default_email")]
    pub email: Option<String>,

    /// RePEc API access code
    #[serde(default = "default_repec_token")]
    pub repec_token: Option<String>,

    /// Dimensions account name; the email is used when unset
    #[serde(default = "default_dimensions_username")]
    pub dimensions_username: Option<String>,

    #[serde(default = "default_dimensions_password")]
    pub dimensions_password: Option<String>,

    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default = "default_semantic_scholar_api_key")]
    pub semantic_scholar_api_key: Option<String>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: default_email(),
            repec_token: default_repec_token(),
            dimensions_username: default_dimensions_username(),
            dimensions_password: default_dimensions_password(),
            semantic_scholar_api_key: default_semantic_scholar_api_key(),
        }
    }
}

// Fields missing from the file fall back to these variables
fn default_email() -> Option<String> {
    std::env::var("UNPAYWALL_EMAIL").ok()
}

fn default_repec_token() -> Option<String> {
    std::env::var("REPEC_TOKEN").ok()
}

fn default_dimensions_username() -> Option<String> {
    std::env::var("DIMENSIONS_USERNAME").ok()
}

fn default_dimensions_password() -> Option<String> {
    std::env::var("DIMENSIONS_PASSWORD").ok()
}

fn default_semantic_scholar_api_key() -> Option<String> {
    std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok()
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("repec_token", &redact(&self.repec_token))
            .field("dimensions_username", &self.dimensions_username)
            .field("dimensions_password", &redact(&self.dimensions_password))
            .field("semantic_scholar_api_key", &redact(&self.semantic_scholar_api_key))
            .finish()
    }
}

impl Credentials {
    /// Credentials with every value unset, ignoring the environment
    pub fn empty() -> Self {
        Self {
            email: None,
            repec_token: None,
            dimensions_username: None,
            dimensions_password: None,
            semantic_scholar_api_key: None,
        }
    }

    pub fn require_email(&self, provider: &str) -> Result<&str, ProviderError> {
        require(&self.email, provider, "credentials.email")
    }

    pub fn require_repec_token(&self, provider: &str) -> Result<&str, ProviderError> {
        require(&self.repec_token, provider, "credentials.repec_token")
    }

    /// Dimensions username and password
    pub fn require_dimensions(&self, provider: &str) -> Result<(&str, &str), ProviderError> {
        let username = match self.dimensions_username.as_deref() {
            Some(u) if !u.trim().is_empty() => u,
            _ => require(&self.email, provider, "credentials.dimensions_username")?,
        };
        let password = require(&self.dimensions_password, provider, "credentials.dimensions_password")?;
        Ok((username, password))
    }

    /// Copy with secrets replaced, for display
    pub fn redacted(&self) -> Self {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>".to_string());
        Self {
            email: self.email.clone(),
            repec_token: redact(&self.repec_token),
            dimensions_username: self.dimensions_username.clone(),
            dimensions_password: redact(&self.dimensions_password),
            semantic_scholar_api_key: redact(&self.semantic_scholar_api_key),
        }
    }
}

fn require<'a>(value: &'a Option<String>, provider: &str, key: &str) -> Result<&'a str, ProviderError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ProviderError::missing_credential(provider, key)),
    }
}

/// Browser configuration for providers driven through WebDriver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server endpoint
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Chrome/Chromium executable
    #[serde(default = "default_chrome_path")]
    pub chrome_exe_path: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            chrome_exe_path: default_chrome_path(),
            headless: true,
        }
    }
}

fn default_webdriver_url() -> String {
    std::env::var("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:9515".to_string())
}

fn default_chrome_path() -> Option<String> {
    std::env::var("CHROME_EXE_PATH").ok()
}

fn default_true() -> bool {
    true
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Load configuration from a file, layered with `RESOLVER_` environment variables
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("RESOLVER")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a configuration file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-resolver").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http.timeout_seconds, 30);
        assert!(config.browser.headless);
        assert!(config.http.user_agent.starts_with("research-resolver/"));
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("research-resolver.toml");

        let toml_content = r#"
[credentials]
email = "someone@example.org"
repec_token = "tok"
dimensions_password = "pw"

[browser]
webdriver_url = "http://127.0.0.1:4444"
chrome_exe_path = "/opt/chrome"
headless = false

[http]
timeout_seconds = 5
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.credentials.email.as_deref(), Some("someone@example.org"));
        assert_eq!(config.credentials.repec_token.as_deref(), Some("tok"));
        assert_eq!(config.browser.webdriver_url, "http://127.0.0.1:4444");
        assert_eq!(config.browser.chrome_exe_path.as_deref(), Some("/opt/chrome"));
        assert!(!config.browser.headless);
        assert_eq!(config.http.timeout_seconds, 5);
    }

    #[test]
    fn test_partial_credentials_table_uses_env_defaults() {
        std::env::set_var("SEMANTIC_SCHOLAR_API_KEY", "env-key");

        let dir = tempdir().unwrap();
        let path = dir.path().join("research-resolver.toml");
        std::fs::write(&path, "[credentials]\nemail = \"file@example.org\"\n").unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.credentials.email.as_deref(), Some("file@example.org"));
        assert_eq!(config.credentials.semantic_scholar_api_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Path::new("/nonexistent/research-resolver.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_dimensions_username_falls_back_to_email() {
        let mut creds = Credentials::empty();
        creds.email = Some("me@example.org".to_string());
        creds.dimensions_password = Some("pw".to_string());

        assert_eq!(creds.require_dimensions("dimensions").unwrap(), ("me@example.org", "pw"));
    }

    #[test]
    fn test_missing_credentials() {
        let creds = Credentials::empty();
        assert!(creds.require_email("unpaywall").unwrap_err().is_missing_credential());
        assert!(creds.require_repec_token("repec").unwrap_err().is_missing_credential());
        assert!(creds.require_dimensions("dimensions").is_err());

        let mut blank = Credentials::empty();
        blank.repec_token = Some("   ".to_string());
        assert!(blank.require_repec_token("repec").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut creds = Credentials::empty();
        creds.dimensions_password = Some("hunter2".to_string());
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
        assert_eq!(creds.redacted().dimensions_password.as_deref(), Some("<redacted>"));
    }
}
