use std::{env, fmt, net::SocketAddr};

use url::Url;

use super::server_bind_address;

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me/";
pub const DEFAULT_FORM_BASE_URL: &str = "https://form.jotform.com/your-form-id";
pub const DEFAULT_FORM_USER_PARAM: &str = "lineUserId";
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "ขอบคุณสำหรับการชำระเงิน! กรุณากรอกแบบฟอร์มเพิ่มเติมที่ลิงก์นี้: {url}";
pub const DEFAULT_POSTBACK_MARKER: &str = "payment_success";

const DEFAULT_PAYMENT_KEYWORDS: &[&str] = &["ชำระเงิน", "payment"];
const DEFAULT_SUCCESS_KEYWORDS: &[&str] = &["สำเร็จ", "เรียบร้อย", "success"];

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Deployment strictness for the webhook endpoint.
///
/// `Strict` requires a valid `x-line-signature` on every webhook request and
/// rejects envelopes with no event or no user id with a 400. `Lenient` skips
/// signature verification and acknowledges everything with a 200, matching
/// the diagnostic deployments of the original service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Strict,
    Lenient,
}

impl RelayMode {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub mode: RelayMode,
    /// Bearer token for the Messaging API. Absence is not fatal: delivery
    /// calls fail cleanly and `/diag/verify-token` reports the gap.
    pub channel_access_token: Option<String>,
    /// Shared secret for webhook signature verification.
    pub channel_secret: Option<String>,
    pub line_api_base: Url,
    pub form_base_url: Url,
    pub form_user_param: String,
    pub message_template: String,
    pub payment_keywords: Vec<String>,
    pub success_keywords: Vec<String>,
    pub postback_marker: String,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let mode_value = env::var("RELAY_MODE").unwrap_or_else(|_| "lenient".to_string());
        let mode = RelayMode::from_str(&mode_value)?;

        let channel_access_token = non_empty_var("LINE_CHANNEL_ACCESS_TOKEN");
        let channel_secret = non_empty_var("LINE_CHANNEL_SECRET");
        if mode.is_strict() && channel_secret.is_none() {
            return Err(ConfigError::MissingChannelSecret);
        }

        let line_api_base = url_var("LINE_API_BASE_URL", DEFAULT_LINE_API_BASE)?;
        let form_base_url = url_var("FORM_BASE_URL", DEFAULT_FORM_BASE_URL)?;
        let form_user_param = env::var("FORM_USER_PARAM")
            .unwrap_or_else(|_| DEFAULT_FORM_USER_PARAM.to_string());
        let message_template = env::var("MESSAGE_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_MESSAGE_TEMPLATE.to_string());

        let payment_keywords = keyword_var("PAYMENT_KEYWORDS", DEFAULT_PAYMENT_KEYWORDS);
        let success_keywords = keyword_var("SUCCESS_KEYWORDS", DEFAULT_SUCCESS_KEYWORDS);
        let postback_marker = env::var("POSTBACK_MARKER")
            .unwrap_or_else(|_| DEFAULT_POSTBACK_MARKER.to_string());

        Ok(Self {
            bind_addr,
            environment,
            mode,
            channel_access_token,
            channel_secret,
            line_api_base,
            form_base_url,
            form_user_param,
            message_template,
            payment_keywords,
            success_keywords,
            postback_marker,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn url_var(name: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|err| ConfigError::InvalidUrl { name, source: err })
}

fn keyword_var(name: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => defaults.iter().map(|word| word.to_string()).collect(),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidMode(String),
    BindAddress(std::net::AddrParseError),
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
    MissingChannelSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidMode(value) => write!(
                f,
                "RELAY_MODE must be 'strict' or 'lenient' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidUrl { name, source } => write!(f, "invalid {name} value: {source}"),
            Self::MissingChannelSecret => write!(
                f,
                "RELAY_MODE=strict requires LINE_CHANNEL_SECRET to be set"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
