//! Configuration types, built from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use lettre::Address;
use lettre::message::Mailbox;
use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
/// Room for a ~7.5 MB attachment once base64-encoded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (SMTPS).
    Tls,
    /// No encryption. Only for local relays.
    None,
}

impl TlsMode {
    /// Conventional port for this mode.
    pub fn default_port(self) -> u16 {
        match self {
            TlsMode::StartTls => 587,
            TlsMode::Tls => 465,
            TlsMode::None => 25,
        }
    }
}

impl FromStr for TlsMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(TlsMode::StartTls),
            "tls" => Ok(TlsMode::Tls),
            "none" => Ok(TlsMode::None),
            other => Err(ConfigError::InvalidValue {
                key: "SMTP_TLS".into(),
                message: format!("expected starttls, tls or none, got {other:?}"),
            }),
        }
    }
}

/// SMTP connection settings for the outbound transport.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    /// Login for the relay; `None` for unauthenticated relays.
    pub credentials: Option<SmtpCredentials>,
    /// Connection timeout handed to lettre.
    pub timeout: Duration,
}

/// SMTP login. The password is only exposed when handed to lettre.
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Relay service configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Largest accepted request body, attachment included.
    pub max_body_bytes: usize,
    /// Sender address put on every outgoing message.
    pub from_address: String,
    /// Optional display name for the sender.
    pub from_name: Option<String>,
    pub smtp: SmtpConfig,
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Username and password come as a pair or not at all.
        let credentials = match (get("EMAIL_USER"), get("EMAIL_PASS")) {
            (Some(username), Some(password)) => Some(SmtpCredentials {
                username,
                password: SecretString::from(password),
            }),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("EMAIL_PASS".into())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("EMAIL_USER".into())),
            (None, None) => None,
        };

        let from_address = get("EMAIL_FROM")
            .or_else(|| credentials.as_ref().map(|c| c.username.clone()))
            .ok_or_else(|| ConfigError::MissingEnvVar("EMAIL_FROM".into()))?;

        let tls = match get("SMTP_TLS") {
            Some(raw) => raw.parse()?,
            None => TlsMode::default(),
        };

        let smtp = SmtpConfig {
            host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: parse_or("SMTP_PORT", get("SMTP_PORT"), tls.default_port())?,
            tls,
            credentials,
            timeout: Duration::from_secs(parse_or(
                "SMTP_TIMEOUT_SECS",
                get("SMTP_TIMEOUT_SECS"),
                DEFAULT_SMTP_TIMEOUT_SECS,
            )?),
        };

        let config = Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            max_body_bytes: parse_or(
                "MAX_BODY_BYTES",
                get("MAX_BODY_BYTES"),
                DEFAULT_MAX_BODY_BYTES,
            )?,
            from_address,
            from_name: get("EMAIL_FROM_NAME"),
            smtp,
        };

        // Fail at startup rather than on the first request.
        config.sender()?;
        Ok(config)
    }

    /// Socket address the HTTP server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// The sender mailbox, with display name when configured.
    pub fn sender(&self) -> Result<Mailbox, ConfigError> {
        let address: Address =
            self.from_address
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "EMAIL_FROM".into(),
                    message: format!("{e}"),
                })?;
        Ok(Mailbox::new(self.from_name.clone(), address))
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("{value:?}: {e}"),
        }),
        None => Ok(default),
    }
}
