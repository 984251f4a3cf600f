use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// OAuth client used for both Calendar and Gmail.
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub environment: Environment,
    pub send_real_emails: bool,
    pub google: Option<GoogleCredentials>,
    pub google_calendar_id: String,
    pub meeting_url_base: String,
    pub log_format: LogFormat,
    pub default_interview_minutes: i32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let default_interview_minutes: i32 =
            get_env_parse_or("DEFAULT_INTERVIEW_MINUTES", 60)?;
        if default_interview_minutes <= 0 {
            return Err(Error::Config(
                "DEFAULT_INTERVIEW_MINUTES must be positive".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            environment: get_env_parse_or("APP_ENV", Environment::Development)?,
            send_real_emails: get_env_parse_or("SEND_REAL_EMAILS", false)?,
            google: google_credentials()?,
            google_calendar_id: get_env_opt("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|| "primary".to_string()),
            meeting_url_base: get_env_opt("MEETING_URL_BASE")
                .unwrap_or_else(|| "https://meet.google.com".to_string()),
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Pretty)?,
            default_interview_minutes,
        })
    }
}

fn google_credentials() -> Result<Option<GoogleCredentials>> {
    let client_id = get_env_opt("GOOGLE_CLIENT_ID");
    let client_secret = get_env_opt("GOOGLE_CLIENT_SECRET");
    let refresh_token = get_env_opt("GOOGLE_REFRESH_TOKEN");
    match (client_id, client_secret, refresh_token) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => {
            Ok(Some(GoogleCredentials {
                client_id,
                client_secret,
                refresh_token,
            }))
        }
        (None, None, None) => Ok(None),
        _ => Err(Error::Config(
            "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN must be set together"
                .to_string(),
        )),
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
