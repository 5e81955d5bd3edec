use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BODY_LIMIT_MB: usize = 5;
const BYTES_PER_MB: usize = 1024 * 1024;
const DEFAULT_MODEL_PATH: &str = "./models/undertone_model.json";
const DEFAULT_RECOMMENDATIONS_PATH: &str = "./models/recommendations.json";

#[derive(Debug, Error, PartialEq)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub body_limit_mb: usize,
    pub model_path: PathBuf,
    pub recommendations_path: PathBuf,
    pub model_url: Option<String>,
    pub recommendations_url: Option<String>,
    pub upload_tmp_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = match get("HOST") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError {
                key: "HOST",
                value: v.clone(),
                reason: "must be an IP address",
            })?,
            None => DEFAULT_HOST.parse().map_err(|_| ConfigError {
                key: "HOST",
                value: DEFAULT_HOST.to_string(),
                reason: "must be an IP address",
            })?,
        };

        let port = match get("PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError {
                key: "PORT",
                value: v.clone(),
                reason: "must be a number between 0 and 65535",
            })?,
            None => DEFAULT_PORT,
        };

        let body_limit_mb = match get("BODY_LIMIT_MB") {
            Some(v) => {
                let mb = v.trim().parse::<usize>().map_err(|_| ConfigError {
                    key: "BODY_LIMIT_MB",
                    value: v.clone(),
                    reason: "must be a whole number of megabytes",
                })?;
                if mb.checked_mul(BYTES_PER_MB).is_none() {
                    return Err(ConfigError {
                        key: "BODY_LIMIT_MB",
                        value: v.clone(),
                        reason: "too large",
                    });
                }
                mb
            }
            None => DEFAULT_BODY_LIMIT_MB,
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "must be \"text\" or \"json\"",
                })
            }
        };

        Ok(Self {
            host,
            port,
            body_limit_mb,
            model_path: get("MODEL_PATH")
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.into())
                .into(),
            recommendations_path: get("RECOMMENDATIONS_PATH")
                .unwrap_or_else(|| DEFAULT_RECOMMENDATIONS_PATH.into())
                .into(),
            model_url: get("MODEL_URL"),
            recommendations_url: get("RECOMMENDATIONS_URL"),
            upload_tmp_dir: get("UPLOAD_TMP_DIR").map(PathBuf::from),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(BYTES_PER_MB)
    }
}
