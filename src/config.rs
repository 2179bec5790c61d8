//! Environment configuration. `.env` is loaded by `main` before `Config::from_env`.

use std::net::SocketAddr;

const DEV_JWT_SECRET: &str = "dev-secret-key";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_WS_SEND_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Postgres URL. Without it messages live in process memory.
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    /// Require a signed token in WebSocket `auth` frames.
    pub ws_verify_identity: bool,
    /// Outbound frames queued per connection before pushes are dropped.
    pub ws_send_buffer: usize,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr: SocketAddr = bind_raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let jwt_secret = get("JWT_SECRET")
            .map(String::into_bytes)
            .unwrap_or_else(|| DEV_JWT_SECRET.as_bytes().to_vec());

        let ws_send_buffer = match get("WS_SEND_BUFFER") {
            None => DEFAULT_WS_SEND_BUFFER,
            Some(v) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "WS_SEND_BUFFER",
                        value: v,
                    })
                }
            },
        };

        Ok(Config {
            bind_addr,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            ws_verify_identity: parse_flag("WS_VERIFY_IDENTITY", get("WS_VERIFY_IDENTITY"))?,
            ws_send_buffer,
            log_json: parse_flag("LOG_JSON", get("LOG_JSON"))?,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET.as_bytes()
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            name,
            value: value.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap());
        assert!(c.database_url.is_none());
        assert!(c.uses_dev_secret());
        assert!(!c.ws_verify_identity);
        assert_eq!(c.ws_send_buffer, DEFAULT_WS_SEND_BUFFER);
        assert!(!c.log_json);
    }

    #[test]
    fn reads_overrides() {
        let c = config(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/social"),
            ("JWT_SECRET", "s3cret"),
            ("WS_VERIFY_IDENTITY", "true"),
            ("WS_SEND_BUFFER", "8"),
            ("LOG_JSON", "1"),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.database_url.as_deref(), Some("postgres://localhost/social"));
        assert_eq!(c.jwt_secret, b"s3cret");
        assert!(c.ws_verify_identity);
        assert_eq!(c.ws_send_buffer, 8);
        assert!(c.log_json);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("WS_SEND_BUFFER", "0")]).is_err());
        assert!(config(&[("WS_VERIFY_IDENTITY", "maybe")]).is_err());
    }

    #[test]
    fn blank_database_url_means_memory() {
        let c = config(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(c.database_url.is_none());
    }
}
