use anyhow::{anyhow, Context};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub channel_access_token: String,
    pub channel_secret: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub register_on_follow: bool,
    pub line_api_base_url: String,
    pub line_api_timeout: Duration,
    pub max_db_connections: u32,
    pub log_dir: PathBuf,
}

// Secrets stay out of startup logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("register_on_follow", &self.register_on_follow)
            .field("line_api_base_url", &self.line_api_base_url)
            .field("line_api_timeout", &self.line_api_timeout)
            .field("max_db_connections", &self.max_db_connections)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("Missing required environment variable {}", key))
        };

        let channel_access_token = required("YOUR_CHANNEL_ACCESS_TOKEN")?;
        let channel_secret = required("YOUR_CHANNEL_SECRET")?;
        let database_url = required("DATABASE_URL")?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            None => 5000,
        };

        let register_on_follow = lookup("REGISTER_ON_FOLLOW")
            .map(|v| parse_flag(&v))
            .transpose()?
            .unwrap_or(false);

        let line_api_base_url = lookup("LINE_API_BASE_URL")
            .unwrap_or_else(|| "https://api.line.me".to_string())
            .trim_end_matches('/')
            .to_string();

        let line_api_timeout_secs: u64 =
            parse_positive("LINE_API_TIMEOUT_SECS", lookup("LINE_API_TIMEOUT_SECS"), 10)?;

        let max_db_connections: u32 =
            parse_positive("MAX_DB_CONNECTIONS", lookup("MAX_DB_CONNECTIONS"), 10)?;

        let log_dir = lookup("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./logs"));

        Ok(Config {
            channel_access_token,
            channel_secret,
            database_url,
            host,
            port,
            register_on_follow,
            line_api_base_url,
            line_api_timeout: Duration::from_secs(line_api_timeout_secs),
            max_db_connections,
            log_dir,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| anyhow!("Invalid socket address: {}", e))
    }
}

/// Parse a non-zero count, falling back to `default` when unset.
fn parse_positive<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialEq + From<u8>,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}: {}", key, raw))?;

    if value == T::from(0) {
        return Err(anyhow!("{} must be greater than zero", key));
    }

    Ok(value)
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("Invalid boolean flag: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("YOUR_CHANNEL_ACCESS_TOKEN", "token"),
        ("YOUR_CHANNEL_SECRET", "secret"),
        ("DATABASE_URL", "postgres://bot:pw@localhost:5432/bot"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.register_on_follow);
        assert_eq!(config.line_api_base_url, "https://api.line.me");
        assert_eq!(config.line_api_timeout, Duration::from_secs(10));
        assert_eq!(config.socket_addr().unwrap().port(), 5000);
    }

    #[test]
    fn test_missing_required() {
        for skipped in REQUIRED.iter().map(|(k, _)| *k) {
            let pairs: Vec<(&str, &str)> = REQUIRED
                .iter()
                .copied()
                .filter(|(k, _)| *k != skipped)
                .collect();
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(err.to_string().contains(skipped));
        }
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "8080"));
        pairs.push(("REGISTER_ON_FOLLOW", "true"));
        pairs.push(("LINE_API_BASE_URL", "http://localhost:9999/"));

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.register_on_follow);
        assert_eq!(config.line_api_base_url, "http://localhost:9999");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REGISTER_ON_FOLLOW", "maybe"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        for (key, value) in [
            ("LINE_API_TIMEOUT_SECS", "0"),
            ("LINE_API_TIMEOUT_SECS", "ten"),
            ("MAX_DB_CONNECTIONS", "0"),
            ("MAX_DB_CONNECTIONS", "ten"),
            ("MAX_DB_CONNECTIONS", "-1"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(err.to_string().contains(key), "{}={} accepted", key, value);
        }
    }

    #[test]
    fn test_counts_override() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LINE_API_TIMEOUT_SECS", "30"));
        pairs.push(("MAX_DB_CONNECTIONS", " 4 "));

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.line_api_timeout, Duration::from_secs(30));
        assert_eq!(config.max_db_connections, 4);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("token"));
    }
}
