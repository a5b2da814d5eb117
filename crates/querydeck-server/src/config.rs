use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub page_size: u32,
    pub email_domain: String,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let jwt_secret = var("QUERYDECK_JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("QUERYDECK_JWT_SECRET not set, using the development secret");
        }

        let port = var("QUERYDECK_PORT", "3000")
            .parse()
            .context("QUERYDECK_PORT must be a port number")?;

        let page_size: u32 = var("QUERYDECK_PAGE_SIZE", "10")
            .parse()
            .context("QUERYDECK_PAGE_SIZE must be a positive integer")?;
        if page_size == 0 {
            bail!("QUERYDECK_PAGE_SIZE must be at least 1");
        }

        let session_ttl_hours: i64 = var("QUERYDECK_SESSION_TTL_HOURS", "720")
            .parse()
            .context("QUERYDECK_SESSION_TTL_HOURS must be an integer")?;
        if session_ttl_hours <= 0 {
            bail!("QUERYDECK_SESSION_TTL_HOURS must be positive");
        }

        Ok(Self {
            host: var("QUERYDECK_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("QUERYDECK_DB_PATH", "querydeck.db")),
            jwt_secret,
            page_size,
            email_domain: var("QUERYDECK_EMAIL_DOMAIN", "example.com"),
            session_ttl_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 3000);
        assert_eq!(c.page_size, 10);
        assert_eq!(c.email_domain, "example.com");
        assert_eq!(c.db_path, PathBuf::from("querydeck.db"));
    }

    #[test]
    fn overrides_and_bad_values() {
        let c = config(&[("QUERYDECK_PAGE_SIZE", "25"), ("QUERYDECK_PORT", "8080")]).unwrap();
        assert_eq!(c.page_size, 25);
        assert_eq!(c.port, 8080);

        assert!(config(&[("QUERYDECK_PAGE_SIZE", "0")]).is_err());
        assert!(config(&[("QUERYDECK_PORT", "http")]).is_err());
        assert!(config(&[("QUERYDECK_SESSION_TTL_HOURS", "-1")]).is_err());
    }
}
