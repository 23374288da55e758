use anyhow::{bail, Context};
use serde::Deserialize;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which backing store the services run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV").unwrap_or_else(|| "development".into());
        let production = environment.eq_ignore_ascii_case("production");

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let store = match lookup("STORE").map(|v| v.to_lowercase()).as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres,
            Some(other) => bail!("unknown STORE backend: {other}"),
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if store == StoreBackend::Postgres && database_url.is_none() {
            bail!("STORE=postgres requires DATABASE_URL");
        }

        let secret = match lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None if production => bail!("JWT_SECRET must be set when APP_ENV=production"),
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "classroom".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "classroom-users".into()),
            ttl_minutes: lookup("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(120),
        };

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().context("parse DATABASE_MAX_CONNECTIONS")?,
            None => 10,
        };

        let seed_demo_data = lookup("SEED_DEMO_DATA")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            environment,
            store,
            database_url,
            database_max_connections,
            jwt,
            seed_demo_data,
        })
    }
}
