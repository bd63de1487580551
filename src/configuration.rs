//! Service settings: `configuration.yaml` overlaid with `APP_*` variables.

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub hashing: HashingSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

impl DatabaseSettings {
    /// Server-level options, used to create per-test databases.
    pub fn without_db(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Token signing settings
///
/// The access-token lifetime is fixed (see `auth::ACCESS_TOKEN_TTL_SECS`);
/// only the refresh-token lifetime is tunable.
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    /// Seconds a stored refresh-token hash stays usable
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// The bcrypt cost must stay stable for the lifetime of stored hashes.
#[derive(Deserialize, Clone, Debug)]
pub struct HashingSettings {
    pub bcrypt_cost: u32,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: crate::auth::BCRYPT_COST,
        }
    }
}

fn default_refresh_token_expiry() -> i64 {
    7 * 24 * 60 * 60
}

/// Read `configuration.yaml` (optional), then `APP_*` environment overrides,
/// e.g. `APP_JWT__SECRET=...` or `APP_DATABASE__HOST=db`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()
}
