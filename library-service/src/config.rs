use std::{
    collections::HashMap,
    env,
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::{
    Deserialize, Deserializer,
    de::{self, Visitor},
};

use crate::error::AppResult;

/// Application configuration.
///
/// Contains all configuration settings for the library service,
/// including server, database, migration, and tracing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Distribution metadata configuration
    pub distribution: DistributionConfig,
    /// Server configuration settings
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Schema migration settings
    pub migration: MigrationConfig,
    /// Tracing configuration
    pub tracing: TracingConfig,
}

/// Server configuration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// gRPC server port
    pub grpc_port: u16,
    /// HTTP gateway port
    pub gateway_port: u16,
}

/// Database configuration.
///
/// Supports either in-memory storage or `PostgreSQL` database.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum DatabaseConfig {
    /// In-memory database storage
    Memory,
    /// `PostgreSQL` database connection
    Postgres(PostgresConfig),
}

/// `PostgreSQL` database configuration.
///
/// Numeric fields accept strings as well, since values coming from the
/// environment reach the tagged enum unparsed.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    #[serde(
        default = "default_postgres_port",
        deserialize_with = "number_or_string"
    )]
    pub port: u16,
    #[serde(default = "default_postgres_name")]
    pub name: String,
    #[serde(default = "default_postgres_name")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(
        default = "default_max_connections",
        deserialize_with = "number_or_string"
    )]
    pub max_connections: usize,
    /// Seconds to wait for a connection to be established
    #[serde(
        default = "default_connect_timeout_secs",
        deserialize_with = "number_or_string"
    )]
    pub connect_timeout_secs: u64,
}

/// Schema migration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    /// Directory holding `<version>_<title>.up.sql` files
    pub path: PathBuf,
    /// Connection attempts before giving up
    pub attempts: u32,
    /// Delay between connection attempts
    pub retry_delay_ms: u64,
}

/// Tracing configuration.
///
/// Controls how tracing data is output from the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum TracingConfig {
    /// In-memory tracing (no output)
    Memory,
    /// Standard output tracing
    Stdout,
}

/// Distribution metadata configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionConfig {
    /// Distribution name
    pub name: String,
    /// Distribution version
    pub version: Option<String>,
}

const CONFIG_PATH_ENV: &str = "LIBRARY_CONFIG_PATH";
const ENV_PREFIX: &str = "LIBRARY";
const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const MIGRATIONS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

/// Plain environment variables of the service and the keys they set.
/// These take precedence over every other source.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("GRPC_PORT", "server.grpc_port"),
    ("GRPC_GATEWAY_PORT", "server.gateway_port"),
    ("POSTGRES_HOST", "database.host"),
    ("POSTGRES_PORT", "database.port"),
    ("POSTGRES_DB", "database.name"),
    ("POSTGRES_USER", "database.user"),
    ("POSTGRES_PASSWORD", "database.password"),
    ("POSTGRES_MAX_CONN", "database.max_connections"),
    ("MIGRATIONS_PATH", "migration.path"),
];

impl AppConfig {
    /// Loads configuration from files and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&env::vars().collect())
    }

    /// Loads configuration reading environment variables from `vars`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(vars: &HashMap<String, String>) -> AppResult<Self> {
        let config_path = vars
            .get(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from("config"), PathBuf::from);

        let mut config_builder = Config::builder()
            .set_default("distribution.name", NAME)?
            .set_default("distribution.version", VERSION)?
            .set_default("server.grpc_port", 9000)?
            .set_default("server.gateway_port", 8080)?
            .set_default("database.kind", "Memory")?
            .set_default("migration.path", MIGRATIONS_PATH)?
            .set_default("migration.attempts", 5)?
            .set_default("migration.retry_delay_ms", 1000)?
            .set_default("tracing.kind", "Stdout")?;

        // Initial "default" configuration file
        config_builder = config_builder.add_source(config_file(&config_path, "default"));

        // Add in a local configuration file
        // This file shouldn't be checked in to git
        config_builder = config_builder.add_source(config_file(&config_path, "local"));

        // Add in settings from the environment (with a prefix of LIBRARY)
        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(Some(vars.clone())),
        );

        for (var, key) in ENV_OVERRIDES {
            config_builder = config_builder.set_override_option(*key, vars.get(*var).cloned())?;
        }
        if vars.contains_key("POSTGRES_HOST") {
            config_builder = config_builder.set_override("database.kind", "Postgres")?;
        }

        Ok(config_builder.build()?.try_deserialize()?)
    }
}

impl ServerConfig {
    pub fn grpc_address(&self) -> SocketAddr {
        (Ipv4Addr::UNSPECIFIED, self.grpc_port).into()
    }

    pub fn gateway_address(&self) -> SocketAddr {
        (Ipv4Addr::UNSPECIFIED, self.gateway_port).into()
    }
}

impl PostgresConfig {
    /// Connection settings for a single `tokio-postgres` client.
    pub fn connect_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.name)
            .user(&self.user)
            .password(&self.password)
            .connect_timeout(self.connect_timeout())
            .application_name(NAME);
        config
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl MigrationConfig {
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn config_file(dir: &Path, name: &str) -> File<config::FileSourceFile, config::FileFormat> {
    File::from(dir.join(name)).required(false)
}

const fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_name() -> String {
    "postgres".into()
}

const fn default_max_connections() -> usize {
    16
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    struct NumberVisitor<T>(PhantomData<T>);

    impl<T> Visitor<'_> for NumberVisitor<T>
    where
        T: FromStr + TryFrom<u64> + TryFrom<i64>,
        <T as FromStr>::Err: Display,
    {
        type Value = T;

        fn expecting(&self, f: &mut Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
            T::try_from(value)
                .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
            T::try_from(value).map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
            value.trim().parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(NumberVisitor(PhantomData))
}
