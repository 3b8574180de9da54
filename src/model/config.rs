use clap::{Parser, command};
use serde::{Deserialize, Serialize};

/**
 * Command line of the server binary.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Toml file holding the `Config`.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Server configuration, read from toml with camelCase keys.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub logging: LoggingConfig,
    pub security: AppSecurity,
    pub server: Server,
    pub database: Database,
    pub blob_storage: BlobStorageConfig,
    pub email: EmailConfig,
}

/**
 * Output flags of the fmt layer. `directives` are added to the `RUST_LOG` filter, e.g.
 * `performance=debug` to see request timings.
 */
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub target: bool,
    pub thread_ids: bool,
    pub thread_names: bool,
    pub line_number: bool,
    pub level: bool,
    /**
     * Colored output on stdout. Ignored when writing to `logfile`.
     */
    pub ansi: bool,
    /**
     * Include the source file of the event.
     */
    pub file: bool,
    /**
     * Log file to append to instead of stdout.
     */
    pub logfile: Option<String>,
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig {
            target: true,
            thread_ids: true,
            thread_names: true,
            line_number: true,
            level: true,
            ansi: true,
            file: true,
            logfile: Some("/tmp/membership_api.log".to_string()),
            directives: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub db_type: DatabaseType,
}

/**
 * Connection pool settings. Durations are in milliseconds.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    #[serde(rename_all = "camelCase")]
    Postgresql { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, acquire_slow_threshold: u64, idle_timeout: u64, max_lifetime: u64 },
}

/**
 * JWT verification settings.
 */
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppSecurity {
    /**
     * Algorithm used to sign tokens, e.g. RS256 or HS256.
     */
    pub algorithm: String,
    pub key: SecretType,
}

/**
 * Where the verification key comes from.
 */
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub enum SecretType {
    /**
     * PEM file with the public key for RS, PS, ES and EdDSA tokens.
     */
    #[serde(rename_all = "camelCase")]
    PublicKeyFile { path: String },
    /**
     * Secret for HS tokens.
     */
    #[serde(rename_all = "camelCase")]
    SharedSecret { secret: String },
}

/**
 * Listeners of the http server. Either port may be left out.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub workers: usize,
    /**
     * Address both listeners bind to.
     */
    pub host: String,
    pub http_port: Option<u16>,
    pub https_config: Option<HttpsConfig>,
}

/**
 * TLS 1.3 listener. The private key must be pkcs8 PEM.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    pub port: u16,
    pub certificate_file: String,
    pub private_key_file: String,
}

/**
 * Filesystem backed blob storage.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobStorageConfig {
    /**
     * Root directory. Each container is a sub directory.
     */
    pub root_dir: String,
}

/**
 * SMTP relay settings.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /**
     * Sender mailbox, e.g. `Membership <noreply@example.org>`.
     */
    pub from: String,
    /**
     * Use TLS towards the relay. Disable only for local test relays.
     */
    pub tls: bool,
    /**
     * Public base url of the web client, used in links sent by email.
     */
    pub base_url: String,
}
