mod api;
mod dao;
mod integration;
mod model;
mod service;

use std::fs::OpenOptions;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::endpoints::configure;
use crate::api::middleware::timing_middleware;
use crate::api::security::JwtSecurityService;
use crate::api::state::AppState;
use crate::dao::{admin_type::AdminTypeDao, annual_report::AnnualReportDao, city::CityDao, club::ClubDao, document::DocumentDao, event::EventDao, user::UserDao};
use crate::integration::blobstorage::FileSystemBlobStorage;
use crate::integration::email::SmtpEmailSender;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{AppSecurity, ApplicationArguments, Config, DatabaseType, HttpsConfig, LoggingConfig, SecretType};
use crate::service::{
    access::AccessService, annual_report::AnnualReportService, city::CityService, city_participants::CityParticipantsService, club::ClubService, club_participants::ClubParticipantsService,
    documents::DocumentsService, event::EventService, notification::NotificationService, user::UserService,
};

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use rustls::pki_types::PrivateKeyDer;
use rustls::{ServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, pkcs8_private_keys};
use sqlx::{Pool, Postgres, pool};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    // Dropping the guard stops the file writer.
    let _log_guard = init_tracing(&config.logging)?;

    let connection_pool: Pool<Postgres> = match config.database.db_type.clone() {
        DatabaseType::Postgresql { connection_string, max_connections, min_connections, acquire_timeout, acquire_slow_threshold, idle_timeout, max_lifetime } => pool::PoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_millis(acquire_timeout))
            .acquire_slow_threshold(Duration::from_millis(acquire_slow_threshold))
            .idle_timeout(Duration::from_millis(idle_timeout))
            .max_lifetime(Duration::from_millis(max_lifetime))
            .connect(connection_string.as_str())
            .await
            .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?,
    };

    let state = web::Data::new(get_app_state(&config, &connection_pool)?);

    let prometheus = PrometheusMetricsBuilder::new("")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    let max_connections_gauge = IntGauge::new("max_connections", "Connection pool maximum").map_err(|err| std::io::Error::other(format!("Failed to create max_connections gauge: {err}")))?;
    let min_connections_gauge = IntGauge::new("min_connections", "Connection pool minimum").map_err(|err| std::io::Error::other(format!("Failed to create min_connections gauge: {err}")))?;
    let active_connections_gauge = IntGauge::new("active_connections", "Connection pool active").map_err(|err| std::io::Error::other(format!("Failed to create active_connections gauge: {err}")))?;
    let idle_connections_gauge = IntGauge::new("idle_connections", "Connection pool idle").map_err(|err| std::io::Error::other(format!("Failed to create idle_connections gauge: {err}")))?;
    register_prometheus_metric(&prometheus, &max_connections_gauge)?;
    register_prometheus_metric(&prometheus, &min_connections_gauge)?;
    register_prometheus_metric(&prometheus, &active_connections_gauge)?;
    register_prometheus_metric(&prometheus, &idle_connections_gauge)?;

    gather_db_metrics(max_connections_gauge, min_connections_gauge, active_connections_gauge, idle_connections_gauge, connection_pool);

    let server_init = HttpServer::new(move || App::new().wrap(prometheus.clone()).wrap(from_fn(timing_middleware)).app_data(state.clone()).configure(configure));

    let host = config.server.host.as_str();
    let server_init = if let Some(http_port) = config.server.http_port { server_init.bind((host, http_port))? } else { server_init };
    let server_init = if let Some(https_config) = &config.server.https_config {
        let ssl_builder = ssl_builder(https_config).map_err(|err| std::io::Error::other(format!("Failed to create SSL/TLS configuration: {err}")))?;
        server_init.bind_rustls_0_23((host, https_config.port), ssl_builder).map_err(|err| std::io::Error::other(format!("Failed to bind HTTPS server: {err}")))?
    } else {
        server_init
    };

    tracing::info!("Membership api starting with {} workers", config.server.workers);
    server_init.workers(config.server.workers).run().await
}

/**
 * Initializes structured logging to stdout, or to the configured log file.
 *
 * #Returns
 * The guard of the file writer when logging to file. It must live as long as the application.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>, std::io::Error> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.directives {
        filter = filter.add_directive(directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }
    let (stdout_layer, file_layer, guard) = match &logging.logfile {
        Some(logfile) => {
            let file = OpenOptions::new().create(true).append(true).open(logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {logfile}: {err}")))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (None, Some(fmt_layer(logging).with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (Some(fmt_layer(logging).with_ansi(logging.ansi)), None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| std::io::Error::other(format!("Failed to initialize logging: {err}")))?;
    Ok(guard)
}

fn fmt_layer<S>(logging: &LoggingConfig) -> tracing_subscriber::fmt::Layer<S> {
    tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_file(logging.file)
}

/**
 * Wires daos, integrations and services into the shared application state.
 */
fn get_app_state(config: &Config, connection_pool: &Pool<Postgres>) -> Result<AppState, std::io::Error> {
    let jwt_service = get_security_service(&config.security)?;
    let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
    let blob_storage = Arc::new(FileSystemBlobStorage::new(&config.blob_storage.root_dir));
    let email_sender = Arc::new(SmtpEmailSender::new(&config.email).map_err(|err| std::io::Error::other(format!("Failed to create email sender: {err}")))?);
    let pool = Some(connection_pool.clone());
    Ok(AppState {
        jwt_service,
        annual_report_service: AnnualReportService::new(AnnualReportDao::new(), CityDao::new(), access_service.clone(), pool.clone()),
        city_service: CityService::new(CityDao::new(), access_service.clone(), pool.clone()),
        city_participants_service: CityParticipantsService::new(CityDao::new(), AdminTypeDao::new(), access_service.clone(), pool.clone()),
        club_service: ClubService::new(ClubDao::new(), access_service.clone(), pool.clone()),
        club_participants_service: ClubParticipantsService::new(ClubDao::new(), AdminTypeDao::new(), UserDao::new(), access_service.clone(), pool.clone()),
        documents_service: DocumentsService::new(DocumentDao::new(), blob_storage, access_service.clone(), pool.clone()),
        event_service: EventService::new(EventDao::new(), access_service.clone(), pool.clone()),
        user_service: UserService::new(UserDao::new(), access_service, pool),
        notification_service: NotificationService::new(email_sender, config.email.base_url.clone()),
    })
}

/**
 * Registers a custom gauge with the Prometheus registry.
 */
fn register_prometheus_metric(prometheus_metrics: &PrometheusMetrics, gauge: &IntGauge) -> Result<(), std::io::Error> {
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge: {err}")))
}

/**
 * Samples the connection pool every second in a separate thread.
 */
fn gather_db_metrics(max_connections_gauge: IntGauge, min_connections_gauge: IntGauge, active_connections_gauge: IntGauge, idle_connections_gauge: IntGauge, connection_pool: Pool<Postgres>) {
    thread::spawn(move || {
        loop {
            max_connections_gauge.set(i64::from(connection_pool.options().get_max_connections()));
            min_connections_gauge.set(i64::from(connection_pool.options().get_min_connections()));
            active_connections_gauge.set(i64::from(connection_pool.size()));
            #[allow(clippy::cast_possible_wrap)]
            idle_connections_gauge.set(connection_pool.num_idle() as i64);
            thread::sleep(Duration::from_secs(1));
        }
    });
}

/**
 * Builds the rustls server configuration from the certificate and the pkcs8 private key.
 */
fn ssl_builder(https_config: &HttpsConfig) -> Result<ServerConfig, ApplicationError> {
    let config_builder = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
        .with_protocol_versions(&get_protocol_versions())
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to select protocol versions: {err}")))?;
    let cert_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.certificate_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read certificate file: {err}")))?,
    );
    let key_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?,
    );
    let cert_chain = certs(cert_file).collect::<Result<Vec<_>, _>>().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert certificate to der: {err}")))?;
    let key = pkcs8_private_keys(key_file)
        .next()
        .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "No private key found".to_string()))?
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert private key to der: {err}")))?;
    config_builder
        .with_no_client_auth()
        .with_single_cert(cert_chain, PrivateKeyDer::Pkcs8(key))
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create server config: {err}")))
}

fn get_protocol_versions() -> Vec<&'static SupportedProtocolVersion> {
    vec![&rustls::version::TLS13]
}

/**
 * Reads the toml configuration file.
 */
fn get_config(config_file: &str) -> Result<Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))
}

/**
 * Creates the JWT verifier from a public key file or a shared secret.
 */
fn get_security_service(app_security: &AppSecurity) -> Result<JwtSecurityService, std::io::Error> {
    let key = match &app_security.key {
        SecretType::PublicKeyFile { path } => std::fs::read_to_string(path).map_err(|err| std::io::Error::other(format!("Failed to read public key file: {err}")))?,
        SecretType::SharedSecret { secret } => secret.clone(),
    };
    JwtSecurityService::new(&key, &app_security.algorithm).map_err(|err| std::io::Error::other(format!("Failed to create JWT service: {err}")))
}
