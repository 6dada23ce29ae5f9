use actix_web::{web, App, HttpServer};
use actix_cors::Cors;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use std::{fs::File, io::BufReader};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod apis;
mod configs;
mod cores;
mod errors;
mod middleware;
mod utils;

use crate::apis::api_doc::ApiDoc;
use crate::configs::settings::Config;
use crate::cores::state::AppState;
use crate::middleware::access_log::AccessLog;
use crate::middleware::api_key::ApiKeyCheck;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::utils::log::init_logging;

#[cfg(test)]
mod test;

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn load_tls_config(cert_path: &str, key_path: &str) -> std::io::Result<rustls::ServerConfig> {
    let mut certs_file = BufReader::new(File::open(cert_path)?);
    let mut key_file = BufReader::new(File::open(key_path)?);

    let tls_certs = rustls_pemfile::certs(&mut certs_file).collect::<Result<Vec<_>, _>>()?;
    let tls_key = rustls_pemfile::private_key(&mut key_file)?
        .ok_or_else(|| io_error("TLS setup failed", format!("no private key found in {}", key_path)))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(tls_certs, tls_key)
        .map_err(|e| io_error("TLS setup failed", e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::load().map_err(|e| io_error("Config load failed", e))?;
    init_logging().map_err(|e| io_error("Logger setup failed", e))?;

    let host = config.host.clone();
    let port = config.port;
    let tls = match (&config.server_cert_file, &config.key_file) {
        (Some(cert), Some(key)) => Some(load_tls_config(cert, key)?),
        _ => None,
    };

    let rate_limiter = RateLimitMiddleware::new(
        config.rate_limit_enabled,
        config.rate_limit_tps,
        config.rate_limit_bucket_capacity,
        Duration::from_millis(config.rate_limit_refill_interval),
    );
    let access_keys = Arc::new(config.access_keys.clone());
    let max_upload_bytes = config.max_upload_bytes;
    info!("Saving generated images under {}", config.output_dir);

    let state = web::Data::new(AppState::new(config).map_err(|e| io_error("State setup failed", e))?);

    // Start the HTTP server
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Content-Type", "Authorization", "User-Agent"])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(apis::json_config())
            .app_data(apis::multipart_config(max_upload_bytes))
            .wrap(ApiKeyCheck::new(access_keys.clone()))
            .wrap(rate_limiter.clone())
            .wrap(cors)
            .wrap(AccessLog)
            .configure(apis::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
    });

    let server = match tls {
        Some(tls_config) => {
            info!("Starting server on https://{}:{}", host, port);
            server.bind_rustls_0_23((host.as_str(), port), tls_config)?
        }
        None => {
            info!("Starting server on http://{}:{}", host, port);
            server.bind((host.as_str(), port))?
        }
    };
    server.run().await
}
