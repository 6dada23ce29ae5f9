use actix_web::HttpRequest;
use chrono::Local;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

// Initialize log4rs from a yaml file, or fall back to a console-only setup
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("IMGGATE_LOG_CONFIG")
        .unwrap_or_else(|_| format!("{}/src/configs/log4rs.yaml", env!("CARGO_MANIFEST_DIR")));

    if Path::new(&config_path).exists() {
        log4rs::init_file(&config_path, Default::default()).map_err(|e| e.to_string())?;
        return Ok(());
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

// Function for access log and error log lines
pub fn format_request_line(
    req: &HttpRequest,
    status_code: u16,
    error_message: Option<&str>,
) -> String {
    let referer = req.headers()
        .get("Referer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    let user_agent = req.headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let client_ip = req.peer_addr().map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string());
    let http_version = format!("{:?}", req.version());

    let line = format!(
        "{client_ip} - - [{time}] \"{method} {uri} {http_version}\" {status_code} \"{referer}\" \"{user_agent}\"",
        client_ip = client_ip,
        time = Local::now().format("%d/%b/%Y:%H:%M:%S %z"),
        method = req.method().as_str(),
        uri = req.uri(),
        http_version = http_version,
        status_code = status_code,
        referer = referer,
        user_agent = user_agent,
    );

    match error_message {
        Some(msg) => format!("{} \"{}\"", line, msg),
        None => line,
    }
}
