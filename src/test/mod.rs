use std::path::Path;

use crate::configs::settings::Config;

mod mock_upstream;

// Config pointing at a temp output dir with fast polling.
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = output_dir.to_string_lossy().into_owned();
    config.poll_interval_ms = 10;
    config.submit_timeout_secs = 5;
    config.download_timeout_secs = 5;
    config
}

// Gateway app under test, wired the same way as main.
macro_rules! gateway {
    ($config:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(
                    crate::cores::state::AppState::new($config).unwrap(),
                ))
                .app_data(crate::apis::json_config())
                .app_data(crate::apis::multipart_config(10 * 1024 * 1024))
                .configure(crate::apis::configure),
        )
        .await
    };
}
pub(crate) use gateway;

pub const BOUNDARY: &str = "imggate-test-boundary";

// Hand-built multipart/form-data body: (name, filename, content type, data).
pub fn multipart_body(fields: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", name, filename).as_bytes(),
            ),
            None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes()),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
