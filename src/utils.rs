use actix_web::http::header::HeaderMap;

pub mod log;

// Extract the bearer token from the Authorization header, empty when absent
pub fn bearer_token(headers: &HeaderMap) -> String {
    headers
        .get("Authorization")
        .and_then(|auth_header| auth_header.to_str().ok())
        .map(|auth_str| auth_str.trim_start_matches("Bearer ").trim().to_string())
        .unwrap_or_default()
}

// Check if the provided key is one of the configured gateway keys
pub fn check_access_key(headers: &HeaderMap, access_keys: &[String]) -> bool {
    let provided = bearer_token(headers);
    !provided.is_empty() && access_keys.iter().any(|key| key == &provided)
}
