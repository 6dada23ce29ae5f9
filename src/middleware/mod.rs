pub mod access_log;
pub mod api_key;
pub mod rate_limit;
