use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ------------------------------------------ General Error API ------------------------------------------
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,                   // Human readable message.
    pub kind: String,                    // Error category, e.g. submission or polling_timeout.
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,          // Upstream status/body or job information, when available.
}
