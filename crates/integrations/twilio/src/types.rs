use serde::{Deserialize, Serialize};

/// Form body for the Messages API.
#[derive(Debug, Serialize)]
pub(crate) struct TwilioSendMessageRequest {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// Relevant slice of the Messages API response.
#[derive(Debug, Deserialize)]
pub(crate) struct TwilioApiResponse {
    pub sid: Option<String>,
    pub status: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}
