/// Error type for Sheets API operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// HTTP client could not be constructed
    #[error("cannot build HTTP client: {0}")]
    Build(String),

    /// Connection / timeout error, after retries
    #[error("network error: {0}")]
    Network(String),

    /// Response arrived but its body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Final non-success response (retries, if any, already spent)
    #[error("HTTP {status} {reason}: {}", snippet(.body))]
    Http {
        status: u16,
        reason: String,
        body: String,
    },

    /// 403, with the job-level verdict of the forbidden policy
    #[error("HTTP 403 {reason}")]
    Forbidden {
        reason: String,
        body: String,
        continue_job: bool,
    },

    /// Body was readable but not the JSON shape we expected
    #[error("cannot decode response: {0}")]
    Decode(String),

    /// Token endpoint refused to issue a new access token
    #[error("token refresh failed ({error}): {description}")]
    Refresh { error: String, description: String },

    /// The spreadsheet has no tab with the configured id
    #[error("Sheet id \"{0}\" not found")]
    SheetNotFound(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Forbidden { .. } => Some(403),
            _ => None,
        }
    }

    /// Response body parsed as JSON, when there is one.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        match self {
            ClientError::Http { body, .. } | ClientError::Forbidden { body, .. } => {
                serde_json::from_str(body).ok()
            }
            _ => None,
        }
    }
}

/// Keep error payloads short enough for a log line.
pub fn snippet(body: &str) -> String {
    const MAX: usize = 300;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}
