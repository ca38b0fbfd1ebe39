use sheetx_config::SheetDescriptor;
use sheetx_core::RangeError;
use sheetx_sheets_client::{snippet, ClientError};

use crate::pagination::ExportError;

/// Why a job stopped. User errors are fixable from the configuration or
/// the spreadsheet itself; application errors are ours or the network's.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("{0}")]
    User(String),

    #[error("{0}")]
    Application(String),
}

impl ExtractError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, ExtractError::User(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ExtractError::User(msg) | ExtractError::Application(msg) => msg,
        }
    }
}

impl From<RangeError> for ExtractError {
    fn from(e: RangeError) -> Self {
        ExtractError::User(e.to_string())
    }
}

/// A 403 the forbidden policy lets the job walk past.
pub(crate) fn is_skippable(err: &ClientError) -> bool {
    matches!(err, ClientError::Forbidden { continue_job: true, .. })
}

/// Failures that read the same whichever request hit them.
fn credential_failure(err: &ClientError, sheet: &SheetDescriptor) -> Option<ExtractError> {
    let user = |msg: String| Some(ExtractError::User(msg));
    match err {
        ClientError::Refresh { error, .. } if error == "invalid_grant" => user(invalid_grant(sheet)),
        ClientError::Refresh { error, description } => {
            user(format!("\"{}\" ({})", description, error))
        }
        ClientError::Forbidden { reason, .. } => user(format!("Reason: {}", reason)),
        ClientError::Http { status: 401, .. } => {
            user("Expired or wrong credentials, please reauthorize.".into())
        }
        ClientError::SheetNotFound(_) => user(err.to_string()),
        ClientError::Build(_)
        | ClientError::Network(_)
        | ClientError::Body(_)
        | ClientError::Decode(_) => Some(ExtractError::Application(err.to_string())),
        ClientError::Http { .. } => None,
    }
}

fn invalid_grant(sheet: &SheetDescriptor) -> String {
    format!(
        "Invalid OAuth grant when fetching \"{}\", try reauthenticating the extractor",
        sheet.file_title,
    )
}

/// Classify a failure while fetching spreadsheet metadata.
pub(crate) fn metadata_failure(err: ClientError, sheet: &SheetDescriptor) -> ExtractError {
    if let Some(classified) = credential_failure(&err, sheet) {
        return classified;
    }
    if err.status() == Some(404) {
        return ExtractError::User(format!(
            "File \"{}\" not found in Google Drive",
            sheet.sheet_title,
        ));
    }

    if let Some(body) = err.json_body() {
        let error = &body["error"];
        if error.as_str() == Some("invalid_grant") {
            return ExtractError::User(invalid_grant(sheet));
        }
        if let Some(description) = body["error_description"].as_str() {
            return ExtractError::User(format!(
                "\"{}\" ({})",
                description,
                error.as_str().unwrap_or_default(),
            ));
        }
        if let Some(detail) = error.as_object().filter(|o| o.len() > 1) {
            return ExtractError::User(format!(
                "\"{}\" ({}) for \"{}\"",
                detail.get("message").and_then(|m| m.as_str()).unwrap_or_default(),
                detail.get("status").and_then(|s| s.as_str()).unwrap_or_default(),
                sheet.sheet_title,
            ));
        }
    }

    ExtractError::User(format!("Google Drive Error: {}", err))
}

/// Classify a failure while paging through a sheet's values.
pub(crate) fn export_failure(err: ExportError, sheet: &SheetDescriptor) -> ExtractError {
    match err {
        ExportError::Output(e) => ExtractError::Application(e.to_string()),
        ExportError::Range(e) => e.into(),
        ExportError::Client(e) => {
            if let Some(classified) = credential_failure(&e, sheet) {
                return classified;
            }
            if let ClientError::Http { status, reason, body } = &e {
                log::debug!("HTTP {} {}: {}", status, reason, snippet(body));
            }
            ExtractError::User(format!(
                "Error importing file - sheet: '{} - {}'",
                sheet.file_title, sheet.sheet_title,
            ))
        }
    }
}
