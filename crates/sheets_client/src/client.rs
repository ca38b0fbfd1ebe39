use std::time::Duration;

use serde::Deserialize;
use sheetx_core::column_to_letters;

use crate::auth::TokenSource;
use crate::error::{snippet, ClientError};
use crate::transport::{ForbiddenVerdict, Request, ReqwestSend, Response, RetryConfig, Transport};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const SPREADSHEET_FIELDS: &str = "spreadsheetId,properties.title,sheets.properties.gridProperties,\
                                  sheets.properties.sheetId,sheets.properties.title";

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// 403 reasons that mean the credential itself is out of quota or scope,
/// so no other resource in the job will fare better.
const JOB_FATAL_FORBIDDEN: &[&str] = &[
    "insufficientPermissions",
    "dailyLimitExceeded",
    "usageLimits.userRateLimitExceededUnreg",
];

// ── Metadata models ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

/// Live bounds of one tab, taken as ground truth for a single export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetDimensions {
    pub row_count: u32,
    pub column_count: u32,
}

impl Sheet {
    pub fn title(&self) -> &str {
        &self.properties.title
    }

    pub fn dimensions(&self) -> SheetDimensions {
        SheetDimensions {
            row_count: self.properties.grid_properties.row_count,
            column_count: self.properties.grid_properties.column_count,
        }
    }
}

impl Spreadsheet {
    pub fn sheet_by_id(&self, sheet_id: &str) -> Result<&Sheet, ClientError> {
        self.sheets
            .iter()
            .find(|s| s.properties.sheet_id.to_string() == sheet_id)
            .ok_or_else(|| ClientError::SheetNotFound(sheet_id.to_string()))
    }
}

// ── Fetch window ────────────────────────────────────────────────────

/// One values request: a spreadsheet and an A1 range whose sheet title is
/// already percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub spreadsheet_id: String,
    pub range: String,
}

impl FetchWindow {
    pub fn new(
        spreadsheet_id: &str,
        sheet_title: &str,
        columns: (u32, u32),
        rows: (u32, u32),
    ) -> Self {
        let range = format!(
            "{}!{}{}:{}{}",
            encode_sheet_title(sheet_title),
            column_to_letters(columns.0),
            rows.0,
            column_to_letters(columns.1),
            rows.1,
        );
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            range,
        }
    }
}

/// Percent-encode a sheet title for use inside a values range.
///
/// Form encoding turns spaces into `+`, which the API would read
/// literally, so those become `%20`.
pub fn encode_sheet_title(title: &str) -> String {
    url::form_urlencoded::byte_serialize(title.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

// ── 403 policy ──────────────────────────────────────────────────────

/// The most specific reason Google gives for an error response:
/// `error.errors[0].reason`, then `error.status`, then the HTTP reason.
pub fn google_error_reason(body: &str, http_reason: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or(serde_json::Value::Null);
    let error = &json["error"];
    error["errors"][0]["reason"]
        .as_str()
        .or_else(|| error["status"].as_str())
        .unwrap_or(http_reason)
        .to_string()
}

/// Default forbidden policy: continue the job unless the reason says the
/// credential is exhausted or lacks scope.
pub fn google_forbidden_policy(response: &Response) -> bool {
    let reason = google_error_reason(&response.body, &response.reason);
    !JOB_FATAL_FORBIDDEN.contains(&reason.as_str())
}

// ── Client ──────────────────────────────────────────────────────────

/// The two reads an export needs. Kept as a trait so pagination can run
/// against a fake.
pub trait SheetsApi {
    fn spreadsheet(&mut self, file_id: &str) -> Result<Spreadsheet, ClientError>;
    fn values(&mut self, window: &FetchWindow) -> Result<Vec<Vec<String>>, ClientError>;
}

pub struct SheetsClient {
    transport: Transport,
    api_base: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            api_base: SHEETS_API_BASE.to_string(),
        }
    }

    /// Production wiring: reqwest sender, bearer from `source`, refresh on
    /// 401 through the same source, and the Google 403 policy.
    pub fn from_token_source(
        mut source: impl TokenSource + 'static,
        retry: RetryConfig,
    ) -> Result<Self, ClientError> {
        let bearer = source.access_token()?;
        let http = ReqwestSend::new(HTTP_TIMEOUT)?;
        let transport = Transport::new(Box::new(http), Some(bearer))
            .with_retry_config(retry)
            .on_forbidden(google_forbidden_policy)
            .on_unauthorized_refresh(move || source.refresh());
        Ok(Self::new(transport))
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn get(&mut self, url: String) -> Result<Response, ClientError> {
        log::debug!("GET {}", url);
        let response = self.transport.call(&Request::get(url))?;
        if let Some(verdict) = response.forbidden {
            return Err(ClientError::Forbidden {
                reason: google_error_reason(&response.body, &response.reason),
                body: response.body,
                continue_job: verdict == ForbiddenVerdict::ContinueJob,
            });
        }
        if !response.is_success() {
            log::debug!("HTTP {}: {}", response.status, snippet(&response.body));
            return Err(ClientError::Http {
                status: response.status,
                reason: response.reason,
                body: response.body,
            });
        }
        Ok(response)
    }
}

impl SheetsApi for SheetsClient {
    fn spreadsheet(&mut self, file_id: &str) -> Result<Spreadsheet, ClientError> {
        let mut url = url::Url::parse(&self.api_base)
            .map_err(|e| ClientError::Build(format!("invalid API base {}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Build(format!("invalid API base {}", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", file_id]);
        url.query_pairs_mut().append_pair("fields", SPREADSHEET_FIELDS);

        let response = self.get(url.to_string())?;
        serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(format!("spreadsheet metadata: {}", e)))
    }

    fn values(&mut self, window: &FetchWindow) -> Result<Vec<Vec<String>>, ClientError> {
        let id: String = url::form_urlencoded::byte_serialize(window.spreadsheet_id.as_bytes()).collect();
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base, id, window.range
        );

        let response = self.get(url)?;
        let parsed: ValueRange = serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(format!("values {}: {}", window.range, e)))?;

        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
