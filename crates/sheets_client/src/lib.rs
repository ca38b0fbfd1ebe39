//! Sheets API client, shared by the extractor and the CLI.
//!
//! Blocking reqwest client (no Tokio runtime required). Covers exactly the
//! calls an export needs: spreadsheet metadata and value ranges.
//!
//! Retry policy lives in [`transport`]; it knows nothing about spreadsheets.

mod auth;
mod client;
mod error;
pub mod transport;

pub use auth::{OAuthRefresh, StaticToken, TokenSource, GOOGLE_TOKEN_URL};
pub use client::{
    encode_sheet_title, google_error_reason, google_forbidden_policy, FetchWindow, GridProperties,
    Sheet, SheetDimensions, SheetProperties, SheetsApi, SheetsClient, Spreadsheet,
    SpreadsheetProperties, SHEETS_API_BASE,
};
pub use error::{snippet, ClientError};
pub use transport::{
    backoff_delay, ForbiddenVerdict, HttpSend, Request, ReqwestSend, Response, RetryConfig,
    Transport,
};
