// sheetx CLI - export Google Sheets tabs into CSV tables
// Exit codes are documented in exit_codes.rs

mod exit_codes;
mod logger;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use sheetx_config::{ConfigError, JobConfig};
use sheetx_core::{resolve, RangeError, ResolvedRange};
use sheetx_extract::{ExtractError, Extractor, ExtractorOptions, RunReport, DEFAULT_FETCH_ROWS};
use sheetx_sheets_client::{
    ClientError, OAuthRefresh, RetryConfig, SheetsClient, StaticToken, TokenSource,
    GOOGLE_TOKEN_URL, SHEETS_API_BASE,
};

use exit_codes::{
    config_exit_code, extract_exit_code, EXIT_APPLICATION, EXIT_REMOTE_NOT_AUTH, EXIT_SUCCESS,
    EXIT_USAGE, EXIT_USER,
};

#[derive(Parser)]
#[command(name = "sheetx")]
#[command(about = "Export Google Sheets tabs into CSV tables")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Timestamped, leveled log lines including request detail
    #[arg(long, global = true)]
    debug: bool,

    /// Only warnings and errors on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extraction job: export every enabled sheet of the configuration
    #[command(after_help = "\
Examples:
  sheetx run --config /data/config.json
  sheetx run --config job.toml --data-dir ./out --fetch-rows 500
  SHEETX_ACCESS_TOKEN=ya29... sheetx run --config job.json

Writes {data_dir}/out/tables/{fileId}_{sheetId}.csv plus a .manifest per sheet.
Prints {\"status\":\"ok\",\"extracted\":{...}} on stdout when the job succeeds.")]
    Run(RunArgs),

    /// Preview how a column range resolves against a sheet's dimensions
    #[command(after_help = "\
Examples:
  sheetx resolve A:E --rows 2500 --columns 10
  sheetx resolve B2:ZZ9999 --rows 100 --columns 5")]
    Resolve {
        /// Column range: A:E, A1:E10, A10:E or A:E10
        range: String,

        /// Sheet row count
        #[arg(long)]
        rows: u32,

        /// Sheet column count
        #[arg(long)]
        columns: u32,

        /// Sheet title used in messages
        #[arg(long, default_value = "Sheet1")]
        sheet: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Job configuration (.json, or .toml)
    #[arg(long, short = 'c', env = "SHEETX_CONFIG")]
    config: PathBuf,

    /// Override parameters.data_dir from the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Bearer token to use instead of the configured OAuth credentials
    #[arg(long, env = "SHEETX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Retries for 429 / 5xx / network failures after the first attempt
    #[arg(long, default_value_t = RetryConfig::default().backoff_attempts)]
    backoff_attempts: u32,

    /// Rows per values request when paging through a sheet
    #[arg(long, default_value_t = DEFAULT_FETCH_ROWS)]
    fetch_rows: u32,

    /// Sheets API base URL
    #[arg(long, default_value = SHEETS_API_BASE)]
    api_base: String,

    /// OAuth token endpoint used to refresh access tokens
    #[arg(long, default_value = GOOGLE_TOKEN_URL)]
    token_url: String,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Resolve { range, rows, columns, sheet } => cmd_resolve(&range, rows, columns, &sheet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn user(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USER, message: msg.into(), hint: None }
    }

    pub fn application(msg: impl Into<String>) -> Self {
        Self { code: EXIT_APPLICATION, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let code = config_exit_code(&err);
        let hint = match &err {
            ConfigError::Io { .. } => Some("pass --config <path> or set SHEETX_CONFIG".to_string()),
            ConfigError::Credentials(_) => {
                Some("reauthorize the extractor to store fresh OAuth credentials".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn extract(err: ExtractError) -> Self {
        Self { code: extract_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Failures while obtaining the first access token, before any sheet is
    /// touched.
    pub fn token(err: ClientError) -> Self {
        match err {
            ClientError::Refresh { error, .. } if error == "invalid_grant" => {
                Self::user("Invalid OAuth grant, try reauthenticating the extractor")
            }
            ClientError::Refresh { error, description } => {
                Self::user(format!("\"{}\" ({})", description, error))
            }
            other => Self::application(other.to_string()),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<RangeError> for CliError {
    fn from(err: RangeError) -> Self {
        if err.is_malformed() {
            Self::usage(err.to_string())
        } else {
            Self::user(err.to_string())
        }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = JobConfig::load(&args.config).map_err(CliError::config)?;
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&config.parameters.data_dir));

    let source = token_source(&config, args.access_token, &args.token_url)?;
    let retry = RetryConfig {
        backoff_attempts: args.backoff_attempts,
        ..RetryConfig::default()
    };
    let client = SheetsClient::from_token_source(source, retry)
        .map_err(CliError::token)?
        .with_api_base(args.api_base);

    let mut options = ExtractorOptions::new(data_dir, config.parameters.output_bucket.as_str());
    options.fetch_rows = args.fetch_rows;

    let mut extractor = Extractor::new(client, options);
    let extracted = extractor
        .run(&config.parameters.sheets)
        .map_err(CliError::extract)?;

    let report = RunReport::ok(extracted);
    let json = serde_json::to_string(&report).map_err(|e| CliError::application(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// `--access-token` wins over configured OAuth credentials.
fn token_source(
    config: &JobConfig,
    access_token: Option<String>,
    token_url: &str,
) -> Result<Box<dyn TokenSource>, CliError> {
    if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
        log::debug!("using access token from command line");
        return Ok(Box::new(StaticToken::new(token)));
    }

    let Some(credentials) = config.oauth_credentials() else {
        return Err(CliError {
            code: EXIT_REMOTE_NOT_AUTH,
            message: "Missing authorization: provide either --access-token \
                      or authorization.oauth_api.credentials.#data"
                .to_string(),
            hint: None,
        }
        .with_hint("SHEETX_ACCESS_TOKEN is read when --access-token is not given"));
    };

    let data = credentials.token_data().map_err(CliError::config)?;
    let access = Some(data.access_token).filter(|t| !t.is_empty());
    let source = OAuthRefresh::new(
        credentials.app_key.as_str(),
        credentials.app_secret.as_str(),
        data.refresh_token,
        access,
    )
    .map_err(CliError::token)?
    .with_token_url(token_url);
    Ok(Box::new(source))
}

// ============================================================================
// resolve
// ============================================================================

#[derive(Serialize)]
struct ResolveOutput<'a> {
    range: String,
    #[serde(flatten)]
    resolved: &'a ResolvedRange,
}

fn cmd_resolve(range: &str, rows: u32, columns: u32, sheet: &str) -> Result<(), CliError> {
    let resolved = resolve(range, rows, columns, sheet)?;
    if let Some(capping) = &resolved.capping {
        log::warn!("Sheet \"{}\": {}", sheet, capping);
    }
    let output = ResolveOutput {
        range: resolved.a1(),
        resolved: &resolved,
    };
    let json = serde_json::to_string_pretty(&output).map_err(|e| CliError::application(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
