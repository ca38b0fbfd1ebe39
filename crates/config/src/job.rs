// Extraction job configuration
// Loaded from config.json (or a .toml equivalent) in the job's data directory

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use sheetx_core::HeaderMode;

const SUPPORTED_ACTIONS: &[&str] = &["run"];

static COLUMN_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]+([1-9]\d*)?:[A-Z]+([1-9]\d*)?$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Action '{0}' does not exist.")]
    UnknownAction(String),

    #[error("OAuth credentials are invalid: {0}")]
    Credentials(String),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_action")]
    pub action: String,
    pub parameters: Parameters,
    #[serde(default)]
    pub authorization: Option<Authorization>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    pub data_dir: String,
    #[serde(rename = "outputBucket", default)]
    pub output_bucket: String,
    pub sheets: Vec<SheetDescriptor>,
}

// ---------------------------------------------------------------------------
// Sheet descriptor
// ---------------------------------------------------------------------------

/// One sheet to export: which file and tab, where the rows go, and how the
/// header is laid out.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetDescriptor {
    pub id: u64,
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "fileTitle")]
    pub file_title: String,
    #[serde(rename = "sheetId", deserialize_with = "string_or_int")]
    pub sheet_id: String,
    #[serde(rename = "sheetTitle")]
    pub sheet_title: String,
    #[serde(rename = "outputTable")]
    pub output_table: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Empty means the whole sheet.
    #[serde(rename = "columnRange", default)]
    pub column_range: String,
    #[serde(default)]
    pub header: HeaderConfig,
}

impl SheetDescriptor {
    pub fn header_mode(&self) -> HeaderMode {
        HeaderMode::from_rows(self.header.rows)
    }

    pub fn column_range(&self) -> Option<&str> {
        let trimmed = self.column_range.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_header_rows")]
    pub rows: u32,
    #[serde(default = "default_true")]
    pub sanitize: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            rows: default_header_rows(),
            sanitize: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    pub oauth_api: OAuthApi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthApi {
    pub credentials: OAuthCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCredentials {
    #[serde(rename = "appKey")]
    pub app_key: String,
    #[serde(rename = "#appSecret")]
    pub app_secret: String,
    /// JSON-encoded token pair issued by the OAuth broker.
    #[serde(rename = "#data")]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenData {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl OAuthCredentials {
    pub fn token_data(&self) -> Result<TokenData, ConfigError> {
        let data: TokenData = serde_json::from_str(&self.data)
            .map_err(|e| ConfigError::Credentials(format!("cannot parse #data: {}", e)))?;
        if data.refresh_token.is_empty() {
            return Err(ConfigError::Credentials("missing refresh_token.".into()));
        }
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl JobConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load by extension: `.toml` is TOML, anything else is JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_ACTIONS.contains(&self.action.as_str()) {
            return Err(ConfigError::UnknownAction(self.action.clone()));
        }

        if self.parameters.data_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "parameters.data_dir cannot be empty".into(),
            ));
        }

        for (idx, sheet) in self.parameters.sheets.iter().enumerate() {
            let required = [
                ("fileId", &sheet.file_id),
                ("fileTitle", &sheet.file_title),
                ("sheetId", &sheet.sheet_id),
                ("sheetTitle", &sheet.sheet_title),
                ("outputTable", &sheet.output_table),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "parameters.sheets[{}].{} cannot be empty",
                        idx, field,
                    )));
                }
            }

            if let Some(range) = sheet.column_range() {
                if !COLUMN_RANGE.is_match(range) {
                    return Err(ConfigError::Validation(format!(
                        "parameters.sheets[{}].columnRange: Column range must be in format \"A:E\" (columns), \
                         \"A1:E10\" (bounded), \"A10:E\" (start row), or \"A:E10\" (end row)",
                        idx,
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn enabled_sheets(&self) -> impl Iterator<Item = &SheetDescriptor> {
        self.parameters.sheets.iter().filter(|s| s.enabled)
    }

    pub fn oauth_credentials(&self) -> Option<&OAuthCredentials> {
        self.authorization.as_ref().map(|a| &a.oauth_api.credentials)
    }
}

fn default_action() -> String {
    "run".to_string()
}

fn default_true() -> bool {
    true
}

fn default_header_rows() -> u32 {
    1
}

fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Str(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Int(n) => n.to_string(),
        Id::Str(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_range(range: &str) -> String {
        serde_json::json!({
            "parameters": {
                "data_dir": "/data",
                "outputBucket": "in.c-sheets",
                "sheets": [{
                    "id": 0,
                    "fileId": "1aBc",
                    "fileTitle": "Budget",
                    "sheetId": 0,
                    "sheetTitle": "Sheet1",
                    "outputTable": "budget",
                    "columnRange": range,
                }]
            }
        })
        .to_string()
    }

    #[test]
    fn test_defaults() {
        let config = JobConfig::from_json(&config_with_range("")).unwrap();
        assert_eq!(config.action, "run");
        let sheet = &config.parameters.sheets[0];
        assert!(sheet.enabled);
        assert_eq!(sheet.sheet_id, "0");
        assert_eq!(sheet.header.rows, 1);
        assert!(sheet.header.sanitize);
        assert_eq!(sheet.header_mode(), HeaderMode::ExplicitDepth(1));
        assert_eq!(sheet.column_range(), None);
    }

    #[test]
    fn test_valid_column_ranges() {
        for range in ["A:E", "A1:E10", "A10:E", "A:E10", "A1:A1", "AA:ZZ", "a:e", "A1:e10"] {
            let config = JobConfig::from_json(&config_with_range(range))
                .unwrap_or_else(|e| panic!("range {:?}: {}", range, e));
            assert_eq!(config.parameters.sheets[0].column_range(), Some(range));
        }
    }

    #[test]
    fn test_invalid_column_ranges() {
        for range in [
            "1:100", "A", "A1", "1:2", "A-E", "A:B:C", "A1E10", "A@:E#", "A 1:E 10", ":E10",
            "A1:", "A0:E10",
        ] {
            let err = JobConfig::from_json(&config_with_range(range)).unwrap_err();
            assert!(
                err.to_string().contains("Column range must be in format"),
                "range {:?}: {}",
                range,
                err,
            );
        }
    }

    #[test]
    fn test_missing_required_field() {
        let json = r#"{"parameters": {"data_dir": "/data", "sheets": [
            {"id": 1, "fileId": "", "fileTitle": "F", "sheetId": "7",
             "sheetTitle": "S", "outputTable": "t"}
        ]}}"#;
        let err = JobConfig::from_json(json).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Validation("parameters.sheets[0].fileId cannot be empty".into())
        );
    }

    #[test]
    fn test_missing_data_dir_is_parse_error() {
        let err = JobConfig::from_json(r#"{"parameters": {"sheets": []}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{:?}", err);
    }

    #[test]
    fn test_unknown_action() {
        let json = r#"{"action": "sync", "parameters": {"data_dir": "/data", "sheets": []}}"#;
        let err = JobConfig::from_json(json).unwrap_err();
        assert_eq!(err.to_string(), "Action 'sync' does not exist.");
    }

    #[test]
    fn test_header_and_enabled_overrides() {
        let json = r#"{"parameters": {"data_dir": "/data", "sheets": [
            {"id": 1, "fileId": "f", "fileTitle": "F", "sheetId": "7", "sheetTitle": "S",
             "outputTable": "t", "enabled": false, "header": {"rows": 0, "sanitize": false}},
            {"id": 2, "fileId": "g", "fileTitle": "G", "sheetId": "8", "sheetTitle": "T",
             "outputTable": "u", "header": {"rows": 2}}
        ]}}"#;
        let config = JobConfig::from_json(json).unwrap();
        let sheets = &config.parameters.sheets;
        assert_eq!(sheets[0].header_mode(), HeaderMode::NoHeader);
        assert!(!sheets[0].header.sanitize);
        assert_eq!(sheets[1].header_mode(), HeaderMode::ExplicitDepth(2));
        assert!(sheets[1].header.sanitize);

        let enabled: Vec<_> = config.enabled_sheets().map(|s| s.id).collect();
        assert_eq!(enabled, vec![2]);
    }

    #[test]
    fn test_oauth_token_data() {
        let json = r##"{
            "parameters": {"data_dir": "/data", "sheets": []},
            "authorization": {"oauth_api": {"credentials": {
                "appKey": "key", "#appSecret": "secret",
                "#data": "{\"access_token\":\"at\",\"refresh_token\":\"rt\"}"
            }}}
        }"##;
        let config = JobConfig::from_json(json).unwrap();
        let creds = config.oauth_credentials().unwrap();
        assert_eq!(creds.app_key, "key");
        let data = creds.token_data().unwrap();
        assert_eq!(data.access_token, "at");
        assert_eq!(data.refresh_token, "rt");
    }

    #[test]
    fn test_oauth_missing_refresh_token() {
        let creds = OAuthCredentials {
            app_key: "key".into(),
            app_secret: "secret".into(),
            data: r#"{"access_token":"at"}"#.into(),
        };
        let err = creds.token_data().unwrap_err();
        assert_eq!(
            err.to_string(),
            "OAuth credentials are invalid: missing refresh_token."
        );
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
[parameters]
data_dir = "/data"
outputBucket = "in.c-sheets"

[[parameters.sheets]]
id = 3
fileId = "1aBc"
fileTitle = "Budget"
sheetId = 12
sheetTitle = "Q1"
outputTable = "q1"
columnRange = "B2:D"

[parameters.sheets.header]
rows = 0
"#,
        )
        .unwrap();

        let config = JobConfig::load(&path).unwrap();
        let sheet = &config.parameters.sheets[0];
        assert_eq!(sheet.sheet_id, "12");
        assert_eq!(sheet.column_range(), Some("B2:D"));
        assert_eq!(sheet.header_mode(), HeaderMode::NoHeader);
    }

    #[test]
    fn test_load_missing_file() {
        let err = JobConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
