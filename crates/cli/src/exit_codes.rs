//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `sheetx` exit codes.
//! Orchestrators branch on them, so they are part of the shell contract.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                                   |
//! |---------|-------------|-----------------------------------------------|
//! | 0       | Universal   | Success                                       |
//! | 1       | Universal   | User error (configuration, range, access)     |
//! | 2       | Universal   | CLI usage error (bad args, unreadable config) |
//! | 3       | Universal   | Application error (network, decode, disk)     |
//! | 50-59   | remote      | Google API connection                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError`

use sheetx_config::ConfigError;
use sheetx_extract::ExtractError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - every enabled sheet was exported or skipped.
pub const EXIT_SUCCESS: u8 = 0;

/// User error - something the job's owner can fix: a bad column range, a
/// missing file or sheet, revoked credentials.
pub const EXIT_USER: u8 = 1;

/// Usage error - bad arguments, config file missing or unparseable.
pub const EXIT_USAGE: u8 = 2;

/// Application error - network failure after retries, a response we could
/// not decode, an output file we could not write.
pub const EXIT_APPLICATION: u8 = 3;

// =============================================================================
// Remote (50-59)
// =============================================================================

/// No credentials: neither `--access-token` nor OAuth credentials in the
/// configuration.
pub const EXIT_REMOTE_NOT_AUTH: u8 = 50;

// =============================================================================
// Error mapping
// =============================================================================

pub fn extract_exit_code(err: &ExtractError) -> u8 {
    if err.is_user_error() {
        EXIT_USER
    } else {
        EXIT_APPLICATION
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io { .. } | ConfigError::Parse(_) => EXIT_USAGE,
        ConfigError::Validation(_)
        | ConfigError::UnknownAction(_)
        | ConfigError::Credentials(_) => EXIT_USER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_exit_codes() {
        assert_eq!(extract_exit_code(&ExtractError::User("x".into())), EXIT_USER);
        assert_eq!(extract_exit_code(&ExtractError::Application("x".into())), EXIT_APPLICATION);
    }

    #[test]
    fn test_config_exit_codes() {
        assert_eq!(config_exit_code(&ConfigError::Parse("eof".into())), EXIT_USAGE);
        assert_eq!(config_exit_code(&ConfigError::UnknownAction("x".into())), EXIT_USER);
        assert_eq!(
            config_exit_code(&ConfigError::Io { path: "c.json".into(), message: "nope".into() }),
            EXIT_USAGE
        );
    }
}
