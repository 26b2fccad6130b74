//! Startup configuration, loaded from the environment.
//!
//! Everything deployment-specific lives here: credentials for the two
//! gateways, the sheet layout, and the eligibility policy. Validation
//! happens once at startup so a misconfigured deployment fails before
//! accepting any traffic.

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::eligibility::EligibilityPolicy;
use crate::reservation::SheetLayout;
use crate::types::CategoryId;

/// Errors loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable was absent or empty.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// A variable was present but unparseable.
    #[error("invalid value for {name}: {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl std::fmt::Display) -> Self {
        ConfigError::Invalid {
            name,
            message: message.to_string(),
        }
    }
}

/// Fully-validated service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,

    /// Forum base URL, e.g. `https://forum.example.org`.
    pub discourse_url: String,
    pub discourse_api_key: String,
    pub discourse_api_username: String,

    /// The spreadsheet holding the summary organizer.
    pub spreadsheet_id: String,
    /// OAuth bearer token for the spreadsheets scope.
    pub sheets_token: String,

    /// Layout of the pointer cell and the summary sheet.
    pub sheet_layout: SheetLayout,

    /// Which topics are in scope.
    pub policy: EligibilityPolicy,

    /// Directory for the replied-topic ledger.
    pub ledger_dir: PathBuf,

    /// Per-request timeout for gateway HTTP calls.
    pub gateway_timeout: Duration,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &'static str, default: &str) -> String {
    env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Loads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = optional("BIND_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", e))?;

        let cutoff: DateTime<Utc> = required("CUTOFF_TIMESTAMP")?
            .parse()
            .map_err(|e| ConfigError::invalid("CUTOFF_TIMESTAMP", e))?;

        let allowed_categories = parse_categories(&required("ALLOWED_CATEGORIES")?)?;

        let sheet_id: i64 = optional("SUMMARY_SHEET_ID", "0")
            .parse()
            .map_err(|e| ConfigError::invalid("SUMMARY_SHEET_ID", e))?;

        let timeout_secs: u64 = optional("GATEWAY_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| ConfigError::invalid("GATEWAY_TIMEOUT_SECS", e))?;

        Ok(Config {
            bind_addr,
            webhook_secret: required("WEBHOOK_SECRET")?,
            discourse_url: required("DISCOURSE_URL")?
                .trim_end_matches('/')
                .to_string(),
            discourse_api_key: required("DISCOURSE_API_KEY")?,
            discourse_api_username: required("DISCOURSE_API_USERNAME")?,
            spreadsheet_id: required("SPREADSHEET_ID")?,
            sheets_token: required("SHEETS_TOKEN")?,
            sheet_layout: SheetLayout {
                pointer_range: optional("POINTER_CELL_RANGE", "Parameters!B2"),
                sheet_name: optional("SUMMARY_SHEET_NAME", "Summary Organizer Sheet"),
                sheet_id,
                date_column: 'A',
                link_column: 'D',
            },
            policy: EligibilityPolicy::new(cutoff, allowed_categories),
            ledger_dir: PathBuf::from(required("LEDGER_DIR")?),
            gateway_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Parses a comma-separated list of category IDs, e.g. `"5,9"`.
fn parse_categories(raw: &str) -> Result<HashSet<CategoryId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(CategoryId)
                .map_err(|e| ConfigError::invalid("ALLOWED_CATEGORIES", format!("{:?}: {}", s, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_categories() {
        let parsed = parse_categories("5, 9,12").unwrap();
        assert_eq!(
            parsed,
            HashSet::from([CategoryId(5), CategoryId(9), CategoryId(12)])
        );
    }

    #[test]
    fn empty_segments_are_skipped() {
        let parsed = parse_categories("5,,9,").unwrap();
        assert_eq!(parsed, HashSet::from([CategoryId(5), CategoryId(9)]));
    }

    #[test]
    fn non_numeric_category_is_rejected() {
        let err = parse_categories("5,general").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "ALLOWED_CATEGORIES",
                ..
            }
        ));
    }

    #[test]
    fn empty_list_parses_to_empty_set() {
        assert!(parse_categories("").unwrap().is_empty());
    }
}
