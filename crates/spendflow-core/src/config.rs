//! Runtime configuration
//!
//! Paths are derived from an explicit base directory:
//!
//! ```text
//! <base>/data/raw/                       raw statement exports
//! <base>/data/processed/register.json    ingested-file register
//! <base>/data/processed/transactions.csv processed transaction table
//! ```
//!
//! Account suffixes come from the environment and are only required when
//! statements are ingested.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the general account number suffix
pub const GENERAL_ACCOUNT_ENV: &str = "GENERAL_ACCOUNT_ENDING";

/// Environment variable holding the savings account number suffix
pub const SAVINGS_ACCOUNT_ENV: &str = "SAVINGS_ACCOUNT_ENDING";

/// Environment variable pointing to an override rules file
pub const RULES_PATH_ENV: &str = "SPENDFLOW_RULES";

/// Marker file identifying the project root
pub const ROOT_MARKER: &str = ".env";

/// Raw account-number suffixes of the two known accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSuffixes {
    pub general: String,
    pub savings: String,
}

impl AccountSuffixes {
    pub fn new(general: impl Into<String>, savings: impl Into<String>) -> Self {
        Self {
            general: general.into(),
            savings: savings.into(),
        }
    }

    /// Read both suffixes from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            general: required_env(GENERAL_ACCOUNT_ENV)?,
            savings: required_env(SAVINGS_ACCOUNT_ENV)?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::Config(format!(
            "{} must be set to the account number suffix",
            key
        ))),
    }
}

/// Resolved paths and account configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub register_path: PathBuf,
    pub transactions_path: PathBuf,
    /// Override rules file; the embedded defaults are used when `None`
    pub rules_path: Option<PathBuf>,
    /// `None` until configured; ingestion fails with a config error without it
    pub accounts: Option<AccountSuffixes>,
}

impl Settings {
    /// Build settings rooted at `base_dir` with no account configuration
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let processed = base_dir.join("data").join("processed");
        Self {
            raw_dir: base_dir.join("data").join("raw"),
            register_path: processed.join("register.json"),
            transactions_path: processed.join("transactions.csv"),
            rules_path: None,
            accounts: None,
            base_dir,
        }
    }

    /// Build settings rooted at `base_dir`, reading accounts and rules path
    /// from the environment
    ///
    /// Missing account suffixes are not an error here; they are reported
    /// when ingestion asks for them.
    pub fn from_env(base_dir: impl Into<PathBuf>) -> Self {
        let mut settings = Self::new(base_dir);
        settings.accounts = AccountSuffixes::from_env().ok();
        settings.rules_path = env::var(RULES_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        settings
    }

    pub fn with_accounts(mut self, accounts: AccountSuffixes) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// Account suffixes, or a config error naming the missing variables
    pub fn accounts(&self) -> Result<&AccountSuffixes> {
        self.accounts.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "{} and {} must be set to the account number suffixes",
                GENERAL_ACCOUNT_ENV, SAVINGS_ACCOUNT_ENV
            ))
        })
    }
}

/// Walk upward from `start` to the first directory containing the root marker
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(ROOT_MARKER).exists() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(Error::NotFound(format!(
        "No {} file found in {} or any parent directory",
        ROOT_MARKER,
        start.display()
    )))
}
