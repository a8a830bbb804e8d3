//! Bazzite changelog configuration.
//!
//! Compiled-in defaults for the branch file and the release feed, with
//! environment overrides layered on top.
//!
//! # Example
//!
//! ```rust
//! use bazzite_changelog::config::{Config, DEFAULT_BRANCH_FILE};
//!
//! let config = Config::default();
//! assert_eq!(config.branch_file.to_str(), Some(DEFAULT_BRANCH_FILE));
//! assert_eq!(config.repo_slug(), "ublue-os/bazzite");
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Where the image branch name lives on a Bazzite install.
pub const DEFAULT_BRANCH_FILE: &str = "/etc/bazzite/image_branch";

/// Branch reported when the branch file is ignored or unreadable.
pub const FALLBACK_BRANCH: &str = "stable";

/// GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

pub const DEFAULT_REPO_OWNER: &str = "ublue-os";
pub const DEFAULT_REPO_NAME: &str = "bazzite";

/// Releases requested per page of the GitHub releases API.
pub const RELEASES_PER_PAGE: u32 = 10;

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding [`DEFAULT_BRANCH_FILE`].
pub const BRANCH_FILE_ENV: &str = "BAZZITE_BRANCH_FILE";
/// Environment variable overriding [`DEFAULT_API_BASE`].
pub const API_BASE_ENV: &str = "BAZZITE_RELEASES_API";
/// Environment variable overriding the `owner/repo` release source.
pub const REPO_ENV: &str = "BAZZITE_RELEASES_REPO";

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Repository slug was not of the form `owner/repo`
    #[error("Invalid repository '{0}', expected owner/repo")]
    InvalidRepo(String),
}

/// Resolved configuration for the branch reader and release feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File holding the image branch name
    pub branch_file: PathBuf,
    /// GitHub API base URL (no trailing slash)
    pub api_base: String,
    /// Repository owner
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branch_file: PathBuf::from(DEFAULT_BRANCH_FILE),
            api_base: DEFAULT_API_BASE.to_string(),
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Defaults, overridden by `BAZZITE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::base_from_lookup(&lookup);

        match lookup(REPO_ENV).filter(|v| !v.is_empty()) {
            Some(slug) => config.with_repo(&slug),
            None => Ok(config),
        }
    }

    /// Like [`Config::from_env`], but an invalid release repository is
    /// logged and left at its default.
    ///
    /// For commands that only read the branch file.
    pub fn from_env_lenient() -> Self {
        Self::from_lookup_lenient(|key| std::env::var(key).ok())
    }

    pub fn from_lookup_lenient<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::base_from_lookup(&lookup);

        match lookup(REPO_ENV).filter(|v| !v.is_empty()) {
            Some(slug) => config.clone().with_repo(&slug).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring release repository override");
                config
            }),
            None => config,
        }
    }

    fn base_from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(BRANCH_FILE_ENV).filter(|v| !v.is_empty()) {
            config.branch_file = PathBuf::from(path);
        }
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.is_empty()) {
            config = config.with_api_base(&base);
        }

        config
    }

    /// Set the API base URL, dropping any trailing slash.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Set the release source from an `owner/repo` slug.
    pub fn with_repo(mut self, slug: &str) -> Result<Self, ConfigError> {
        match slug.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                self.repo_owner = owner.to_string();
                self.repo_name = name.to_string();
                Ok(self)
            }
            _ => Err(ConfigError::InvalidRepo(slug.to_string())),
        }
    }

    /// `owner/repo` of the release source.
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }

    /// URL of the paginated releases listing.
    pub fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base, self.repo_owner, self.repo_name
        )
    }
}
