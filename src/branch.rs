//! Image branch detection.
//!
//! Bazzite records the image branch (`stable`, `testing`, ...) in
//! `/etc/bazzite/image_branch`. The plugin host has always been told
//! `"stable"` regardless of what that file says, and that remains the
//! default [`BranchPolicy`]. [`BranchPolicy::PreferFile`] reports the file
//! content instead and only falls back when the file can't be used.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bazzite_changelog::branch::{BranchPolicy, BranchReader};
//!
//! let reader = BranchReader::default();
//! assert_eq!(reader.get_branch().await.as_deref(), Some("stable"));
//!
//! let reader = reader.with_policy(BranchPolicy::PreferFile);
//! println!("{:?}", reader.get_branch().await);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::config::{DEFAULT_BRANCH_FILE, FALLBACK_BRANCH};

/// Errors from reading the branch file.
#[derive(Error, Debug)]
pub enum BranchError {
    /// File missing, unreadable, or not valid UTF-8
    #[error("Failed to read branch file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How [`BranchReader::get_branch`] treats the file content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BranchPolicy {
    /// Read the file, then report [`FALLBACK_BRANCH`] whatever happened.
    #[default]
    AlwaysFallback,
    /// Report the trimmed file content, or [`FALLBACK_BRANCH`] if the file
    /// is unreadable or blank.
    PreferFile,
}

/// Release channel a branch follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Regular releases
    #[default]
    Stable,
    /// Prereleases
    Testing,
    /// Every release, unfiltered
    All,
}

impl Channel {
    /// Map a branch name to its channel. Only `testing` selects prereleases.
    pub fn from_branch(branch: &str) -> Self {
        if branch.trim() == "testing" {
            Channel::Testing
        } else {
            Channel::Stable
        }
    }

    /// Map Steam event `require_tags` to a channel.
    ///
    /// `stablechannel` wins over `betachannel`/`previewchannel`; no channel
    /// tag at all means every release.
    pub fn from_require_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let has = |wanted: &str| tags.iter().any(|t| t.as_ref() == wanted);

        if has("stablechannel") {
            Channel::Stable
        } else if has("betachannel") || has("previewchannel") {
            Channel::Testing
        } else {
            Channel::All
        }
    }

    /// Whether releases with the given prerelease flag belong to this channel.
    pub fn accepts(self, prerelease: bool) -> bool {
        match self {
            Channel::Stable => !prerelease,
            Channel::Testing => prerelease,
            Channel::All => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Testing => "testing",
            Channel::All => "all",
        }
    }

    /// Steam announcement tag for this channel.
    pub fn steam_tag(self) -> &'static str {
        match self {
            Channel::Testing => "betachannel",
            Channel::Stable | Channel::All => "stablechannel",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Channel::Stable),
            "testing" => Ok(Channel::Testing),
            "all" => Ok(Channel::All),
            other => Err(format!(
                "unknown channel '{}' (expected stable, testing or all)",
                other
            )),
        }
    }
}

/// Reads the image branch from a fixed path.
#[derive(Debug, Clone)]
pub struct BranchReader {
    path: PathBuf,
    policy: BranchPolicy,
}

impl Default for BranchReader {
    fn default() -> Self {
        Self::new(DEFAULT_BRANCH_FILE)
    }
}

impl BranchReader {
    /// Create a reader for `path` with the default policy.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: BranchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BranchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> BranchPolicy {
        self.policy
    }

    /// Read the whole branch file, untrimmed.
    ///
    /// The file handle is closed before this returns, on success or error.
    pub fn read_branch_file(&self) -> Result<String, BranchError> {
        let read = || -> io::Result<String> {
            let mut file = File::open(&self.path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            Ok(contents)
        };

        read().map_err(|source| BranchError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Report the current image branch.
    ///
    /// Never fails and never returns `None`; read errors are logged and
    /// absorbed.
    pub async fn get_branch(&self) -> Option<String> {
        let read = self.read_branch_file();

        match &read {
            Ok(contents) => debug!(path = %self.path.display(), branch = contents.trim(), "read branch file"),
            Err(e) => debug!(error = %e, "branch file unavailable"),
        }

        let branch = match (self.policy, read) {
            (BranchPolicy::PreferFile, Ok(contents)) if !contents.trim().is_empty() => {
                contents.trim().to_string()
            }
            _ => FALLBACK_BRANCH.to_string(),
        };

        Some(branch)
    }

    /// Channel of the branch reported by [`BranchReader::get_branch`].
    pub async fn channel(&self) -> Channel {
        self.get_branch()
            .await
            .map(|b| Channel::from_branch(&b))
            .unwrap_or_default()
    }
}
