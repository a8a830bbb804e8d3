//! GitHub release model and channel filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::branch::Channel;

/// One entry of the GitHub releases API.
///
/// Only the fields the changelog needs are kept; the rest of the payload
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    /// Markdown release notes
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl Release {
    /// Release name, falling back to the tag.
    pub fn title(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }

    pub fn notes(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Sort newest first by creation time.
pub fn sort_newest_first(releases: &mut [Release]) {
    releases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Sort a page newest first and keep only releases on `channel`.
pub fn select_for_channel(mut page: Vec<Release>, channel: Channel) -> Vec<Release> {
    sort_newest_first(&mut page);
    page.into_iter()
        .filter(|r| channel.accepts(r.prerelease))
        .collect()
}
