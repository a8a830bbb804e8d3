//! Steam partner event announcements built from Bazzite releases.
//!
//! The SteamOS news view lists partner events for app 1675200. Each
//! release becomes one event in the Bazzite clan, with the release notes
//! converted to BBCode. [`AnnouncementFeed`] loads the releases once and
//! serves every later request from that copy.
//!
//! # Channel selection
//!
//! ```text
//! require_tags contains "stablechannel"             -> non-prereleases
//! require_tags contains "betachannel"/"previewchannel" -> prereleases
//! anything else                                     -> every release
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bbcode::markdown_to_bbcode;
use crate::branch::Channel;
use crate::github::ReleaseClient;
use crate::release::{select_for_channel, Release};

/// Steam ID of the Bazzite clan.
pub const STEAM_CLAN_STEAMID: &str = "103582791470414830";
/// Clan account ID of the Bazzite clan.
pub const STEAM_CLAN_ID: &str = "40893422";
/// SteamOS app ID; its news feed is where the events show up.
pub const STEAMOS_APP_ID: u32 = 1675200;

/// Steam partner event types used for OS updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteamEventType {
    SmallUpdate = 12,
    Update = 13,
    BigUpdate = 14,
}

impl From<SteamEventType> for u32 {
    fn from(kind: SteamEventType) -> Self {
        kind as u32
    }
}

/// Partner event record for one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub gid: String,
    pub clan_steamid: String,
    pub event_name: String,
    pub event_type: u32,
    pub appid: u32,
    pub rtime32_start_time: i64,
    pub rtime32_end_time: i64,
    pub rtime32_last_modified: i64,
    pub event_notes: String,
    pub published: u8,
    pub hidden: u8,
    pub announcement_body: AnnouncementBody,
}

/// The news post attached to an [`Announcement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementBody {
    pub gid: String,
    pub clanid: String,
    pub posterid: String,
    pub headline: String,
    pub posttime: i64,
    pub updatetime: i64,
    /// BBCode
    pub body: String,
    pub commentcount: u32,
    pub tags: Vec<String>,
    pub language: u32,
    pub hidden: u8,
    pub forum_topic_id: String,
    pub event_gid: String,
}

impl Announcement {
    /// Build the event for `release`, tagged for `channel`.
    pub fn from_release(release: &Release, channel: Channel) -> Self {
        let gid = release.id.to_string();
        let created = release.created_at.timestamp();

        Self {
            gid: gid.clone(),
            clan_steamid: STEAM_CLAN_STEAMID.to_string(),
            event_name: release.title().to_string(),
            event_type: SteamEventType::Update.into(),
            appid: STEAMOS_APP_ID,
            rtime32_start_time: created,
            rtime32_end_time: created,
            rtime32_last_modified: created,
            event_notes: "see announcement body".to_string(),
            published: 1,
            hidden: 0,
            announcement_body: AnnouncementBody {
                gid,
                clanid: STEAM_CLAN_ID.to_string(),
                posterid: "0".to_string(),
                headline: format!("Bazzite {}", release.title()),
                posttime: created,
                updatetime: created,
                body: markdown_to_bbcode(release.notes()),
                commentcount: 0,
                tags: vec!["patchnotes".to_string(), channel.steam_tag().to_string()],
                language: 0,
                hidden: 0,
                forum_topic_id: "0".to_string(),
                event_gid: "0".to_string(),
            },
        }
    }
}

#[derive(Debug)]
struct CachedReleases {
    channel: Channel,
    releases: Vec<Release>,
}

/// Release announcements, fetched once and cached.
///
/// The first request that finds releases fixes both the release list and
/// its channel; later `require_tags` don't refetch. An empty result is not
/// cached, so the next request tries again.
#[derive(Debug)]
pub struct AnnouncementFeed {
    client: ReleaseClient,
    cache: Mutex<Option<CachedReleases>>,
}

impl AnnouncementFeed {
    pub fn new(client: ReleaseClient) -> Self {
        Self {
            client,
            cache: Mutex::new(None),
        }
    }

    /// Announcements for a partner event request carrying `require_tags`.
    pub async fn load<S: AsRef<str>>(&self, require_tags: &[S]) -> Vec<Announcement> {
        let mut cache = self.cache.lock().await;

        if cache.is_none() {
            let channel = Channel::from_require_tags(require_tags);
            let releases = select_for_channel(self.client.fetch_page(1).await, channel);

            if releases.is_empty() {
                debug!(%channel, "no releases to announce");
                return Vec::new();
            }

            info!(%channel, count = releases.len(), "cached releases for announcements");
            *cache = Some(CachedReleases { channel, releases });
        }

        cache
            .as_ref()
            .map(|cached| {
                cached
                    .releases
                    .iter()
                    .map(|r| Announcement::from_release(r, cached.channel))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop the cached releases so the next load refetches.
    pub async fn clear(&self) {
        *self.cache.lock().await = None;
    }
}
