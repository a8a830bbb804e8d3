//! Bazzite image branch reader and release notes feed.
//!
//! The plugin host asks for the image branch through [`plugin::Plugin`];
//! the branch selects which GitHub releases the changelog shows, and
//! [`announcement`] turns those releases into SteamOS news events.

pub mod announcement;
pub mod bbcode;
pub mod branch;
pub mod config;
pub mod github;
pub mod plugin;
pub mod release;
pub mod telemetry;

pub use announcement::{Announcement, AnnouncementFeed};
pub use branch::{BranchPolicy, BranchReader, Channel};
pub use config::Config;
pub use github::ReleaseClient;
pub use plugin::Plugin;
pub use release::Release;
