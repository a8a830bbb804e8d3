//! End-to-end: branch file -> channel -> release feed.

use anyhow::Result;
use bazzite_changelog::config::{API_BASE_ENV, BRANCH_FILE_ENV};
use bazzite_changelog::{
    AnnouncementFeed, BranchPolicy, BranchReader, Channel, Config, Plugin, ReleaseClient,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_bazzite_releases() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/ublue-os/bazzite/releases"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 100,
                "name": "Stable (F41.20250106.2)",
                "tag_name": "41.20250106.2",
                "body": "### Kernel\n- bumped",
                "prerelease": false,
                "created_at": "2025-01-06T05:00:00Z"
            },
            {
                "id": 101,
                "name": "Testing (F41.20250110)",
                "tag_name": "testing-41.20250110",
                "body": "### Mesa\n- bumped",
                "prerelease": true,
                "created_at": "2025-01-10T05:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/ublue-os/bazzite/releases"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    server
}

fn config_for(dir: &TempDir, server: &MockServer) -> Result<Config> {
    let branch_file = dir.path().join("image_branch").display().to_string();
    let api = server.uri();

    Ok(Config::from_lookup(|key| match key {
        k if k == BRANCH_FILE_ENV => Some(branch_file.clone()),
        k if k == API_BASE_ENV => Some(api.clone()),
        _ => None,
    })?)
}

#[tokio::test]
async fn test_default_policy_always_shows_stable_feed() -> Result<()> {
    let server = mock_bazzite_releases().await;
    let dir = TempDir::new()?;
    let config = config_for(&dir, &server)?;
    fs::write(&config.branch_file, "testing\n")?;

    let reader = BranchReader::new(&config.branch_file);
    assert_eq!(reader.channel().await, Channel::Stable);

    let plugin = Plugin::new(reader.clone());
    assert_eq!(plugin.call("get_bazzite_branch").await?, json!("stable"));

    let client = ReleaseClient::new(config)?;
    let releases = client.fetch_releases(reader.channel().await, None).await;
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].tag_name, "41.20250106.2");

    Ok(())
}

#[tokio::test]
async fn test_prefer_file_policy_follows_testing_branch() -> Result<()> {
    let server = mock_bazzite_releases().await;
    let dir = TempDir::new()?;
    let config = config_for(&dir, &server)?;
    fs::write(&config.branch_file, "testing\n")?;

    let reader = BranchReader::new(&config.branch_file).with_policy(BranchPolicy::PreferFile);
    let client = ReleaseClient::new(config)?;

    let latest = client
        .fetch_latest(reader.channel().await)
        .await
        .expect("testing release");
    assert_eq!(latest.id, 101);
    assert_eq!(latest.notes(), "### Mesa\n- bumped");

    Ok(())
}

#[tokio::test]
async fn test_missing_branch_file_and_dead_api() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let config = config_for(&dir, &server)?;

    let reader = BranchReader::new(&config.branch_file);
    assert_eq!(reader.get_branch().await.as_deref(), Some("stable"));

    // No mocks mounted: every request is a 404.
    let client = ReleaseClient::new(config)?;
    assert!(client.fetch_releases(Channel::Stable, None).await.is_empty());
    assert!(client.fetch_release_by_tag("41.20250106.2").await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_beta_channel_request_gets_prerelease_events() -> Result<()> {
    let server = mock_bazzite_releases().await;
    let dir = TempDir::new()?;
    let config = config_for(&dir, &server)?;

    let feed = AnnouncementFeed::new(ReleaseClient::new(config)?);
    let events = feed.load(&["previewchannel"]).await;

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.gid, "101");
    assert_eq!(event.announcement_body.headline, "Bazzite Testing (F41.20250110)");
    assert_eq!(event.announcement_body.body, "[h3]Mesa[/h3]\n[list]\n[*]bumped\n[/list]");
    assert_eq!(event.announcement_body.tags, vec!["patchnotes", "betachannel"]);

    Ok(())
}
