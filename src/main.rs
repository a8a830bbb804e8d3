//! Bazzite Changelog CLI
//!
//! Reports the Bazzite image branch and the release notes that go with it.
//! Release data comes from the GitHub releases of `ublue-os/bazzite`.
//!
//! # Usage
//!
//! ```bash
//! # Branch as reported to the plugin host
//! bazzite-changelog branch
//!
//! # Branch as written in /etc/bazzite/image_branch
//! bazzite-changelog --prefer-file branch
//!
//! # Latest ten releases on the current channel
//! bazzite-changelog releases
//!
//! # Prereleases, as JSON
//! bazzite-changelog releases --channel testing --json
//!
//! # Release notes for a tag (default: newest on the current channel)
//! bazzite-changelog changelog 41.20250106.2
//!
//! # SteamOS news events for a beta-channel request
//! bazzite-changelog announcements --tag betachannel
//!
//! # Invoke a plugin callable the way the host does
//! bazzite-changelog call get_bazzite_branch
//!
//! # Show configuration and branch file state
//! bazzite-changelog status
//! ```

use anyhow::{Context, Result};
use bazzite_changelog::announcement::AnnouncementFeed;
use bazzite_changelog::config::FALLBACK_BRANCH;
use bazzite_changelog::telemetry::init_tracing;
use bazzite_changelog::{
    BranchPolicy, BranchReader, Channel, Config, Plugin, Release, ReleaseClient,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{warn, Level};

#[derive(Parser)]
#[command(name = "bazzite-changelog")]
#[command(author, version, about = "Bazzite branch and release notes", long_about = None)]
struct Cli {
    /// Branch file to read (default: /etc/bazzite/image_branch)
    #[arg(long, global = true)]
    branch_file: Option<PathBuf>,

    /// Report the branch file content instead of the fixed fallback
    #[arg(long, global = true)]
    prefer_file: bool,

    /// Release source as owner/repo
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current image branch
    Branch,

    /// List releases on a channel, newest first
    Releases {
        /// Channel to list (default: derived from the branch)
        #[arg(short, long)]
        channel: Option<Channel>,

        /// Maximum number of releases
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print releases as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print release notes for a tag
    Changelog {
        /// Release tag (default: newest release on the current channel)
        tag: Option<String>,
    },

    /// Print SteamOS news events built from releases, as JSON
    Announcements {
        /// Steam require_tags of the request (stablechannel, betachannel, ...)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Invoke a plugin callable and print its JSON result
    Call {
        /// Callable name, e.g. get_bazzite_branch
        method: String,
    },

    /// Show configuration and branch file state
    Status,
}

impl Commands {
    /// Whether the command talks to the release repository.
    fn uses_release_source(&self) -> bool {
        matches!(
            self,
            Commands::Releases { .. } | Commands::Changelog { .. } | Commands::Announcements { .. }
        )
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.json_logs, level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let policy = if cli.prefer_file {
        BranchPolicy::PreferFile
    } else {
        BranchPolicy::AlwaysFallback
    };
    let reader = BranchReader::new(&config.branch_file).with_policy(policy);

    match cli.command {
        Commands::Branch => cmd_branch(&reader).await,
        Commands::Releases {
            channel,
            limit,
            json,
        } => cmd_releases(config, &reader, channel, limit, json).await,
        Commands::Changelog { tag } => cmd_changelog(config, &reader, tag).await,
        Commands::Announcements { tags } => cmd_announcements(config, &tags).await,
        Commands::Call { method } => cmd_call(reader, &method).await,
        Commands::Status => cmd_status(&config, &reader).await,
    }
}

/// Branch-only commands never fail on a bad release repository.
fn load_config(cli: &Cli) -> Result<Config> {
    let strict = cli.command.uses_release_source();
    let mut config = if strict {
        Config::from_env().context("Invalid environment configuration")?
    } else {
        Config::from_env_lenient()
    };

    if let Some(path) = &cli.branch_file {
        config.branch_file = path.clone();
    }
    if let Some(slug) = &cli.repo {
        match config.clone().with_repo(slug) {
            Ok(updated) => config = updated,
            Err(e) if !strict => warn!(error = %e, "ignoring --repo"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(config)
}

async fn cmd_branch(reader: &BranchReader) -> Result<()> {
    let branch = reader
        .get_branch()
        .await
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
    println!("{}", branch);
    Ok(())
}

async fn cmd_releases(
    config: Config,
    reader: &BranchReader,
    channel: Option<Channel>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let channel = match channel {
        Some(c) => c,
        None => reader.channel().await,
    };
    let client = ReleaseClient::new(config)?;
    let releases = client.fetch_releases(channel, Some(limit)).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&releases)?);
        return Ok(());
    }

    if releases.is_empty() {
        println!("No {} releases found", channel);
        return Ok(());
    }

    println!("=== Bazzite {} releases ===\n", channel);
    for release in &releases {
        print_release_line(release);
    }
    Ok(())
}

fn print_release_line(release: &Release) {
    println!(
        "  {:<20} {}  {}",
        release.tag_name,
        release.created_at.format("%Y-%m-%d"),
        release.title()
    );
}

async fn cmd_changelog(config: Config, reader: &BranchReader, tag: Option<String>) -> Result<()> {
    let client = ReleaseClient::new(config)?;

    let release = match tag {
        Some(tag) => client
            .fetch_release_by_tag(&tag)
            .await
            .with_context(|| format!("Failed to load release notes for {}", tag))?,
        None => {
            let channel = reader.channel().await;
            client
                .fetch_latest(channel)
                .await
                .with_context(|| format!("No {} releases available", channel))?
        }
    };

    println!("# {}\n", release.title());
    if let Some(url) = &release.html_url {
        println!("{}\n", url);
    }
    println!("{}", release.notes());
    Ok(())
}

async fn cmd_announcements(config: Config, tags: &[String]) -> Result<()> {
    let feed = AnnouncementFeed::new(ReleaseClient::new(config)?);
    let announcements = feed.load(tags).await;
    println!("{}", serde_json::to_string_pretty(&announcements)?);
    Ok(())
}

async fn cmd_call(reader: BranchReader, method: &str) -> Result<()> {
    let plugin = Plugin::new(reader);
    let value = plugin.call(method).await?;
    println!("{}", value);
    Ok(())
}

async fn cmd_status(config: &Config, reader: &BranchReader) -> Result<()> {
    println!("Bazzite Changelog Status");
    println!("========================");
    println!();

    println!("Branch:");
    println!("  File:        {}", reader.path().display());
    match reader.read_branch_file() {
        Ok(contents) if contents.trim().is_empty() => println!("  Content:     EMPTY"),
        Ok(contents) => println!("  Content:     {}", contents.trim()),
        Err(e) => println!("  Content:     UNAVAILABLE ({})", e),
    }
    println!("  Policy:      {:?}", reader.policy());
    let branch = reader.get_branch().await;
    println!("  Reported:    {}", branch.as_deref().unwrap_or("(none)"));
    println!("  Channel:     {}", reader.channel().await);
    println!();

    println!("Releases:");
    println!("  Repository:  {}", config.repo_slug());
    println!("  API:         {}", config.api_base);
    println!("  Timeout:     {}s", config.timeout_secs);

    Ok(())
}
