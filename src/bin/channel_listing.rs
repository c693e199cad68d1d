#![forbid(unsafe_code)]

//! Prints a channel's identity and listing, resolving each listed video.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use rumble_tools::config::{DEFAULT_CONFIG_PATH, load_site_config_from};
use rumble_tools::{ChannelListing, PlaylistEntry, Site, VideoId};
use std::io::{self, Write};
use std::path::PathBuf;

const DEFAULT_CHANNEL_ID: &str = "c-2296374";

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a Rumble channel and its videos.")]
struct Cli {
    #[arg(value_name = "CHANNEL_ID", default_value = DEFAULT_CHANNEL_ID)]
    channel_id: String,
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the TOML config file")]
    config: PathBuf,
    #[arg(long = "host", value_name = "URL", help = "Override the site host")]
    host: Option<String>,
    #[arg(long = "json", help = "Print one JSON summary per entry")]
    json: bool,
    #[arg(
        long = "limit",
        value_name = "N",
        help = "Only report the first N entries"
    )]
    limit: Option<usize>,
    #[arg(
        long = "no-resolve",
        help = "Skip per-video lookups and print listing fields only"
    )]
    no_resolve: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let mut config = load_site_config_from(&cli.config)?;
    if let Some(host) = &cli.host {
        config.set_host(host);
    }

    let site = Site::connect(config);
    let mut channel = ChannelListing::fetch(site, &cli.channel_id)
        .with_context(|| format!("loading channel {}", cli.channel_id))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        report_json(&mut channel, cli.limit, &mut out)
    } else {
        report_text(&mut channel, cli.limit, !cli.no_resolve, &mut out)
    }
}

fn limited(entries: &mut [PlaylistEntry], limit: Option<usize>) -> &mut [PlaylistEntry] {
    let end = limit.map_or(entries.len(), |n| n.min(entries.len()));
    &mut entries[..end]
}

fn report_json(
    channel: &mut ChannelListing,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    for entry in limited(channel.entries_mut(), limit) {
        let summary = entry.summary()?;
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    }
    Ok(())
}

fn report_text(
    channel: &mut ChannelListing,
    limit: Option<usize>,
    resolve: bool,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "Channel name: {}", channel.name())?;
    writeln!(out, "Channel followers: {}", channel.followers())?;
    writeln!(out, "Channel URL: {}", channel.url())?;
    writeln!(out, "Channel entries: {}", channel.entry_count())?;

    for entry in limited(channel.entries_mut(), limit) {
        writeln!(out)?;
        writeln!(out, "Entry")?;
        writeln!(out, "-----")?;
        writeln!(out, "title: {}", entry.title())?;
        writeln!(out, "link: {}", entry.link().relative_path)?;
        writeln!(out, "thumbnail: {}", entry.thumbnail().src)?;
        writeln!(out, "views: {}", entry.views_text())?;
        if !resolve {
            continue;
        }

        let video = entry.video_mut();
        let id = match video.identifier()? {
            VideoId::Found(token) => token.clone(),
            VideoId::Absent => "<not found>".to_string(),
        };
        writeln!(out, "video id: {id}")?;
        writeln!(out, "video url: {}", video.url())?;
        writeln!(out, "video thumbnail: {}", video.thumbnail_url()?)?;
        writeln!(out, "video title: {}", video.title()?)?;
        writeln!(out, "video duration: {}s", video.duration()?)?;
        writeln!(out, "video channel: {}", video.channel_name()?)?;
        writeln!(out, "summary: {}", serde_json::to_string(&entry.summary()?)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["channel_listing"]).unwrap();
        assert_eq!(cli.channel_id, DEFAULT_CHANNEL_ID);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.json);
        assert!(!cli.no_resolve);
        assert_eq!(cli.limit, None);
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::try_parse_from([
            "channel_listing",
            "c-42",
            "--json",
            "--limit",
            "3",
            "--host",
            "http://localhost:9000",
            "--config",
            "/tmp/rumble.toml",
        ])
        .unwrap();
        assert_eq!(cli.channel_id, "c-42");
        assert!(cli.json);
        assert_eq!(cli.limit, Some(3));
        assert_eq!(cli.host.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cli.config, PathBuf::from("/tmp/rumble.toml"));
    }

    #[test]
    fn cli_rejects_bad_limit() {
        assert!(Cli::try_parse_from(["channel_listing", "--limit", "many"]).is_err());
    }

    #[test]
    fn limited_clamps_to_length() {
        let mut empty: Vec<PlaylistEntry> = Vec::new();
        assert!(limited(&mut empty, Some(5)).is_empty());
        assert!(limited(&mut empty, None).is_empty());
    }
}
