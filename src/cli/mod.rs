//! Interactive prompt flow, group listing and progress rendering
//!
//! - [`prompt`] - Line-oriented questions over any reader/writer pair
//! - [`render`] - indicatif progress bars fed by downloader events

mod prompt;
mod render;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use album_dl::{
    Config, ContentGroup, DateWindow, Downloader, Error, HttpSource, Result, RunSummary,
    Selection, cancel_on_signal,
};
use tracing_subscriber::EnvFilter;

use prompt::Prompter;
use render::ProgressRenderer;

/// Configuration file read from the working directory when present
const CONFIG_FILE: &str = "album-dl.json";

/// Characters of description shown per listed group
const PREVIEW_CHARS: usize = 60;

/// Install the stderr log subscriber (`RUST_LOG` overrides the default filter)
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("album_dl=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Load `album-dl.json` if it exists, otherwise the defaults
fn load_config() -> Result<Config> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        tracing::info!(path = CONFIG_FILE, "Loading configuration");
        Config::from_json_file(path)
    } else {
        Ok(Config::default())
    }
}

/// One listing line: `N. [YYYY-MM-DD HH:MM] <preview> (K files)`
pub(crate) fn listing_line(index: usize, group: &ContentGroup) -> String {
    format!(
        "{}. [{}] {} ({} files)",
        index,
        group.anchor_date().format("%Y-%m-%d %H:%M"),
        group.preview(PREVIEW_CHARS),
        group.media_count()
    )
}

/// Run one interactive session
pub async fn run() -> Result<()> {
    let config = load_config()?;
    let source = Arc::new(HttpSource::new(&config.source)?);
    let downloader = Downloader::new(config, source);

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    let target =
        prompter.ask("Enter Target Link (e.g. https://t.me/channel_name or username): ")?;
    let start = prompter.ask("Enter Start Date (YYYY-MM-DD): ")?;
    let end = prompter.ask("Enter End Date (YYYY-MM-DD): ")?;
    let window = DateWindow::parse(&start, &end)?;

    let entity = downloader.resolve(&target).await?;
    println!("Fetching messages from {} ...", entity.display_name());
    let groups = downloader.fetch_groups(&entity, &window).await?;

    let total: usize = groups.iter().map(|g| g.messages().len()).sum();
    println!("Total messages found: {total}");
    if groups.is_empty() {
        println!("No messages found in this date range.");
        return Ok(());
    }

    println!("\nFound {} content groups:", groups.len());
    {
        let mut out = io::stdout().lock();
        for (i, group) in groups.iter().enumerate() {
            writeln!(out, "{}", listing_line(i + 1, group))?;
        }
    }

    let raw = prompter.ask("\nSelect groups to download (e.g. 1,3,5-7) [default: all]: ")?;
    let selection = Selection::parse_or_all(&raw, groups.len());
    let chosen = selection.apply(&groups);
    if chosen.is_empty() {
        println!("Nothing selected.");
        return Ok(());
    }
    println!("Downloading {} groups ...", chosen.len());

    let renderer = ProgressRenderer::spawn(downloader.subscribe());
    let signal = tokio::spawn(cancel_on_signal(downloader.clone()));

    let reports = downloader.download_groups(&chosen).await;

    signal.abort();
    renderer.finish().await;

    let summary = RunSummary::from_reports(&reports);
    println!(
        "\nDone: {} downloaded, {} already complete, {} failed across {} groups.",
        summary.downloaded, summary.skipped, summary.failed, summary.groups
    );

    if downloader.cancel_token().is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}
