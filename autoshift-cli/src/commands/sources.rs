use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use autoshift_core::Game;
use autoshift_lib::Settings;
use autoshift_sources::{Layout, resolve_sources};

use crate::error::CliError;

/// List the configured sources and their sections.
pub(crate) fn run_sources(sources_dir: Option<PathBuf>) -> Result<(), CliError> {
    let dir = sources_dir.or_else(|| Settings::load().sources_dir);
    let sources = resolve_sources(dir.as_deref())?;

    log::info!(
        "{}",
        "Configured sources:".if_supports_color(Stdout, |t| t.bold())
    );
    log::info!("");
    for source in &sources {
        let layout = match source.layout {
            Layout::Table => "table",
            Layout::List => "list",
        };
        log::info!(
            "  {:<16} {} ({layout})",
            source.id.if_supports_color(Stdout, |t| t.bold()),
            source.url.if_supports_color(Stdout, |t| t.cyan()),
        );
        for section in &source.sections {
            let locator = section
                .locator()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "(no locator)".to_string());
            let game = match section.game.as_deref().map(Game::from_label) {
                Some(Ok(game)) => game.display_name().to_string(),
                Some(Err(e)) => format!("{}", e.if_supports_color(Stdout, |t| t.red())),
                None => "game from heading".to_string(),
            };
            log::info!(
                "      {locator} {} {}",
                "\u{2192}".if_supports_color(Stdout, |t| t.dimmed()),
                game
            );
        }
    }

    if let Some(dir) = &dir {
        log::info!("");
        log::info!("Extra definitions from {}", dir.display());
    }
    Ok(())
}
