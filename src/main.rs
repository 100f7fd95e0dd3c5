mod app;
mod browse;
mod commands;
mod config;
mod error;
mod input;
mod output;
mod playback;
mod script;
mod terminal;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::browse::array::BrowseArray;
use crate::browse::tree::DirTree;
use crate::config::Config;
use crate::input::InputSource;
use crate::tui::{install_panic_hook, Tui};

/// An interactive terminal browser for a media catalog.
#[derive(Parser, Debug)]
#[command(name = "medley", version, about)]
struct Cli {
    /// Catalog root (overrides the configured library)
    path: Option<PathBuf>,

    /// Configuration file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command file replayed at startup, after the configured one
    #[arg(long)]
    load: Option<PathBuf>,

    /// Admit an extra file extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let root = cli
        .path
        .clone()
        .or_else(|| config.library.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let root = root.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", root.display()))
    })?;

    let mut extensions = config.extensions.clone();
    extensions.extend(cli.extensions.iter().cloned());

    // Build the catalog before touching the terminal so a failure prints
    // as a plain error message.
    let array = BrowseArray::build(&root, &extensions)?;
    let mut app = App::new(config, DirTree::new(array), InputSource::spawn_reader());

    if let Some(startup) = app.config.startup.clone() {
        app.run_command_file(&startup)?;
    }
    if let Some(load) = &cli.load {
        app.run_command_file(load)?;
    }

    install_panic_hook();
    let mut tui = Tui::new()?;

    while !app.should_quit() {
        tui.terminal_mut().draw(|frame| ui::render(&app, frame))?;
        app.tick();
        std::thread::sleep(Duration::from_millis(16));
    }

    app.shutdown();
    tui.restore()?;
    Ok(())
}
