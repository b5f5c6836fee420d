//! turnkit - result-file unpacker and turn-directory maintenance.

mod config;

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, DEFAULT_CONFIG_PATH};
use serde::Serialize;
use tracing::info;
use turnkit_codec::{SectionDescriptor, SectionIndex};
use turnkit_core::PlayerId;
use turnkit_store::{select_loader, PlayerStatus, TurnSession, Unpacker};

#[derive(Parser, Debug)]
#[command(author, version, about = "Unpack and maintain play-by-mail turn directories", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Unpack a result file into a working directory
    Unpack {
        result: PathBuf,
        dir: PathBuf,
        #[arg(long, value_parser = parse_player)]
        player: PlayerId,
    },
    /// Show the status of every player in a directory
    Status { dir: PathBuf },
    /// List the sections of a result file
    Sections { result: PathBuf },
    /// Load and save a turn, regenerating checksums
    Resave {
        dir: PathBuf,
        #[arg(long, value_parser = parse_player)]
        player: PlayerId,
    },
    /// Write the effective configuration to the --config path
    InitConfig,
}

fn parse_player(value: &str) -> Result<PlayerId, String> {
    value
        .parse::<u8>()
        .ok()
        .and_then(PlayerId::new)
        .ok_or_else(|| format!("player must be 1-11, got {value:?}"))
}

#[derive(Serialize)]
struct SectionListing {
    version: Option<u8>,
    sections: Vec<SectionDescriptor>,
}

fn main() -> Result<()> {
    // WARN by default; override with RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::load_from_path(&args.config);
    info!("Starting turnkit v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Unpack {
            result,
            dir,
            player,
        } => unpack(&config, &result, &dir, player),
        Command::Status { dir } => status(&config, &dir),
        Command::Sections { result } => sections(&result),
        Command::Resave { dir, player } => resave(&config, &dir, player),
        Command::InitConfig => init_config(&config, &args.config),
    }
}

fn unpack(config: &AppConfig, result: &Path, dir: &Path, player: PlayerId) -> Result<()> {
    let mut file =
        File::open(result).with_context(|| format!("failed to open {}", result.display()))?;
    let charset = config.charset.charset();
    let report = Unpacker::new(dir, config.unpack.clone(), charset.as_ref())
        .unpack(&mut file, player)
        .with_context(|| format!("failed to unpack {} for player {player}", result.display()))?;
    print_json(&report)
}

fn status(config: &AppConfig, dir: &Path) -> Result<()> {
    let mut players = BTreeMap::new();
    for player in PlayerId::all() {
        let status = match select_loader(dir, player, config.unpack.clone(), config.charset.charset())
        {
            Some(loader) => loader
                .get_player_status(player)
                .with_context(|| format!("failed to check player {player}"))?,
            None => PlayerStatus::UNAVAILABLE,
        };
        if status.available {
            players.insert(player.get(), status);
        }
    }
    print_json(&players)
}

fn sections(result: &Path) -> Result<()> {
    let mut file =
        File::open(result).with_context(|| format!("failed to open {}", result.display()))?;
    let table = SectionIndex::open(&mut file)
        .with_context(|| format!("failed to read the directory of {}", result.display()))?;
    print_json(&SectionListing {
        version: table.version(),
        sections: table.sections().to_vec(),
    })
}

fn resave(config: &AppConfig, dir: &Path, player: PlayerId) -> Result<()> {
    let Some(loader) = select_loader(dir, player, config.unpack.clone(), config.charset.charset())
    else {
        bail!("no turn data for player {player} in {}", dir.display());
    };
    let mut session = TurnSession::new(loader, player);
    session
        .load()
        .with_context(|| format!("failed to load the turn of player {player}"))?;
    let report = session
        .save()
        .with_context(|| format!("failed to save the turn of player {player}"))?;
    print_json(&report)
}

fn init_config(config: &AppConfig, path: &Path) -> Result<()> {
    config
        .save_to_path(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote configuration to {}", path.display());
    print_json(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
