use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use geostamp::app::{NoticeLevel, Workbench};
use geostamp::config::{self, OutputKind};
use geostamp::core::extract::{ExifGeoExtractor, GeoExtractor};
use geostamp::lookup::{label_for, RegionTable};
use geostamp::models::{format_file_size, Coordinate, RawFile};

/// Apply one location to a batch of photos
#[derive(Parser)]
#[command(name = "geostamp", version)]
struct Cli {
    /// Config file (toml, json or yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the embedded location of each file
    Inspect { files: Vec<PathBuf> },
    /// Stamp one location onto every file
    Stamp {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
        /// Point on the map surface, as X,Y
        #[arg(long, value_parser = parse_pair, conflicts_with_all = ["lat", "lon"])]
        pick: Option<(f64, f64)>,
        /// Size of the map surface, as WIDTH,HEIGHT
        #[arg(long, value_parser = parse_pair, default_value = "800,600")]
        surface: (f64, f64),
        /// Write next to the source with this suffix
        #[arg(long, conflicts_with_all = ["overwrite", "export_dir"])]
        suffix: Option<String>,
        /// Replace the source files
        #[arg(long, action, conflicts_with = "export_dir")]
        overwrite: bool,
        /// Write copies into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Also save the committed batch as JSON
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn parse_pair(value: &str) -> Result<(f64, f64), String> {
    let (first, second) = value
        .split_once(',')
        .ok_or_else(|| format!("expected two numbers separated by a comma, got {value:?}"))?;
    let first = first.trim().parse::<f64>().map_err(|err| err.to_string())?;
    let second = second.trim().parse::<f64>().map_err(|err| err.to_string())?;
    Ok((first, second))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Inspect { files } => inspect(&files).await,
        Command::Stamp {
            files,
            lat,
            lon,
            pick,
            surface,
            suffix,
            overwrite,
            export_dir,
            snapshot,
        } => {
            if let Some(suffix) = suffix {
                cfg.output.mode = OutputKind::Suffix;
                cfg.output.suffix = suffix;
            } else if overwrite {
                cfg.output.mode = OutputKind::Overwrite;
            } else if export_dir.is_some() {
                cfg.output.mode = OutputKind::Export;
                cfg.output.export_dir = export_dir;
            }
            if snapshot.is_some() {
                cfg.output.snapshot_path = snapshot;
            }

            let target = match (lat, lon, pick) {
                (Some(lat), Some(lon), _) => Target::Fixed(Coordinate::new(lat, lon)?),
                (_, _, Some((x, y))) => Target::Pick {
                    x,
                    y,
                    width: surface.0,
                    height: surface.1,
                },
                _ => bail!("pass --lat and --lon, or --pick"),
            };

            stamp(&cfg, &files, target).await
        }
    }
}

enum Target {
    Fixed(Coordinate),
    Pick {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

async fn inspect(files: &[PathBuf]) -> anyhow::Result<()> {
    let regions = RegionTable::default();

    for path in files {
        let raw = match RawFile::from_path(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("{}: {err}", path.display());
                continue;
            }
        };

        let location = ExifGeoExtractor.extract(&raw.bytes);
        let size = format_file_size(raw.size_bytes);

        match location {
            Some(coordinate) => {
                let label = label_for(&regions, &coordinate).await;
                println!("{}\t{}\t{}\t{} ({})", raw.name, raw.mime_type, size, coordinate, label);
            }
            None => println!("{}\t{}\t{}\tno location", raw.name, raw.mime_type, size),
        }
    }

    Ok(())
}

async fn stamp(cfg: &config::AppConfig, files: &[PathBuf], target: Target) -> anyhow::Result<()> {
    let (workbench, mut notices) = Workbench::from_config(cfg)?;

    let printer = tokio::spawn(async move {
        let mut errors = 0usize;
        while let Some(notice) = notices.recv().await {
            if notice.level == NoticeLevel::Error {
                errors += 1;
            }
            println!("[{}] {}", notice.level.label(), notice.message);
        }
        errors
    });

    let mut raw_files = Vec::with_capacity(files.len());
    for path in files {
        match RawFile::from_path(path) {
            Ok(raw) => raw_files.push(raw),
            Err(err) => warn!("{}: {err}", path.display()),
        }
    }

    let report = workbench.ingest(raw_files).await;
    println!(
        "{} image(s) added, {} with an embedded location",
        report.accepted, report.located
    );

    let picked = match target {
        Target::Fixed(coordinate) => workbench.select_location(coordinate).await,
        Target::Pick {
            x,
            y,
            width,
            height,
        } => workbench.pick_location(x, y, width, height).await,
    };
    println!("location: {} ({})", picked.coordinate, picked.label);

    let committed = workbench.commit().await;
    workbench.flush().await;
    drop(workbench);

    let errors = printer.await.unwrap_or(0);
    let snapshot = committed?;
    if errors > 0 {
        bail!("{errors} error(s) while saving {} image(s)", snapshot.len());
    }

    Ok(())
}
