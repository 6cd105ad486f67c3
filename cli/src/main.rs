use anyhow::Context;
use clap::{Parser, Subcommand};
use fatnav_core::{ImageFile, NavigatorConfig};
use fatnav_filesystems::{DirectoryEntry, Fat32Navigator};
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;

mod shell;

#[derive(Parser)]
#[command(name = "fatnav")]
#[command(about = "Read-only FAT32 image navigator", long_about = None)]
struct Cli {
    /// FAT32 image file
    image: PathBuf,

    /// JSON file with navigator limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show boot sector information
    Info,
    /// List a directory
    Ls {
        /// Directory path, root by default
        path: Option<String>,
        /// Include . and .. entries
        #[arg(short, long)]
        all: bool,
    },
    /// Write a file's contents to stdout
    Cat {
        path: String,
    },
    /// Interactive shell reading commands from stdin
    Shell,
}

pub(crate) fn format_entry(entry: &DirectoryEntry) -> String {
    let kind = if entry.is_directory() {
        "<DIR>".to_string()
    } else {
        entry.file_size.to_string()
    };
    let flags = format!(
        "{}{}",
        if entry.is_read_only() { 'R' } else { '-' },
        if entry.is_hidden() { 'H' } else { '-' }
    );
    let modified = entry
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));
    format!(
        "{:<12} {:>10}  {}  {}  cluster {}",
        entry.display_name(),
        kind,
        flags,
        modified,
        entry.first_cluster
    )
}

pub(crate) fn print_listing(
    entries: &[DirectoryEntry],
    show_all: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    for entry in entries.iter().filter(|e| show_all || !e.is_dot_entry()) {
        writeln!(out, "{}", format_entry(entry))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .init();

    let config = match &cli.config {
        Some(path) => NavigatorConfig::from_json_file(path)?,
        None => NavigatorConfig::default(),
    };
    debug!("Using config {:?}", config);

    let device = ImageFile::with_cache_limit(&cli.image, config.cache_sectors)
        .with_context(|| format!("Failed to open image {}", cli.image.display()))?;
    let mut nav = Fat32Navigator::mount(device, config)
        .with_context(|| format!("{} is not a readable FAT32 image", cli.image.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Info => {
            writeln!(out, "{}", nav.info())?;
        }
        Commands::Ls { path, all } => {
            let entries = match path {
                Some(path) => nav.list_path(&path)?,
                None => nav.list_current()?,
            };
            print_listing(&entries, all, &mut out)?;
        }
        Commands::Cat { path } => {
            let data = nav.read_file(&path)?;
            out.write_all(&data)?;
        }
        Commands::Shell => {
            let image_name = cli
                .image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| cli.image.display().to_string());
            let stdin = io::stdin();
            shell::run(&mut nav, &image_name, stdin.lock(), &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
