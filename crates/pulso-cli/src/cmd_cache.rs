use clap::Subcommand;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;

use crate::config::Settings;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum CacheCmd {
    /// Drop cached analysis results for a CSV
    Clear {
        #[arg(long)]
        csv: PathBuf,
        /// Also drop the imported CSV that replaces it
        #[arg(long)]
        custom: bool,
    },
    /// Import a CSV that replaces the dataset for `--csv`
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// File to import
        file: PathBuf,
    },
    /// Show where the cache lives and when it was last saved
    Info {
        #[arg(long)]
        csv: PathBuf,
    },
}

// ── Dispatch ──

pub fn run(cmd: CacheCmd, settings: &Settings) -> anyhow::Result<()> {
    match cmd {
        CacheCmd::Clear { csv, custom } => clear(settings, &csv, custom),
        CacheCmd::Import { csv, file } => import(settings, &csv, &file),
        CacheCmd::Info { csv } => info(settings, &csv),
    }
}

// ── Command Implementations ──

fn clear(settings: &Settings, csv: &Path, custom: bool) -> anyhow::Result<()> {
    let cache = settings.open_cache(csv);
    cache.clear_clients()?;
    if custom {
        cache.clear_custom_csv()?;
    }
    println!("Cache cleared for {}", csv.display());
    Ok(())
}

fn import(settings: &Settings, csv: &Path, file: &Path) -> anyhow::Result<()> {
    let clients = pulso_ingest::load_clients_csv(file)?;
    let cache = settings.open_cache(csv);
    cache.save_custom_csv(&clients)?;
    cache.clear_clients()?;
    println!("Imported {} clients from {}", clients.len(), file.display());
    Ok(())
}

fn info(settings: &Settings, csv: &Path) -> anyhow::Result<()> {
    let cache = settings.open_cache(csv);
    let dir = pulso_store::dataset_dir(&settings.cache_root(), csv);
    println!("Cache dir:    {}", dir.display());
    match cache.clients_saved_at()? {
        Some(t) => println!("Last saved:   {}", t.format(&Rfc3339)?),
        None => println!("Last saved:   never"),
    }
    let custom = cache.load_custom_csv()?;
    println!(
        "Imported CSV: {}",
        custom.map_or_else(|| "none".to_string(), |c| format!("{} clients", c.len()))
    );
    Ok(())
}
