//! photo-gallery: upload, list and delete photos in a local gallery.
//!
//! The gallery lives in `~/.photo-gallery` unless `--home` or
//! `PHOTO_GALLERY_HOME` points elsewhere.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gallery_lib::commands::photos::{self, CommandResponse};
use gallery_lib::gallery::manager;
use gallery_lib::state::AppState;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-gallery", about = "Photo gallery upload pipeline")]
struct Cli {
    /// Gallery home directory
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more JPEG, PNG or HEIC files
    Upload {
        /// Files to upload; they are copied, never moved
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List stored photos, newest capture time first
    List,
    /// Delete a stored photo and its thumbnail
    Delete {
        /// Stored filename as shown by `list`
        filename: String,
    },
    /// Print the effective configuration
    Config,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print the envelope and turn `success: false` into a non-zero exit.
fn finish<T: Serialize>(response: CommandResponse<T>) -> anyhow::Result<()> {
    print_json(&response)?;
    if !response.success {
        anyhow::bail!(response
            .message
            .unwrap_or_else(|| "command failed".to_string()));
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    gallery_lib::init_tracing();
    let cli = Cli::parse();

    let home = match cli.home {
        Some(home) => home,
        None => manager::gallery_home()?,
    };
    let state = AppState::open(home).context("Failed to open gallery")?;

    match cli.command {
        Commands::Upload { files } => {
            let mut staged = Vec::with_capacity(files.len());
            for file in &files {
                match photos::stage_local_file(&state, file) {
                    Ok(upload) => staged.push(upload),
                    Err(e) => {
                        for upload in &staged {
                            let _ = std::fs::remove_file(&upload.temp_path);
                        }
                        return Err(e).with_context(|| format!("Cannot read {:?}", file));
                    }
                }
            }
            finish(photos::upload_photos(&state, staged))?;
        }
        Commands::List => finish(photos::list_photos(&state))?,
        Commands::Delete { filename } => finish(photos::delete_photo(&state, &filename))?,
        Commands::Config => print_json(&state.config)?,
    }
    Ok(())
}
