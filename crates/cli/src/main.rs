//! Command-line client for the shelf release server.

mod api_client;

use anyhow::{Context, Result};
use api_client::ApiClient;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Client for the shelf release server
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "SHELF_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Bearer token for write operations
    #[arg(long, env = "SHELF_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a package file
    Upload {
        /// Local file to upload
        file: PathBuf,
        /// Package name on the server (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing package of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// List packages, newest first
    List,
    /// Show the latest release
    Latest,
    /// Download a package
    Download {
        /// Package name on the server
        name: String,
        /// Output path (defaults to the package name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a package
    Delete {
        /// Package name on the server
        name: String,
    },
}

/// Human-readable byte size.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server, cli.token.clone())?;

    match cli.command {
        Command::Upload {
            file,
            name,
            overwrite,
        } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("cannot derive a package name from the file path; pass --name")?,
            };
            let info = client.upload(&file, &name, overwrite).await?;
            println!(
                "uploaded {} ({}, sha256:{})",
                info.name,
                format_size(info.size),
                info.checksum
            );
        }
        Command::List => {
            let packages = client.list().await?;
            if packages.is_empty() {
                println!("no packages");
                return Ok(());
            }
            for pkg in packages {
                println!(
                    "{:<40} {:>10}  {}",
                    pkg.name,
                    format_size(pkg.size),
                    pkg.modified_at
                );
            }
        }
        Command::Latest => {
            let release = client.latest().await?;
            println!("release: {}", release.tag_name);
            for asset in release.assets {
                println!(
                    "  {} ({}) -> {}",
                    asset.name,
                    format_size(asset.size),
                    asset.browser_download_url
                );
            }
        }
        Command::Download { name, output } => {
            let dest = output.unwrap_or_else(|| PathBuf::from(&name));
            let written = client.download(&name, &dest).await?;
            println!(
                "downloaded {} ({}) to {}",
                name,
                format_size(written),
                dest.display()
            );
        }
        Command::Delete { name } => {
            client.delete(&name).await?;
            println!("deleted {name}");
        }
    }

    Ok(())
}
