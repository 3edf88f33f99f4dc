// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ferry CLI
//!
//! Move, inspect and migrate data files across local disk, S3 and Azure blob.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about = "Ferry - data files across disk, S3 and Azure blob", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend to act on: aws, azure or disk (defaults to the configured provider)
    #[arg(short, long, global = true, env = "FERRY_PROVIDER")]
    provider: Option<String>,

    /// Bucket or container (defaults to the configured one)
    #[arg(short = 'L', long, global = true)]
    location: Option<String>,

    /// Settings file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Directory to list (relative paths start at the root)
        #[arg(default_value = "")]
        path: String,

        /// Every descendant instead of direct children
        #[arg(short, long)]
        recursive: bool,

        /// Keep paths containing this text (`*` is ignored)
        #[arg(long, requires = "recursive")]
        pattern: Option<String>,

        /// Long format with details
        #[arg(short, long)]
        long: bool,
    },

    /// Check whether a file exists
    Exists {
        path: String,
    },

    /// Copy a file or folder
    Cp {
        /// Source path
        source: String,

        /// Destination path
        dest: String,

        /// Source lives on the local disk and is uploaded
        #[arg(long)]
        from_local: bool,

        /// Copy every file below the source folder
        #[arg(short, long)]
        recursive: bool,
    },

    /// Move a file or folder
    Mv {
        /// Source path
        source: String,

        /// Destination path
        dest: String,

        /// Source lives on the local disk and is uploaded
        #[arg(long)]
        from_local: bool,

        /// Move every file below the source folder
        #[arg(short, long)]
        recursive: bool,
    },

    /// Remove files
    Rm {
        /// Path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Download a file to the local filesystem
    Get {
        path: String,

        /// Local destination
        output: PathBuf,
    },

    /// Print a temporary read URL
    Url {
        path: String,

        /// Validity in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },

    /// List loadable and savable formats
    Formats,

    /// Resumable bulk migration to blob storage
    Migrate {
        direction: Direction,

        /// Folder holding transferred_files.json and failed_files.json
        #[arg(long)]
        index: PathBuf,

        /// Source folders
        #[arg(required = true)]
        folders: Vec<String>,

        /// Attempt files that failed in earlier runs again
        #[arg(long)]
        retry_failed: bool,

        /// Transfers in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-file deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Source S3 bucket (defaults to the configured one)
        #[arg(long)]
        bucket: Option<String>,

        /// Target Azure container (defaults to the configured one)
        #[arg(long)]
        container: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    DiskToBlob,
    S3ToBlob,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = match commands::Context::new(cli.config.as_deref(), cli.provider, cli.location) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ls { path, recursive, pattern, long } => {
            commands::ls(&ctx, &path, recursive, pattern.as_deref(), long).await
        }
        Commands::Exists { path } => commands::exists(&ctx, &path).await,
        Commands::Cp { source, dest, from_local, recursive } => {
            commands::transfer(&ctx, &source, &dest, from_local, recursive, false).await
        }
        Commands::Mv { source, dest, from_local, recursive } => {
            commands::transfer(&ctx, &source, &dest, from_local, recursive, true).await
        }
        Commands::Rm { paths } => commands::rm(&ctx, &paths).await,
        Commands::Get { path, output } => commands::get(&ctx, &path, &output).await,
        Commands::Url { path, ttl } => commands::url(&ctx, &path, ttl).await,
        Commands::Formats => commands::formats(&ctx),
        Commands::Migrate {
            direction,
            index,
            folders,
            retry_failed,
            concurrency,
            timeout,
            bucket,
            container,
        } => {
            let tuning = commands::Tuning {
                retry_failed,
                concurrency,
                timeout,
                bucket,
                container,
            };
            match direction {
                Direction::DiskToBlob => {
                    commands::migrate_disk_to_blob(&ctx, &index, &folders, tuning).await
                }
                Direction::S3ToBlob => {
                    commands::migrate_s3_to_blob(&ctx, &index, &folders, tuning).await
                }
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
