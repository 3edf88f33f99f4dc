// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use ferry_core::{FerryError, FerryResult, LogicalPath, MoveOptions, Origin, Settings};
use ferry_formats::TransferMode;
use ferry_storage::{Storage, StorageScope};
use ferry_transfer::{
    disk_to_blob, s3_to_blob, BatchReport, FileTransfer, Migration, RetryPolicy, Side,
    SourceTree, TransferOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::debug;

/// Settings, facade and the backend selected on the command line
pub struct Context {
    settings: Settings,
    storage: Arc<Storage>,
    side: Side,
}

impl Context {
    pub fn new(
        config: Option<&Path>,
        provider: Option<String>,
        location: Option<String>,
    ) -> FerryResult<Self> {
        let settings = Settings::load(config)?;
        let storage = Arc::new(Storage::from_settings(&settings)?);

        let side = match provider {
            Some(p) if p.eq_ignore_ascii_case("disk") => Side::Disk,
            Some(p) => Side::Cloud { provider: p.parse()?, location },
            None => Side::Cloud { provider: settings.provider, location },
        };

        debug!(?side, root = %settings.root, "command context ready");
        Ok(Self { settings, storage, side })
    }

    fn scope(&self) -> StorageScope<'_> {
        self.side.scope(&self.storage)
    }

    /// Absolute paths are taken as-is, relative ones start at the root.
    fn path(&self, raw: &str) -> LogicalPath {
        if raw.starts_with('/') {
            LogicalPath::new(raw)
        } else {
            self.storage.codec().root().join(raw)
        }
    }
}

/// Format entry kind
fn format_kind(is_dir: bool) -> String {
    if is_dir {
        style("d").cyan().to_string()
    } else {
        "-".to_string()
    }
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// List directory contents
pub async fn ls(
    ctx: &Context,
    path: &str,
    recursive: bool,
    pattern: Option<&str>,
    long: bool,
) -> FerryResult<()> {
    let scope = ctx.scope();
    let dir = ctx.path(path);
    debug!(%dir, recursive, ?pattern, "ls");

    let paths = if recursive {
        scope.rglob(&dir, pattern.unwrap_or_default()).await?
    } else {
        scope.iterdir(&dir).await?
    };

    if paths.is_empty() {
        println!("(empty directory)");
        return Ok(());
    }

    if long {
        let mut entries = Vec::with_capacity(paths.len());
        for p in &paths {
            entries.push(LsEntry {
                kind: format_kind(scope.is_dir(p).await?),
                path: p.to_string(),
            });
        }
        println!("{}", Table::new(entries));
    } else {
        for p in &paths {
            println!("{p}");
        }
    }
    Ok(())
}

/// Check whether a file exists
pub async fn exists(ctx: &Context, path: &str) -> FerryResult<()> {
    let path = ctx.path(path);
    if ctx.scope().exists(&path).await? {
        println!("{} {}", style("yes").green(), path);
    } else {
        println!("{} {}", style("no").red(), path);
    }
    Ok(())
}

/// Copy or move a file, or every file below a folder
pub async fn transfer(
    ctx: &Context,
    source: &str,
    dest: &str,
    from_local: bool,
    recursive: bool,
    delete_origin: bool,
) -> FerryResult<()> {
    let origin = if from_local { Origin::Local } else { Origin::Remote };
    let options = MoveOptions { origin, delete_origin };
    let src = ctx.path(source);
    let dst = ctx.path(dest);
    let scope = ctx.scope();
    debug!(%src, %dst, ?origin, recursive, delete_origin, "transfer");

    let verb = if delete_origin { "Moved" } else { "Copied" };
    if recursive {
        let count = scope.move_folder(&src, &dst, options).await?;
        println!("{verb} {count} file(s) {src} -> {dst}");
    } else {
        scope.move_file(&src, &dst, options).await?;
        println!("{verb} {src} -> {dst}");
    }
    Ok(())
}

/// Remove files
pub async fn rm(ctx: &Context, paths: &[String]) -> FerryResult<()> {
    let scope = ctx.scope();
    for raw in paths {
        let path = ctx.path(raw);
        debug!(%path, "rm");
        scope.delete(&path).await?;
        println!("Removed {path}");
    }
    Ok(())
}

/// Download a file to the local filesystem
pub async fn get(ctx: &Context, path: &str, output: &Path) -> FerryResult<()> {
    let path = ctx.path(path);
    let written = ctx.scope().download_to(&path, output).await?;
    println!(
        "Downloaded {path} -> {} ({})",
        output.display(),
        bytesize::ByteSize(written)
    );
    Ok(())
}

/// Print a temporary read URL
pub async fn url(ctx: &Context, path: &str, ttl: u64) -> FerryResult<()> {
    let path = ctx.path(path);
    match ctx
        .scope()
        .temporary_url(&path, Duration::from_secs(ttl))
        .await
    {
        Some(url) => {
            println!("{url}");
            Ok(())
        }
        None => Err(FerryError::Other(format!(
            "no temporary URL available for {path}"
        ))),
    }
}

#[derive(Tabled)]
struct FormatRow {
    #[tabled(rename = "Extension")]
    extension: &'static str,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Save")]
    save: String,
    #[tabled(rename = "Transfer")]
    mode: &'static str,
}

/// List loadable and savable formats
pub fn formats(ctx: &Context) -> FerryResult<()> {
    let registry = ctx.storage.formats();
    let extensions: BTreeSet<&'static str> = registry
        .load_extensions()
        .into_iter()
        .chain(registry.save_extensions())
        .collect();

    let mark = |yes: bool| {
        if yes {
            style("yes").green().to_string()
        } else {
            style("no").dim().to_string()
        }
    };
    let rows: Vec<FormatRow> = extensions
        .into_iter()
        .map(|ext| FormatRow {
            extension: ext,
            load: mark(registry.can_load(ext)),
            save: mark(registry.can_save(ext)),
            mode: match TransferMode::for_extension(ext) {
                TransferMode::Binary => "bytes",
                TransferMode::Text => "text",
            },
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

/// Command-line overrides for the configured migration settings
pub struct Tuning {
    pub retry_failed: bool,
    pub concurrency: Option<usize>,
    pub timeout: Option<u64>,
    pub bucket: Option<String>,
    pub container: Option<String>,
}

impl Tuning {
    fn options(&self, settings: &Settings) -> TransferOptions {
        let mut options = TransferOptions::from(&settings.transfer);
        if self.retry_failed {
            options = options.with_retry_policy(RetryPolicy::RetryFailed);
        }
        if let Some(n) = self.concurrency {
            options = options.with_concurrency(n);
        }
        if let Some(secs) = self.timeout {
            options = options.with_call_timeout(Duration::from_secs(secs));
        }
        options
    }
}

/// Disk mount to blob storage
pub async fn migrate_disk_to_blob(
    ctx: &Context,
    index: &Path,
    folders: &[String],
    tuning: Tuning,
) -> FerryResult<()> {
    let options = tuning.options(&ctx.settings);
    let migration = disk_to_blob(ctx.storage.clone(), index, tuning.container).with_options(options);
    run_migration(ctx, migration, folders).await
}

/// S3 bucket to blob storage
pub async fn migrate_s3_to_blob(
    ctx: &Context,
    index: &Path,
    folders: &[String],
    tuning: Tuning,
) -> FerryResult<()> {
    let options = tuning.options(&ctx.settings);
    let migration = s3_to_blob(ctx.storage.clone(), index, tuning.bucket, tuning.container)
        .with_options(options);
    run_migration(ctx, migration, folders).await
}

async fn run_migration<S: SourceTree, T: FileTransfer>(
    ctx: &Context,
    migration: Migration<S, T>,
    folders: &[String],
) -> FerryResult<()> {
    let folders: Vec<LogicalPath> = folders.iter().map(|f| ctx.path(f)).collect();
    debug!(count = folders.len(), "starting migration");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .map_err(|e| FerryError::Other(e.to_string()))?,
    );
    spinner.set_message(format!("migrating {} folder(s)", folders.len()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = migration.run(&folders).await;
    spinner.finish_and_clear();

    print_report(&result?);
    Ok(())
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Done")]
    succeeded: usize,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Time")]
    elapsed: String,
}

fn print_report(report: &BatchReport) {
    let rows: Vec<ReportRow> = report
        .folders
        .iter()
        .map(|f| ReportRow {
            folder: f.folder.to_string(),
            started: f.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            succeeded: f.succeeded,
            failed: if f.failed > 0 {
                style(f.failed).red().to_string()
            } else {
                f.failed.to_string()
            },
            skipped: f.skipped,
            size: bytesize::ByteSize(f.bytes).to_string(),
            elapsed: format!("{:.1}s", f.elapsed.as_secs_f64()),
        })
        .collect();
    println!("{}", Table::new(rows));

    let summary = format!(
        "{} transferred, {} failed, {} skipped ({})",
        report.succeeded(),
        report.failed(),
        report.skipped(),
        bytesize::ByteSize(report.bytes())
    );
    if report.failed() > 0 {
        println!("{}", style(summary).yellow());
    } else {
        println!("{}", style(summary).green());
    }
}
