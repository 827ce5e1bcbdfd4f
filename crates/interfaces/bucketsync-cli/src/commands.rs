use crate::{prompt, CredentialSettings, DownloadConfig, StoreSettings, UploadConfig};
use anyhow::{bail, Context, Result};
use bucketsync_config::PROGRESS_CHANNEL_CAPACITY;
use bucketsync_core::SyncPlan;
use bucketsync_infra::{
    CredentialProvider, GpgCredentialProvider, ObjectStore, S3Config, S3ObjectStore,
};
use bucketsync_pipeline::sync::engine::download_root;
use bucketsync_pipeline::{
    DownloadRequest, ProgressTracker, SyncEngine, SyncOptions, SyncReport, UploadRequest,
};
use camino::Utf8Path;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::debug;

pub async fn cmd_upload(config: UploadConfig) -> Result<SyncReport> {
    if !config.local_dir.is_dir() {
        bail!("Local directory not found: {}", config.local_dir);
    }
    let store = connect(&config.store, &config.credentials).await?;
    run_upload(store, &config).await
}

pub async fn cmd_download(config: DownloadConfig) -> Result<SyncReport> {
    let store = connect(&config.store, &config.credentials).await?;
    run_download(store, &config).await
}

/// Prompt for the passphrase, decrypt the key pair and build the S3 client.
pub async fn connect(
    store: &StoreSettings,
    credentials: &CredentialSettings,
) -> Result<Arc<dyn ObjectStore>> {
    if !credentials.encrypted_path.is_file() {
        bail!(
            "Credentials file not found: {}",
            credentials.encrypted_path
        );
    }

    let passphrase = prompt::read_passphrase(&credentials.encrypted_path)?;
    let provider = GpgCredentialProvider::new(
        credentials.gpg_program.clone(),
        credentials.encrypted_path.clone(),
    );
    let keys = provider
        .credentials(&passphrase)
        .await
        .context("Failed to unlock credentials")?;
    drop(passphrase);

    let config = S3Config {
        bucket: store.bucket.clone(),
        region: store.region.clone(),
        endpoint_override: store.endpoint.clone(),
    };
    Ok(Arc::new(S3ObjectStore::connect(&config, &keys)))
}

pub async fn run_upload(store: Arc<dyn ObjectStore>, config: &UploadConfig) -> Result<SyncReport> {
    println!(":: Uploading...");
    println!("   Local:  {}", config.local_dir);
    println!("   Bucket: s3://{}/{}", config.store.bucket, config.prefix);

    let engine = SyncEngine::new(store);
    let req = UploadRequest {
        local_root: config.local_dir.clone(),
        prefix: config.prefix.clone(),
        include_root_name: config.include_dir_name,
        options: config.options.clone(),
    };

    let plan = engine
        .plan_upload(&req)
        .await
        .context("Failed to plan upload")?;
    print_plan(&plan);

    let report = execute_with_progress(engine, plan, req.options).await?;
    print_report(&report, config.report_path.as_deref())?;
    Ok(report)
}

pub async fn run_download(
    store: Arc<dyn ObjectStore>,
    config: &DownloadConfig,
) -> Result<SyncReport> {
    let req = DownloadRequest {
        prefix: config.prefix.clone(),
        local_root: config.local_dir.clone(),
        options: config.options.clone(),
    };
    let dest = download_root(&req);

    println!(":: Downloading...");
    println!("   Bucket: s3://{}/{}", config.store.bucket, config.prefix);
    println!("   Local:  {}", dest);

    let engine = SyncEngine::new(store);
    let plan = engine
        .plan_download(&req)
        .await
        .context("Failed to list remote objects")?;
    print_plan(&plan);

    tokio::fs::create_dir_all(&dest)
        .await
        .with_context(|| format!("Failed to create {dest}"))?;

    let report = execute_with_progress(engine, plan, req.options).await?;
    print_report(&report, config.report_path.as_deref())?;
    Ok(report)
}

fn print_plan(plan: &SyncPlan) {
    println!("\n:: Plan");
    println!("   Pending Transfers: {}", plan.transfer_count());
    println!("   Already Present:   {}", plan.skip_count());
    println!(
        "   Total Size:        {}",
        format_size(plan.total_bytes(), DECIMAL)
    );
}

async fn execute_with_progress(
    engine: SyncEngine,
    plan: SyncPlan,
    options: SyncOptions,
) -> Result<SyncReport> {
    let mut tracker = ProgressTracker::new(&plan);

    let pb = ProgressBar::new(plan.total_bytes());
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move { engine.execute(&plan, &options, Some(tx)).await });

    while let Some(ev) = rx.recv().await {
        tracker.update(ev);
        let snap = tracker.get_snapshot();
        pb.set_position(snap.completed_bytes);
        pb.set_message(format!(
            "{}/{} files {}/s",
            snap.completed_files,
            snap.total_files,
            format_size(snap.speed_bps, DECIMAL)
        ));
    }

    let report = handle.await.context("Transfer task failed")?;
    pb.finish_and_clear();
    debug!("run {} finished", report.run_id);

    Ok(report)
}

fn print_report(report: &SyncReport, report_path: Option<&Utf8Path>) -> Result<()> {
    println!(
        "\n:: Transferred {}",
        format_size(report.bytes_transferred, DECIMAL)
    );
    println!("{report}");

    if let Some(path) = report_path {
        let json = report.to_json_pretty()?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report {path}"))?;
        println!(":: Saved report to {}", path);
    }
    Ok(())
}
