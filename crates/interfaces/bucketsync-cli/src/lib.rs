pub mod commands;
pub mod prompt;

use bucketsync_config::{parse_workers, DEFAULT_GPG_PROGRAM, DEFAULT_MAX_WORKERS, DEFAULT_REGION};
use bucketsync_pipeline::{ChangeDetection, DownloadPolicy, SyncOptions, SyncReport};
use camino::Utf8PathBuf;
use clap::{Args, Parser};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Every file transferred or skipped.
pub const EXIT_SUCCESS: u8 = 0;
/// Bad arguments, unreadable credentials, or a failure before any transfer started.
pub const EXIT_SETUP_FAILURE: u8 = 1;
/// The run finished but at least one transfer failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Options shared by both programs.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,
    /// Custom S3-compatible endpoint; switches to path-style addressing.
    #[arg(long)]
    pub endpoint_url: Option<String>,
    /// Program used to decrypt the credentials file.
    #[arg(long, default_value = DEFAULT_GPG_PROGRAM)]
    pub gpg: String,
    /// Also write the final report as JSON.
    #[arg(long)]
    pub report: Option<Utf8PathBuf>,
    #[arg(short, long)]
    pub verbose: bool,
}

/// Upload a local directory tree into a bucket, skipping files already present.
#[derive(Parser, Debug)]
#[command(name = "bucket-upload", author, version, about)]
pub struct UploadArgs {
    pub bucket: String,
    pub local_directory: Utf8PathBuf,
    pub encrypted_credentials_path: Utf8PathBuf,
    #[arg(value_parser = parse_workers, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,
    /// Key prefix to upload under.
    #[arg(long, default_value = "")]
    pub prefix: String,
    /// Put the directory's own name in front of every key.
    #[arg(long)]
    pub include_dir_name: bool,
    /// Compare content (MD5 against etag) instead of sizes only.
    #[arg(long)]
    pub checksum: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Download every object under a prefix into a local directory.
#[derive(Parser, Debug)]
#[command(name = "bucket-download", author, version, about)]
pub struct DownloadArgs {
    pub bucket: String,
    pub remote_prefix: String,
    pub local_directory: Utf8PathBuf,
    pub encrypted_credentials_path: Utf8PathBuf,
    #[arg(short, long, value_parser = parse_workers, default_value_t = DEFAULT_MAX_WORKERS)]
    pub workers: usize,
    /// Leave local files alone when they are at least as large as the object.
    #[arg(long)]
    pub skip_existing: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub gpg_program: String,
    pub encrypted_path: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub store: StoreSettings,
    pub credentials: CredentialSettings,
    pub local_dir: Utf8PathBuf,
    pub prefix: String,
    pub include_dir_name: bool,
    pub options: SyncOptions,
    pub report_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub store: StoreSettings,
    pub credentials: CredentialSettings,
    pub prefix: String,
    pub local_dir: Utf8PathBuf,
    pub options: SyncOptions,
    pub report_path: Option<Utf8PathBuf>,
}

fn split_common(
    bucket: String,
    credentials: Utf8PathBuf,
    common: CommonArgs,
) -> (StoreSettings, CredentialSettings, Option<Utf8PathBuf>) {
    (
        StoreSettings {
            bucket,
            region: common.region,
            endpoint: common.endpoint_url,
        },
        CredentialSettings {
            gpg_program: common.gpg,
            encrypted_path: credentials,
        },
        common.report,
    )
}

impl From<UploadArgs> for UploadConfig {
    fn from(args: UploadArgs) -> Self {
        let (store, credentials, report_path) =
            split_common(args.bucket, args.encrypted_credentials_path, args.common);
        Self {
            store,
            credentials,
            local_dir: args.local_directory,
            prefix: args.prefix,
            include_dir_name: args.include_dir_name,
            options: SyncOptions {
                max_workers: args.max_workers,
                change_detection: if args.checksum {
                    ChangeDetection::Checksum
                } else {
                    ChangeDetection::Size
                },
                ..SyncOptions::default()
            },
            report_path,
        }
    }
}

impl From<DownloadArgs> for DownloadConfig {
    fn from(args: DownloadArgs) -> Self {
        let (store, credentials, report_path) =
            split_common(args.bucket, args.encrypted_credentials_path, args.common);
        Self {
            store,
            credentials,
            prefix: args.remote_prefix,
            local_dir: args.local_directory,
            options: SyncOptions {
                max_workers: args.workers,
                download_policy: if args.skip_existing {
                    DownloadPolicy::SkipExisting
                } else {
                    DownloadPolicy::Always
                },
                ..SyncOptions::default()
            },
            report_path,
        }
    }
}

/// Parse the process arguments. `--help`/`--version` exit 0, anything else invalid exits 1.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() {
                i32::from(EXIT_SETUP_FAILURE)
            } else {
                i32::from(EXIT_SUCCESS)
            };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // Already installed (tests, embedding); keep the existing one.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn exit_status(report: &SyncReport) -> u8 {
    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_PARTIAL_FAILURE
    }
}

/// Map a finished command to the process exit code, printing setup errors.
pub fn finish(result: anyhow::Result<SyncReport>) -> ExitCode {
    match result {
        Ok(report) => ExitCode::from(exit_status(&report)),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_SETUP_FAILURE)
        }
    }
}
