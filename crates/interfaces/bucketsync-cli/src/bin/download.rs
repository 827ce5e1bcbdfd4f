use bucketsync_cli::{commands, finish, init_tracing, parse_or_exit, DownloadArgs};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args: DownloadArgs = parse_or_exit();
    init_tracing(args.common.verbose);

    finish(commands::cmd_download(args.into()).await)
}
