use bucketsync_cli::{commands, finish, init_tracing, parse_or_exit, UploadArgs};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args: UploadArgs = parse_or_exit();
    init_tracing(args.common.verbose);

    finish(commands::cmd_upload(args.into()).await)
}
