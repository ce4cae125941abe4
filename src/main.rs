use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    modsync_lib::run().await
}
