use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // HDS_LOG wins over RUST_LOG; logs go to stderr so stdout stays clean.
    let filter = dotenvy::var("HDS_LOG")
        .or_else(|_| dotenvy::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match helpdesk_search::run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "fatal");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
