//! Interactive entry point for album-dl

mod cli;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();

    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
