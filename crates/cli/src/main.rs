use std::process::ExitCode;

use clap::Parser;

use karatbook_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // Quiet by default; RUST_LOG overrides.
    karatbook_observability::init_with(cli.log_format, "warn");

    match karatbook_cli::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "karatbook failed to start");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
