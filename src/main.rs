use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use heraldry::config::{Settings, setup_logging};
use heraldry::inference::ReplicateClient;
use heraldry::web::{AppState, setup_server};
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = heraldry::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return ExitCode::FAILURE;
    }

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let inference = Arc::new(ReplicateClient::new(&settings));
    let state = AppState::new(settings, inference);

    if let Err(err) = setup_server(&cli.listen_address, cli.port, state).await {
        error!("Application error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
