use ytq_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Log to the state dir; stderr if it is not writable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("ytq error: {:#}", err);
        std::process::exit(1);
    }
}
