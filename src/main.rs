// Proof-of-work ledger - CLI

use clap::Parser;
use pow_ledger::{Cli, CliHandler};

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let mut handler = match CliHandler::new(cli.config.as_ref()) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error initializing: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handler.handle(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
