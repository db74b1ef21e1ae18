//! ONHM CLI - Operational National Hydrologic Model pipeline orchestrator

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;

use onhm_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if json {
                if let Ok(obj) = onhm_cli::output::json::format_error(&format!("{e:#}"), "validation")
                {
                    eprintln!("{obj}");
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}
