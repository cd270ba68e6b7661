//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`validate`], or [`health`]. Each
//! handler lives in its own submodule.

pub mod health;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::GatewayError;

pub async fn dispatch(cli: Cli) -> Result<(), GatewayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  gatehouse v{version} \u{2014} HTTP API gateway\n\n  \
         No command provided. To get started:\n\n    \
         gatehouse run                     Start the gateway (auto-detects ./gatehouse.yaml)\n    \
         gatehouse run -c gateway.yaml     Start with a specific config file\n    \
         gatehouse validate                Check the effective configuration\n    \
         gatehouse --help                  See all commands and options\n"
    );
}
