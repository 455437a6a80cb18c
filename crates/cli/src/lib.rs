pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "salesbook",
    about = "Salesbook operator CLI",
    long_about = "Initialise the sales ledger database, install the bottle catalog, and inspect configuration and readiness.",
    after_help = "Examples:\n  salesbook migrate\n  salesbook seed-bottles\n  salesbook doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations (creates the database file if missing)")]
    Migrate,
    #[command(about = "Migrate, then insert or update the default bottle catalog by label")]
    SeedBottles,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, login readiness, DB connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::SeedBottles => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn subcommands_use_kebab_case_names() {
        let cli = Cli::try_parse_from(["salesbook", "seed-bottles"]).expect("parses");
        assert!(matches!(cli.command, Command::SeedBottles));

        let cli = Cli::try_parse_from(["salesbook", "doctor", "--json"]).expect("parses");
        assert!(matches!(cli.command, Command::Doctor { json: true }));

        assert!(Cli::try_parse_from(["salesbook", "smoke"]).is_err());
    }
}
