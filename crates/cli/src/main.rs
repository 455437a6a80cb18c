use std::process::ExitCode;

fn main() -> ExitCode {
    salesbook_cli::run()
}
