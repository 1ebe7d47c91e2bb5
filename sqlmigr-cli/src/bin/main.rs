use sqlmigr_cli::CliError;

fn main() -> Result<(), Box<CliError>> {
    sqlmigr_cli::main().map_err(Box::new)
}
