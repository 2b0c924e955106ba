use std::process::ExitCode;

fn main() -> ExitCode {
    aemon::cli::run_cli()
}
