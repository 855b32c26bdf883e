use std::process::ExitCode;

fn main() -> ExitCode {
    illustra_cli::run()
}
