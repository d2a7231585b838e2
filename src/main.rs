use clap::Parser;
use duotrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
