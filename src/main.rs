use clap::Parser;
use strategist::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
